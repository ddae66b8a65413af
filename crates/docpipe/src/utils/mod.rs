//! Small filesystem helpers shared by the I/O, storage and tool layers.

use std::path::{Path, PathBuf};

use crate::error::{DocError, Result};

/// Directory mode for output directories (rwxr-xr-x).
pub const OUTPUT_DIR_MODE: u32 = 0o755;

/// Directory mode for staging directories other processes write into.
pub const SHARED_DIR_MODE: u32 = 0o777;

/// Create `dir` and any missing parents with `mode` (ignored off unix).
///
/// Succeeds if the directory already exists.
pub async fn ensure_dir(dir: &Path, mode: u32) -> Result<()> {
    if tokio::fs::metadata(dir).await.is_ok_and(|m| m.is_dir()) {
        return Ok(());
    }

    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    builder
        .create(dir)
        .await
        .map_err(|source| DocError::FailedToCreateOutput {
            path: dir.to_path_buf(),
            source,
        })
}

/// Blocking variant of [`ensure_dir`] for constructors.
pub fn ensure_dir_blocking(dir: &Path, mode: u32) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    builder
        .create(dir)
        .map_err(|source| DocError::FailedToCreateOutput {
            path: dir.to_path_buf(),
            source,
        })
}

/// Create the parent directory of an output path.
pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent, OUTPUT_DIR_MODE).await,
        _ => Ok(()),
    }
}

/// Apply unix permission bits to a file (no-op elsewhere).
pub async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}

/// Check that `path` names an existing regular file.
pub async fn check_file_exists(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(DocError::not_a_file(path)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(DocError::file_not_found(path))
        }
        Err(err) => Err(err.into()),
    }
}

/// Size of a file in bytes, zero if it cannot be read.
pub async fn file_size(path: &Path) -> u64 {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len())
        .unwrap_or(0)
}

/// Hidden sibling path a file is written to before being renamed into place.
pub fn staging_path(path: &Path, token: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.{token}.part"))
}

/// Format a size in bytes as a human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}
