//! Temporary file storage.
//!
//! [`TemporaryStorage`] owns a staging directory shared by concurrent
//! operations. There are no locks: every generated name is a random
//! 40-character token, and new files are created with create-new semantics
//! so a collision fails instead of overwriting. Files older than the
//! configured lifetime are reclaimed by [`TemporaryStorage::cleanup`].
//!
//! # Examples
//!
//! ```no_run
//! use docpipe::config::StorageConfig;
//! use docpipe::storage::TemporaryStorage;
//!
//! # async fn example() -> docpipe::Result<()> {
//! let storage = TemporaryStorage::new(StorageConfig::with_base_dir("/tmp/docpipe"))?;
//! let staged = storage.store_contents(b"%PDF-1.5 ...", "pdf").await?;
//! let removed = storage.cleanup().await?;
//! # Ok(())
//! # }
//! ```

use rand::Rng;
use rand::distr::Alphanumeric;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::error::{DocError, Result};
use crate::utils::{SHARED_DIR_MODE, ensure_dir, ensure_dir_blocking, set_mode};

/// Length of generated file names, extension excluded.
pub const TOKEN_LENGTH: usize = 40;

/// Permissions of files published for serving.
const PUBLIC_FILE_MODE: u32 = 0o644;

/// Directory mode for the public subdirectory.
const PUBLIC_DIR_MODE: u32 = 0o755;

/// Random alphanumeric token.
pub fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A file received from an upload mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Name the client gave the file. Only its extension is used.
    pub original_name: String,
    /// Where the upload currently lives.
    pub path: PathBuf,
}

impl UploadedFile {
    /// Upload at `path` with the given client-side name.
    pub fn new(original_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            original_name: original_name.into(),
            path: path.into(),
        }
    }

    /// Extension of the original name, lowercased.
    pub fn extension(&self) -> Option<String> {
        extension_of(Path::new(&self.original_name))
    }
}

/// Staging directory manager.
#[derive(Debug, Clone)]
pub struct TemporaryStorage {
    config: StorageConfig,
}

impl TemporaryStorage {
    /// Open storage, creating the base directory if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the base directory cannot be created.
    pub fn new(config: StorageConfig) -> Result<Self> {
        ensure_dir_blocking(&config.base_dir, SHARED_DIR_MODE)?;
        Ok(Self { config })
    }

    /// Base directory.
    pub fn base_dir(&self) -> &Path {
        &self.config.base_dir
    }

    /// Lifetime after which staged files are reclaimed.
    pub fn lifetime(&self) -> Duration {
        self.config.lifetime
    }

    /// Absolute path of `filename` inside the base directory.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::InvalidFilename`] for names with directory parts.
    pub fn path(&self, filename: &str) -> Result<PathBuf> {
        Ok(self.config.base_dir.join(plain_filename(filename)?))
    }

    /// Absolute path of a public-relative path.
    pub fn public_path(&self, relative: &str) -> PathBuf {
        self.config.public_root.join(relative)
    }

    /// URL of a public-relative path.
    pub fn public_url(&self, relative: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_url_prefix.trim_end_matches('/'),
            relative.trim_start_matches('/')
        )
    }

    /// Copy `source` into the staging directory.
    ///
    /// Without `filename` a random name with the source's extension is used.
    ///
    /// # Errors
    ///
    /// - [`DocError::FileNotFound`] if `source` does not exist
    /// - [`DocError::AlreadyExists`] if `filename` is taken
    /// - [`DocError::InvalidFilename`] if `filename` has directory parts
    pub async fn store(&self, source: &Path, filename: Option<&str>) -> Result<PathBuf> {
        let contents = read_source(source).await?;

        let target = match filename {
            Some(name) => {
                let target = self.path(name)?;
                write_new(&target, &contents).await?;
                target
            }
            None => {
                self.write_generated(&contents, extension_of(source).as_deref())
                    .await?
            }
        };

        debug!(source = %source.display(), target = %target.display(), "Stored file");
        Ok(target)
    }

    /// Write `contents` to a freshly generated path.
    pub async fn store_contents(&self, contents: &[u8], extension: &str) -> Result<PathBuf> {
        let extension = extension.trim_start_matches('.');
        let extension = (!extension.is_empty()).then_some(extension);
        let target = self.write_generated(contents, extension).await?;
        debug!(target = %target.display(), bytes = contents.len(), "Stored contents");
        Ok(target)
    }

    /// Stage an uploaded file and confirm it landed on disk.
    ///
    /// A `lifetime` shorter or longer than the configured one is honoured by
    /// shifting the file's mtime, so the regular sweep reclaims it on time.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::StagingFailed`] if the staged file does not exist
    /// after the write, [`DocError::InvalidOption`] if `lifetime` reaches
    /// past what the clock can represent, besides the errors of
    /// [`TemporaryStorage::store`].
    pub async fn store_uploaded_file(
        &self,
        upload: &UploadedFile,
        lifetime: Option<Duration>,
    ) -> Result<PathBuf> {
        let modified = match lifetime {
            Some(lifetime) => Some(
                shifted_mtime(SystemTime::now(), lifetime, self.config.lifetime).ok_or_else(
                    || DocError::invalid_option("lifetime", format!("{lifetime:?} is too long")),
                )?,
            ),
            None => None,
        };

        let contents = read_source(&upload.path).await?;
        let target = self
            .write_generated(&contents, upload.extension().as_deref())
            .await?;

        if !fs::try_exists(&target).await.unwrap_or(false) {
            return Err(DocError::StagingFailed { path: target });
        }

        if let Some(modified) = modified {
            set_modified(&target, modified).await?;
        }

        info!(
            upload = %upload.original_name,
            target = %target.display(),
            bytes = contents.len(),
            "Staged upload"
        );
        Ok(target)
    }

    /// Reserve a unique path without writing to it.
    ///
    /// A missing base directory is recreated with permissive mode so that
    /// an external tool running as another user can write the file. An
    /// existing one keeps its permissions.
    pub async fn temporary_file_path(&self, extension: &str) -> Result<PathBuf> {
        let base_dir = &self.config.base_dir;
        if !fs::try_exists(base_dir).await? {
            ensure_dir(base_dir, SHARED_DIR_MODE).await?;
            // DirBuilder modes are filtered by the umask
            set_mode(base_dir, SHARED_DIR_MODE).await?;
        }

        let extension = extension.trim_start_matches('.');
        loop {
            let candidate = self
                .config
                .base_dir
                .join(generated_name((!extension.is_empty()).then_some(extension)));
            if !fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
    }

    /// Copy a finished PDF into the public directory.
    ///
    /// The name is sanitized and forced to end in `.pdf`; without `filename`
    /// a random one is generated. The copy is written to a hidden sibling and
    /// renamed into place, so readers never see a partial file; a published
    /// file of the same name is replaced. Returns the path relative to the
    /// public root, e.g. `pdfs/report.pdf`.
    pub async fn store_pdf_in_public(&self, source: &Path, filename: Option<&str>) -> Result<String> {
        let contents = read_source(source).await?;

        let filename = match filename {
            Some(name) => public_filename(name)?,
            None => generated_name(Some("pdf")),
        };

        let public_dir = self.config.public_root.join(&self.config.public_subdir);
        ensure_dir(&public_dir, PUBLIC_DIR_MODE).await?;

        let target = public_dir.join(&filename);
        let staged = public_dir.join(format!(".{}.part", random_token(16)));
        write_new(&staged, &contents).await?;

        let published = async {
            set_mode(&staged, PUBLIC_FILE_MODE).await?;
            if fs::try_exists(&target).await? {
                warn!(target = %target.display(), "Replacing published PDF");
            }
            fs::rename(&staged, &target)
                .await
                .map_err(|e| DocError::FailedToWrite {
                    path: target.clone(),
                    source: e,
                })
        }
        .await;
        if let Err(e) = published {
            let _ = fs::remove_file(&staged).await;
            return Err(e);
        }

        let relative = format!("{}/{}", self.config.public_subdir, filename);
        info!(source = %source.display(), relative = %relative, "Published PDF");
        Ok(relative)
    }

    /// Delete regular files older than the lifetime. Returns how many.
    ///
    /// Safe to run concurrently with writers and with other sweeps: files
    /// that vanish mid-sweep are skipped.
    pub async fn cleanup(&self) -> Result<usize> {
        let Some(threshold) = SystemTime::now().checked_sub(self.config.lifetime) else {
            return Ok(0);
        };

        let mut entries = match fs::read_dir(&self.config.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !meta.is_file() {
                continue;
            }

            let expired = meta.modified().is_ok_and(|modified| modified < threshold);
            if !expired {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Could not remove expired file");
                }
            }
        }

        if removed > 0 {
            info!(removed, dir = %self.config.base_dir.display(), "Reclaimed expired files");
        }
        Ok(removed)
    }

    /// Remove a staged file. Returns false if it was already gone.
    pub async fn delete(&self, filename: &str) -> bool {
        let Ok(path) = self.path(filename) else {
            return false;
        };
        match fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Could not delete staged file");
                }
                false
            }
        }
    }

    async fn write_generated(&self, contents: &[u8], extension: Option<&str>) -> Result<PathBuf> {
        loop {
            let target = self.config.base_dir.join(generated_name(extension));
            match write_new(&target, contents).await {
                Err(DocError::AlreadyExists { .. }) => continue,
                other => return other.map(|()| target),
            }
        }
    }
}

fn generated_name(extension: Option<&str>) -> String {
    let token = random_token(TOKEN_LENGTH);
    match extension {
        Some(ext) => format!("{token}.{ext}"),
        None => token,
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_lowercase)
}

/// Accept a bare file name; reject anything that would leave the directory.
fn plain_filename(name: &str) -> Result<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(DocError::InvalidFilename {
            name: name.to_string(),
        }),
    }
}

/// Sanitize a publish name: keep `[A-Za-z0-9._-]`, replace the rest with
/// `_`, and make sure it ends in `.pdf`.
fn public_filename(name: &str) -> Result<String> {
    let base = Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let mut sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if !sanitized.to_lowercase().ends_with(".pdf") {
        sanitized.push_str(".pdf");
    }

    let stem = &sanitized[..sanitized.len() - 4];
    if stem.trim_matches(|c| c == '.' || c == '_').is_empty() {
        return Err(DocError::InvalidFilename {
            name: name.to_string(),
        });
    }
    Ok(sanitized)
}

/// Mtime that makes a sweep with `global` lifetime reclaim the file after
/// `lifetime` instead. `None` if that instant is not representable.
fn shifted_mtime(now: SystemTime, lifetime: Duration, global: Duration) -> Option<SystemTime> {
    if lifetime >= global {
        now.checked_add(lifetime - global)
    } else {
        Some(now.checked_sub(global - lifetime).unwrap_or(now))
    }
}

async fn read_source(source: &Path) -> Result<Vec<u8>> {
    fs::read(source).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DocError::file_not_found(source),
        _ => DocError::Io(e),
    })
}

async fn write_new(target: &Path, contents: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .await
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => DocError::AlreadyExists {
                path: target.to_path_buf(),
            },
            _ => DocError::FailedToCreateOutput {
                path: target.to_path_buf(),
                source: e,
            },
        })?;

    let written = async {
        file.write_all(contents).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        let _ = fs::remove_file(target).await;
        return Err(DocError::FailedToWrite {
            path: target.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

async fn set_modified(path: &Path, modified: SystemTime) -> Result<()> {
    let file = fs::File::options().write(true).open(path).await?.into_std().await;
    tokio::task::spawn_blocking(move || file.set_modified(modified))
        .await
        .map_err(|e| DocError::other(format!("Timestamp task failed: {e}")))??;
    Ok(())
}
