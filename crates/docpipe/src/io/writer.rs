//! PDF writing.
//!
//! Documents are written to a hidden sibling of the output path and renamed
//! into place once complete, so a failed write never leaves something that
//! looks like a finished output. The parent directory is created on demand.

use lopdf::Document;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;
use tracing::debug;

use crate::config::CompressionLevel;
use crate::error::{DocError, Result};
use crate::storage::random_token;
use crate::utils::{ensure_parent_dir, format_file_size, staging_path};

const WRITE_BUFFER_SIZE: usize = 8192;

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,

    /// Compression applied before writing.
    pub compression: CompressionLevel,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// PDF writer.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    compression: CompressionLevel,
}

impl PdfWriter {
    /// Create a writer with standard compression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with the given compression level.
    pub fn with_compression(compression: CompressionLevel) -> Self {
        Self { compression }
    }

    /// Consume `doc` and write it to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The output directory cannot be created
    /// - The staging file cannot be created or written
    /// - The final rename fails
    ///
    /// No file is left at `path` or at the staging path on error.
    pub async fn save(&self, doc: Document, path: &Path) -> Result<WriteStatistics> {
        ensure_parent_dir(path).await?;

        let path_buf = path.to_path_buf();
        let compression = self.compression;

        task::spawn_blocking(move || {
            let start = Instant::now();
            let staged = staging_path(&path_buf, &random_token(8));

            let written = write_document(doc, &staged, compression)
                .and_then(|()| {
                    std::fs::rename(&staged, &path_buf).map_err(|e| DocError::FailedToWrite {
                        path: path_buf.clone(),
                        source: e,
                    })
                });
            if let Err(err) = written {
                let _ = std::fs::remove_file(&staged);
                return Err(err);
            }

            let file_size = std::fs::metadata(&path_buf).map(|m| m.len()).unwrap_or(0);
            let write_time = start.elapsed();

            debug!(
                path = %path_buf.display(),
                bytes = file_size,
                compression = compression.as_str(),
                "Wrote PDF"
            );

            Ok(WriteStatistics {
                write_time,
                file_size,
                output_path: path_buf,
                compression,
            })
        })
        .await
        .map_err(|e| DocError::other(format!("Write task failed: {e}")))?
    }
}

fn write_document(
    mut doc: Document,
    path: &Path,
    compression: CompressionLevel,
) -> Result<()> {
    match compression {
        CompressionLevel::None => {}
        CompressionLevel::Standard => {
            doc.compress();
            doc.renumber_objects();
        }
        CompressionLevel::Maximum => {
            doc.prune_objects();
            doc.compress();
            doc.renumber_objects();
        }
    }

    let file = std::fs::File::create(path).map_err(|e| DocError::FailedToCreateOutput {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut writer = std::io::BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

    doc.save_to(&mut writer)
        .map_err(|e| DocError::FailedToWrite {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?;

    writer.flush().map_err(|e| DocError::FailedToWrite {
        path: path.to_path_buf(),
        source: e,
    })
}
