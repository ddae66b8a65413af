//! PDF loading.
//!
//! lopdf parses synchronously, so documents are loaded on tokio's blocking
//! pool to keep the runtime responsive while large files are read.
//!
//! # Examples
//!
//! ```no_run
//! use docpipe::io::PdfReader;
//! use std::path::Path;
//!
//! # async fn example() -> docpipe::Result<()> {
//! let reader = PdfReader::new();
//! let loaded = reader.load(Path::new("input.pdf")).await?;
//! println!("{} pages, {} bytes", loaded.page_count, loaded.file_size);
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;
use tracing::debug;

use crate::error::{DocError, Result};
use crate::utils::check_file_exists;

/// A loaded PDF document with metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The PDF document.
    pub document: Document,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Time taken to load the document.
    pub load_time: Duration,

    /// File size in bytes.
    pub file_size: u64,
}

/// PDF reader.
#[derive(Debug, Clone, Default)]
pub struct PdfReader {
    allow_empty: bool,
}

impl PdfReader {
    /// Create a reader that rejects documents without pages.
    pub fn new() -> Self {
        Self { allow_empty: false }
    }

    /// Create a reader that accepts documents without pages.
    pub fn allow_empty() -> Self {
        Self { allow_empty: true }
    }

    /// Load a single PDF document.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path does not exist or is not a regular file
    /// - The file is not a valid PDF
    /// - The PDF is encrypted
    /// - The PDF has no pages (unless created with [`PdfReader::allow_empty`])
    pub async fn load(&self, path: &Path) -> Result<LoadedPdf> {
        check_file_exists(path).await?;

        let path_buf = path.to_path_buf();
        let allow_empty = self.allow_empty;

        task::spawn_blocking(move || {
            let start = Instant::now();

            let document = Document::load(&path_buf).map_err(|e| {
                let message = e.to_string();
                let lowered = message.to_lowercase();
                if lowered.contains("encrypt") || lowered.contains("password") {
                    DocError::EncryptedPdf {
                        path: path_buf.clone(),
                    }
                } else {
                    DocError::failed_to_load_pdf(path_buf.clone(), message)
                }
            })?;

            if document.is_encrypted() {
                return Err(DocError::EncryptedPdf { path: path_buf });
            }

            let page_count = document.get_pages().len();
            if page_count == 0 && !allow_empty {
                return Err(DocError::failed_to_load_pdf(path_buf, "PDF has no pages"));
            }

            let file_size = std::fs::metadata(&path_buf).map(|m| m.len()).unwrap_or(0);
            let load_time = start.elapsed();

            debug!(
                path = %path_buf.display(),
                pages = page_count,
                bytes = file_size,
                elapsed_ms = load_time.as_millis() as u64,
                "Loaded PDF"
            );

            Ok(LoadedPdf {
                document,
                path: path_buf,
                page_count,
                load_time,
                file_size,
            })
        })
        .await
        .map_err(|e| DocError::other(format!("Load task failed: {e}")))?
    }
}
