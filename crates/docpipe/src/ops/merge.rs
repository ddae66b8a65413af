//! Merging several PDFs into one.

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::{DocError, Result};
use crate::io::PdfReader;
use crate::operation::{Operation, OperationKind, OperationRequest, Outcome};
use crate::pdf::DocumentBuilder;
use crate::utils::ensure_parent_dir;

use super::{geometry_value, save_built, warning_text};

/// Concatenate the documents listed in the `files` option.
///
/// Files are taken in list order, each with all of its pages in order. A
/// file that is missing or cannot be read is skipped with a warning; the
/// merge only fails if the list is empty or nothing could be used. The
/// primary input path is ignored.
///
/// Options: `files` (required), `metadata`, `quality`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergePdfs;

impl MergePdfs {
    /// Create the operation.
    pub fn new() -> Self {
        Self
    }
}

impl Operation for MergePdfs {
    fn kind(&self) -> OperationKind {
        OperationKind::Merge
    }

    async fn execute(&self, request: &OperationRequest<'_>) -> Result<Outcome> {
        let files = request.options.paths("files");
        if files.is_empty() {
            return Err(DocError::NoFilesToMerge);
        }
        let compression = request.options.compression()?;
        ensure_parent_dir(request.output).await?;

        let reader = PdfReader::new();
        let mut builder = DocumentBuilder::new();
        let mut merged = Vec::new();
        let mut warnings = Vec::new();

        for path in &files {
            let imported = match reader.load(path).await {
                Ok(loaded) => {
                    let pages: Vec<u32> = (1..=loaded.page_count as u32).collect();
                    builder
                        .import_pages(&loaded.document, &pages)
                        .map(|_| loaded.page_count)
                }
                Err(err) => Err(err),
            };

            match imported {
                Ok(pages) => {
                    info!(file = %path.display(), pages, "Merged file");
                    merged.push(json!({ "file": path.display().to_string(), "pages": pages }));
                }
                Err(err) if err.is_recoverable() || matches!(err, DocError::Pdf(_)) => {
                    let warning = format!("Skipped {}: {}", path.display(), warning_text(&err));
                    warn!(file = %path.display(), error = %err, "Skipping file");
                    warnings.push(warning);
                }
                Err(err) => return Err(err),
            }
        }

        if merged.is_empty() {
            return Err(DocError::NoUsableInputs {
                listed: files.len(),
            });
        }

        let total_pages = builder.page_count();
        let geometry = builder.geometry().to_vec();
        let stats = save_built(
            builder,
            &request.options.metadata(),
            compression,
            request.output,
        )
        .await?;

        Ok(Outcome::new(format!(
            "Merged {} of {} file(s) into {total_pages} page(s)",
            merged.len(),
            files.len()
        ))
        .detail("files_count", files.len())
        .detail("files_merged", merged.len())
        .detail("total_pages", total_pages)
        .detail("files", Value::Array(merged))
        .detail("geometry", geometry_value(&geometry))
        .detail("output_size", stats.file_size)
        .warnings(warnings))
    }
}
