//! Page extraction.

use tracing::{debug, warn};

use crate::error::{DocError, Result};
use crate::io::PdfReader;
use crate::operation::{Operation, OperationKind, OperationRequest, Outcome};
use crate::pdf::DocumentBuilder;
use crate::utils::{check_file_exists, ensure_parent_dir};

use super::{geometry_value, requested_pages, save_built};

/// Keep the pages named by the `pages` option, in ascending order.
///
/// Requested pages outside the document become warnings. The operation
/// fails if none of the requested pages exists.
///
/// Options: `pages` (required), `metadata`, `quality`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractPages;

impl ExtractPages {
    /// Create the operation.
    pub fn new() -> Self {
        Self
    }
}

impl Operation for ExtractPages {
    fn kind(&self) -> OperationKind {
        OperationKind::Extract
    }

    async fn execute(&self, request: &OperationRequest<'_>) -> Result<Outcome> {
        check_file_exists(request.input).await?;
        ensure_parent_dir(request.output).await?;

        let requested = requested_pages(request.options)?;
        let compression = request.options.compression()?;

        let loaded = PdfReader::new().load(request.input).await?;
        let total = loaded.page_count;
        let selection = requested.select(total as u32);

        for warning in &selection.warnings {
            warn!(input = %request.input.display(), "{warning}");
        }
        if selection.valid.is_empty() {
            return Err(DocError::NoValidPages {
                requested: requested.to_string(),
                total_pages: total,
            });
        }

        debug!(pages = ?selection.valid, total, "Extracting pages");

        let mut builder = DocumentBuilder::new();
        builder.import_pages(&loaded.document, &selection.valid)?;
        let geometry = builder.geometry().to_vec();

        let stats = save_built(
            builder,
            &request.options.metadata(),
            compression,
            request.output,
        )
        .await?;

        let extracted = selection.valid.len();
        Ok(
            Outcome::new(format!("Extracted {extracted} of {total} page(s)"))
                .detail("pages_extracted", extracted)
                .detail("total_pages", total)
                .detail("pages", selection.valid)
                .detail("geometry", geometry_value(&geometry))
                .detail("output_size", stats.file_size)
                .warnings(selection.warnings),
        )
    }
}
