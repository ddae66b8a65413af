//! Page removal.

use tracing::{debug, warn};

use crate::error::{DocError, Result};
use crate::io::PdfReader;
use crate::operation::{Operation, OperationKind, OperationRequest, Outcome};
use crate::pdf::DocumentBuilder;
use crate::utils::{check_file_exists, ensure_parent_dir};

use super::{geometry_value, requested_pages, save_built};

/// Drop the pages named by the `pages` option, keeping the rest in their
/// original order.
///
/// Fails if the removal would leave an empty document, or if none of the
/// requested pages exists.
///
/// Options: `pages` (required), `metadata`, `quality`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemovePages;

impl RemovePages {
    /// Create the operation.
    pub fn new() -> Self {
        Self
    }
}

impl Operation for RemovePages {
    fn kind(&self) -> OperationKind {
        OperationKind::Remove
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

        let removed = selection.valid;
        if removed.is_empty() {
            return Err(DocError::NoValidPages {
                requested: requested.to_string(),
                total_pages: total,
            });
        }
        if removed.len() >= total {
            return Err(DocError::RemovesAllPages {
                requested: removed.len(),
                total_pages: total,
            });
        }

        let kept: Vec<u32> = (1..=total as u32)
            .filter(|&page| removed.binary_search(&page).is_err())
            .collect();

        debug!(removed = ?removed, kept = kept.len(), "Removing pages");

        let mut builder = DocumentBuilder::new();
        builder.import_pages(&loaded.document, &kept)?;
        let geometry = builder.geometry().to_vec();

        let stats = save_built(
            builder,
            &request.options.metadata(),
            compression,
            request.output,
        )
        .await?;

        Ok(Outcome::new(format!(
            "Removed {} page(s), {} of {total} remain",
            removed.len(),
            kept.len()
        ))
        .detail("pages_removed", removed.len())
        .detail("pages_kept", kept.len())
        .detail("total_pages", total)
        .detail("removed", removed)
        .detail("pages", kept)
        .detail("geometry", geometry_value(&geometry))
        .detail("output_size", stats.file_size)
        .warnings(selection.warnings))
    }
}
