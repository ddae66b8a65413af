//! The built-in operations.
//!
//! | Operation        | Engine                         | Inputs                  |
//! |------------------|--------------------------------|-------------------------|
//! | [`MergePdfs`]    | lopdf page import              | `files` option          |
//! | [`ExtractPages`] | lopdf page import              | primary input + `pages` |
//! | [`RemovePages`]  | lopdf page import              | primary input + `pages` |
//! | [`ProtectPdf`]   | `qpdf --encrypt` subprocess    | primary input           |
//! | [`ImagesToPdf`]  | `image` decoding + lopdf pages | `files` or primary      |

pub mod extract;
pub mod images;
pub mod merge;
pub mod protect;
pub mod remove;

pub use extract::ExtractPages;
pub use images::{ImagesToPdf, PageSize};
pub use merge::MergePdfs;
pub use protect::{ProtectPdf, Restriction};
pub use remove::RemovePages;

use serde_json::Value;
use std::path::Path;

use crate::config::{CompressionLevel, Metadata};
use crate::error::{DocError, Result};
use crate::io::{PdfWriter, WriteStatistics};
use crate::options::Options;
use crate::pdf::{DocumentBuilder, MetadataManager, PageGeometry, PageSet};

/// Parse the `pages` option. Absent or blank is an error.
pub(crate) fn requested_pages(options: &Options) -> Result<PageSet> {
    let tokens = options.tokens("pages");
    if tokens.is_empty() {
        return Err(DocError::missing_option("pages"));
    }
    Ok(PageSet::from_tokens(tokens))
}

/// Apply metadata and write the built document to `output`.
pub(crate) async fn save_built(
    builder: DocumentBuilder,
    metadata: &Metadata,
    compression: CompressionLevel,
    output: &Path,
) -> Result<WriteStatistics> {
    let mut document = builder.finish();
    MetadataManager::new().set_metadata(&mut document, metadata)?;
    PdfWriter::with_compression(compression)
        .save(document, output)
        .await
}

pub(crate) fn geometry_value(geometry: &[PageGeometry]) -> Value {
    serde_json::to_value(geometry).unwrap_or(Value::Null)
}

/// One-line rendering of an error for `details.warnings`.
pub(crate) fn warning_text(err: &DocError) -> String {
    err.to_string()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
