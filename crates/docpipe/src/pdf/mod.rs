//! In-process PDF manipulation on top of lopdf.
//!
//! - [`pages`]: page specification parsing and range checks
//! - [`import`]: building new documents out of existing pages
//! - [`metadata`]: the document Info dictionary

pub mod import;
pub mod metadata;
pub mod pages;

pub use import::{DocumentBuilder, Orientation, PageGeometry, document_geometry};
pub use metadata::MetadataManager;
pub use pages::{PageSelection, PageSet};
