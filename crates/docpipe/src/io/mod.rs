//! Loading and saving PDF documents.
//!
//! # Examples
//!
//! ```no_run
//! use docpipe::io::{PdfReader, PdfWriter};
//! use std::path::Path;
//!
//! # async fn example() -> docpipe::Result<()> {
//! let loaded = PdfReader::new().load(Path::new("input.pdf")).await?;
//! PdfWriter::new()
//!     .save(loaded.document, Path::new("output.pdf"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod reader;
pub mod writer;

pub use reader::{LoadedPdf, PdfReader};
pub use writer::{PdfWriter, WriteStatistics};
