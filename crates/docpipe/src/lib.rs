//! docpipe - Document processing pipeline for PDF files.
//!
//! This library runs discrete transformations over PDF and image files and
//! reports every run through a uniform result record. It provides:
//!
//! - Merging several PDFs into one
//! - Extracting or removing pages by number and range
//! - Password protection through `qpdf`
//! - Turning images into PDF pages
//! - A staging area for uploads and generated files, swept by age
//!
//! # Examples
//!
//! ## Running an Operation
//!
//! ```no_run
//! use docpipe::{Options, Processor};
//! use docpipe::ops::MergePdfs;
//! use serde_json::json;
//!
//! # async fn example() {
//! let options = Options::new().with("files", json!(["a.pdf", "b.pdf"]));
//! let mut processor = Processor::new(MergePdfs::new());
//!
//! if processor.process("", "merged.pdf", &options).await {
//!     println!("{}", processor.info().message);
//! } else if let Some(error) = &processor.info().error {
//!     eprintln!("merge failed: {error}");
//! }
//! # }
//! ```
//!
//! ## Dispatching by Name
//!
//! ```no_run
//! use docpipe::{AnyOperation, Config, OperationKind, Options, Processor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let kind: OperationKind = "protect".parse()?;
//! let options = Options::new().with("user_password", "secret");
//!
//! let mut processor = Processor::new(AnyOperation::new(kind, &config));
//! processor.process("in.pdf", "locked.pdf", &options).await;
//! println!("{}", serde_json::to_string_pretty(processor.info())?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Staging Files
//!
//! ```no_run
//! use docpipe::TemporaryStorage;
//! use docpipe::config::StorageConfig;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = TemporaryStorage::new(StorageConfig::with_base_dir("/tmp/docpipe"))?;
//! let staged = storage.store(Path::new("upload.pdf"), None).await?;
//! let relative = storage.store_pdf_in_public(&staged, Some("Report")).await?;
//! println!("published at {}", storage.public_url(&relative));
//!
//! let swept = storage.cleanup().await?;
//! println!("removed {swept} stale file(s)");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod io;
pub mod operation;
pub mod ops;
pub mod options;
pub mod pdf;
pub mod result;
pub mod storage;
pub mod tools;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{DocError, Result};
pub use operation::{AnyOperation, Operation, OperationKind, Processor};
pub use options::Options;
pub use result::{OperationResult, ProcessingRecord};
pub use storage::TemporaryStorage;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
