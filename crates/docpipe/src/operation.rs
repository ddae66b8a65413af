//! The operation contract.
//!
//! Each transformation implements [`Operation`]: a fallible `execute` that
//! returns an [`Outcome`] or a [`DocError`]. Callers do not use `execute`
//! directly; they wrap the operation in a [`Processor`], which owns the
//! boundary. `process` never fails: errors and panics alike become a
//! failed [`OperationResult`] retrievable through [`Processor::info`].
//!
//! # Examples
//!
//! ```no_run
//! use docpipe::{Options, Processor};
//! use docpipe::ops::ExtractPages;
//!
//! # async fn example() {
//! let mut processor = Processor::new(ExtractPages::new());
//! let options = Options::new().with("pages", "1,3-5");
//!
//! if !processor.process("in.pdf", "out/extract.pdf", &options).await {
//!     eprintln!("{}", processor.info().message);
//! }
//! # }
//! ```

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{DocError, Result};
use crate::ops::{ExtractPages, ImagesToPdf, MergePdfs, ProtectPdf, RemovePages};
use crate::options::Options;
use crate::result::OperationResult;

/// Identifies an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// Concatenate several PDFs.
    Merge,
    /// Keep selected pages.
    Extract,
    /// Drop selected pages.
    Remove,
    /// Encrypt with passwords and restrictions.
    Protect,
    /// One page per image.
    ImagesToPdf,
}

impl OperationKind {
    /// All kinds, in display order.
    pub const ALL: [Self; 5] = [
        Self::Merge,
        Self::Extract,
        Self::Remove,
        Self::Protect,
        Self::ImagesToPdf,
    ];

    /// Stable name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Extract => "extract",
            Self::Remove => "remove",
            Self::Protect => "protect",
            Self::ImagesToPdf => "images-to-pdf",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                DocError::invalid_option(
                    "operation",
                    format!(
                        "{s}. Must be one of: {}",
                        Self::ALL.map(|k| k.as_str()).join(", ")
                    ),
                )
            })
    }
}

/// Arguments of one `process` call.
#[derive(Debug, Clone, Copy)]
pub struct OperationRequest<'a> {
    /// Primary input. Multi-input operations may ignore it.
    pub input: &'a Path,
    /// Output file to write.
    pub output: &'a Path,
    /// Per-call options.
    pub options: &'a Options,
}

/// What a successful `execute` reports.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    /// Human-readable summary.
    pub message: String,
    /// Operation-specific facts.
    pub details: Map<String, Value>,
    /// Inputs or pages that were skipped.
    pub warnings: Vec<String>,
}

impl Outcome {
    /// Outcome with a message and no details.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Builder-style detail insert.
    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Attach warnings.
    pub fn warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// A single document transformation.
pub trait Operation: Send + Sync {
    /// Which operation this is.
    fn kind(&self) -> OperationKind;

    /// Run the transformation.
    ///
    /// On success the output file exists and is non-empty. On error no
    /// partial output is left at `request.output`.
    fn execute(&self, request: &OperationRequest<'_>)
    -> impl Future<Output = Result<Outcome>> + Send;
}

/// Runs an operation and keeps the result of the last call.
#[derive(Debug)]
pub struct Processor<O> {
    operation: O,
    last: OperationResult,
}

impl<O: Operation> Processor<O> {
    /// Wrap an operation.
    pub fn new(operation: O) -> Self {
        Self {
            operation,
            last: OperationResult::not_run(),
        }
    }

    /// The wrapped operation.
    pub fn operation(&self) -> &O {
        &self.operation
    }

    /// Run the operation. Returns whether it succeeded.
    ///
    /// Details of the run are available from [`Processor::info`] afterwards.
    pub async fn process(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        options: &Options,
    ) -> bool {
        let (input, output) = (input.as_ref(), output.as_ref());
        let request = OperationRequest {
            input,
            output,
            options,
        };
        let kind = self.operation.kind();
        let start = Instant::now();

        info!(
            operation = %kind,
            input = %input.display(),
            output = %output.display(),
            "Processing"
        );

        let executed = AssertUnwindSafe(self.operation.execute(&request))
            .catch_unwind()
            .await;

        let result = match executed {
            Ok(Ok(outcome)) => match verify_output(output).await {
                Ok(()) => {
                    info!(
                        operation = %kind,
                        warnings = outcome.warnings.len(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "{}",
                        outcome.message
                    );
                    OperationResult::succeeded(outcome.message, outcome.details, outcome.warnings)
                }
                Err(err) => {
                    warn!(operation = %kind, error = %err, "Operation produced no output");
                    OperationResult::failed(&err)
                }
            },
            Ok(Err(err)) => {
                warn!(operation = %kind, kind = err.kind(), error = %err, "Operation failed");
                OperationResult::failed(&err)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(operation = %kind, panic = %message, "Operation panicked");
                OperationResult::panicked(&message)
            }
        };

        self.last = result;
        self.last.success
    }

    /// Result of the last `process` call.
    pub fn info(&self) -> &OperationResult {
        &self.last
    }

    /// Consume the processor, returning the last result.
    pub fn into_info(self) -> OperationResult {
        self.last
    }
}

async fn verify_output(output: &Path) -> Result<()> {
    match tokio::fs::metadata(output).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(DocError::OutputMissing {
            path: output.to_path_buf(),
        }),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Any of the built-in operations, dispatched by [`OperationKind`].
#[derive(Debug, Clone)]
pub enum AnyOperation {
    /// See [`MergePdfs`].
    Merge(MergePdfs),
    /// See [`ExtractPages`].
    Extract(ExtractPages),
    /// See [`RemovePages`].
    Remove(RemovePages),
    /// See [`ProtectPdf`].
    Protect(ProtectPdf),
    /// See [`ImagesToPdf`].
    ImagesToPdf(ImagesToPdf),
}

impl AnyOperation {
    /// Construct the operation for `kind`.
    ///
    /// Operations that need an external tool resolve it here.
    pub fn new(kind: OperationKind, config: &Config) -> Self {
        match kind {
            OperationKind::Merge => Self::Merge(MergePdfs::new()),
            OperationKind::Extract => Self::Extract(ExtractPages::new()),
            OperationKind::Remove => Self::Remove(RemovePages::new()),
            OperationKind::Protect => Self::Protect(ProtectPdf::new(&config.tools)),
            OperationKind::ImagesToPdf => Self::ImagesToPdf(ImagesToPdf::new()),
        }
    }
}

impl Operation for AnyOperation {
    fn kind(&self) -> OperationKind {
        match self {
            Self::Merge(op) => op.kind(),
            Self::Extract(op) => op.kind(),
            Self::Remove(op) => op.kind(),
            Self::Protect(op) => op.kind(),
            Self::ImagesToPdf(op) => op.kind(),
        }
    }

    async fn execute(&self, request: &OperationRequest<'_>) -> Result<Outcome> {
        match self {
            Self::Merge(op) => op.execute(request).await,
            Self::Extract(op) => op.execute(request).await,
            Self::Remove(op) => op.execute(request).await,
            Self::Protect(op) => op.execute(request).await,
            Self::ImagesToPdf(op) => op.execute(request).await,
        }
    }
}
