//! Error types for docpipe.
//!
//! Every fallible routine in the library returns [`DocError`]. Operations
//! never let these escape across the processing boundary: the
//! [`Processor`](crate::operation::Processor) turns them into a failed
//! [`OperationResult`](crate::result::OperationResult).
//!
//! # Error Categories
//!
//! - **Input Errors**: missing files, missing options, empty page selections
//! - **PDF Errors**: unreadable or encrypted documents
//! - **Tool Errors**: external executable missing, failing or timing out
//! - **I/O Errors**: output or staging writes that did not land on disk

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for docpipe operations.
pub type Result<T> = std::result::Result<T, DocError>;

/// Main error type for docpipe operations.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    /// Input file was not found.
    #[error("File not found: {}", .path.display())]
    FileNotFound {
        /// Path to the file that was not found.
        path: PathBuf,
    },

    /// Path exists but is not a regular file.
    #[error("Not a file: {}", .path.display())]
    NotAFile {
        /// Path that is not a file.
        path: PathBuf,
    },

    /// Failed to load a PDF file.
    #[error("Failed to load PDF: {}\n  Reason: {reason}", .path.display())]
    FailedToLoadPdf {
        /// Path to the PDF file.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// PDF is encrypted and cannot be processed in-process.
    #[error(
        "PDF is encrypted and cannot be processed: {}\n  Hint: Decrypt the PDF first using 'qpdf --decrypt'",
        .path.display()
    )]
    EncryptedPdf {
        /// Path to the encrypted PDF.
        path: PathBuf,
    },

    /// Image could not be decoded.
    #[error("Failed to decode image: {}\n  Reason: {reason}", .path.display())]
    FailedToDecodeImage {
        /// Path to the image.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// A required option key is absent or empty.
    #[error("Missing required option: {key}")]
    MissingOption {
        /// Option key.
        key: String,
    },

    /// An option is present but has an unusable value.
    #[error("Invalid value for option '{key}': {reason}")]
    InvalidOption {
        /// Option key.
        key: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// No requested page lies inside the document.
    #[error("No valid pages selected from '{requested}' (document has {total_pages} page(s))")]
    NoValidPages {
        /// Requested page specification.
        requested: String,
        /// Pages in the source document.
        total_pages: usize,
    },

    /// A removal request would leave an empty document.
    #[error("Cannot remove {requested} page(s) from a document with {total_pages} page(s)")]
    RemovesAllPages {
        /// Number of in-range pages requested for removal.
        requested: usize,
        /// Pages in the source document.
        total_pages: usize,
    },

    /// No files were listed for a multi-file operation.
    #[error("No input files specified")]
    NoFilesToMerge,

    /// Every listed input was skipped.
    #[error("None of the {listed} input file(s) could be used")]
    NoUsableInputs {
        /// Number of inputs that were listed.
        listed: usize,
    },

    /// Neither a user nor an owner password was supplied.
    #[error("At least one of user_password or owner_password is required")]
    PasswordRequired,

    /// External tool could not be located.
    #[error("Required tool not found: {tool}\n  Hint: install {tool} or set DOCPIPE_QPDF_PATH")]
    ToolNotFound {
        /// Tool name.
        tool: String,
    },

    /// External tool exited unsuccessfully.
    #[error("{tool} failed (exit code {}): {stderr}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    ToolFailed {
        /// Tool name.
        tool: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Captured error stream.
        stderr: String,
    },

    /// External tool exceeded its time budget and was killed.
    #[error("{tool} timed out after {}s", .timeout.as_secs())]
    ToolTimedOut {
        /// Tool name.
        tool: String,
        /// Applied timeout.
        timeout: Duration,
    },

    /// Target file already exists and must not be overwritten.
    #[error("File already exists: {}", .path.display())]
    AlreadyExists {
        /// Existing path.
        path: PathBuf,
    },

    /// Failed to create an output file or directory.
    #[error("Failed to create output: {}\n  Reason: {source}", .path.display())]
    FailedToCreateOutput {
        /// Path that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to write an output file.
    #[error("Failed to write output: {}\n  Reason: {source}", .path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A staged file is missing right after it was written.
    #[error("Staged file was not written to disk: {}", .path.display())]
    StagingFailed {
        /// Expected staging path.
        path: PathBuf,
    },

    /// An operation reported success but its output is missing or empty.
    #[error("Output was not produced: {}", .path.display())]
    OutputMissing {
        /// Expected output path.
        path: PathBuf,
    },

    /// Filename rejected by the storage layer.
    #[error("Invalid file name: {name}")]
    InvalidFilename {
        /// Offending name.
        name: String,
    },

    /// Metadata could not be applied.
    #[error("Failed to set metadata: {reason}")]
    MetadataFailed {
        /// Details about the failure.
        reason: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong.
        message: String,
    },

    /// Structural PDF error raised by lopdf.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl DocError {
    /// Create a FileNotFound error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a NotAFile error.
    pub fn not_a_file(path: impl Into<PathBuf>) -> Self {
        Self::NotAFile { path: path.into() }
    }

    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingOption error.
    pub fn missing_option(key: impl Into<String>) -> Self {
        Self::MissingOption { key: key.into() }
    }

    /// Create an InvalidOption error.
    pub fn invalid_option(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a ToolNotFound error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether a multi-input operation may skip the offending input and
    /// carry on with the rest.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. }
                | Self::NotAFile { .. }
                | Self::FailedToLoadPdf { .. }
                | Self::EncryptedPdf { .. }
                | Self::FailedToDecodeImage { .. }
        )
    }

    /// Short machine-readable category, recorded alongside results.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. }
            | Self::NotAFile { .. }
            | Self::MissingOption { .. }
            | Self::InvalidOption { .. }
            | Self::NoFilesToMerge
            | Self::PasswordRequired
            | Self::InvalidFilename { .. } => "invalid_input",
            Self::NoValidPages { .. }
            | Self::RemovesAllPages { .. }
            | Self::NoUsableInputs { .. } => "empty_result",
            Self::FailedToLoadPdf { .. }
            | Self::EncryptedPdf { .. }
            | Self::FailedToDecodeImage { .. }
            | Self::Pdf(_)
            | Self::MetadataFailed { .. } => "document",
            Self::ToolNotFound { .. } | Self::ToolFailed { .. } | Self::ToolTimedOut { .. } => {
                "external_tool"
            }
            Self::AlreadyExists { .. }
            | Self::FailedToCreateOutput { .. }
            | Self::FailedToWrite { .. }
            | Self::StagingFailed { .. }
            | Self::OutputMissing { .. }
            | Self::Io(_) => "io",
            Self::InvalidConfig { .. } => "config",
            Self::Other { .. } => "other",
        }
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        exit_code_for(self.kind())
    }
}

/// Process exit code for an error kind as reported by [`DocError::kind`].
pub fn exit_code_for(kind: &str) -> i32 {
    match kind {
        "invalid_input" => 2,
        "document" => 3,
        "empty_result" => 4,
        "io" => 5,
        "external_tool" => 6,
        _ => 1,
    }
}
