//! CLI argument parsing for docpipe.
//!
//! This module defines the command-line interface structure using `clap`.
//! Every global flag can also be given through a `DOCPIPE_*` environment
//! variable.
//!
//! # Examples
//!
//! ```text
//! docpipe merge a.pdf 'chapters/*.pdf' -o book.pdf --title "Book"
//! docpipe extract report.pdf --pages 1,3-5 -o summary.pdf
//! docpipe protect report.pdf --owner-password s3cret --restrict no-print,no-copy -o locked.pdf
//! DOCPIPE_TEMP_LIFETIME=30 docpipe cleanup
//! ```

use clap::{Args, Parser, Subcommand};
use docpipe::config::{Config, StorageConfig, ToolConfig};
use docpipe::error::{DocError, Result};
use docpipe::{OperationKind, Options};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

/// Run document operations from the command line.
///
/// docpipe merges, splits, protects and converts PDF files. Each run
/// reports a result record; failed runs exit with a non-zero status.
#[derive(Parser, Debug)]
#[command(name = "docpipe")]
#[command(version)]
#[command(about = "Merge, split, protect and convert PDF files", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Staging directory for uploads and generated files
    #[arg(long, global = true, env = "DOCPIPE_TEMP_DIR", value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Public root directory; PDFs are published under its `pdfs/`
    #[arg(long, global = true, env = "DOCPIPE_PUBLIC_DIR", value_name = "DIR")]
    pub public_dir: Option<PathBuf>,

    /// URL prefix under which the public root is served
    #[arg(long, global = true, env = "DOCPIPE_PUBLIC_URL", value_name = "PREFIX")]
    pub public_url: Option<String>,

    /// Minutes a staged file lives before cleanup removes it
    #[arg(long, global = true, env = "DOCPIPE_TEMP_LIFETIME", value_name = "MINUTES")]
    pub lifetime: Option<u64>,

    /// Path to the qpdf executable
    ///
    /// Probed before the usual install locations and $PATH.
    #[arg(long, global = true, env = "DOCPIPE_QPDF_PATH", value_name = "PATH")]
    pub qpdf: Option<PathBuf>,

    /// Seconds an external tool may run before it is killed
    #[arg(long, global = true, env = "DOCPIPE_TOOL_TIMEOUT", value_name = "SECONDS")]
    pub tool_timeout: Option<u64>,

    /// Append a JSON line per run to this file
    #[arg(long, global = true, env = "DOCPIPE_HISTORY", value_name = "FILE")]
    pub history: Option<PathBuf>,

    /// Print the result record as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output - log every step
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Output file and document settings shared by every PDF-producing command.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output PDF file path
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Compression applied when writing
    ///
    /// - none: write streams as they are
    /// - standard: compress streams (default)
    /// - maximum: also drop unreferenced objects
    #[arg(long, value_name = "LEVEL", default_value = "standard")]
    #[arg(value_parser = ["none", "standard", "maximum"])]
    pub quality: String,

    /// Set title metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Set author metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub author: Option<String>,

    /// Set subject metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Set keywords metadata for output PDF (comma-separated)
    #[arg(long, value_name = "TEXT")]
    pub keywords: Option<String>,
}

impl OutputArgs {
    fn options(&self) -> Options {
        let mut metadata = Map::new();
        for (key, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("subject", &self.subject),
            ("keywords", &self.keywords),
        ] {
            if let Some(value) = value {
                metadata.insert(key.to_string(), Value::from(value.as_str()));
            }
        }

        let options = Options::new().with("quality", self.quality.as_str());
        if metadata.is_empty() {
            options
        } else {
            options.with("metadata", Value::Object(metadata))
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Concatenate PDFs in the order given
    ///
    /// Unreadable or missing files are skipped with a warning.
    ///
    /// Examples:
    ///   docpipe merge a.pdf b.pdf -o both.pdf
    ///   docpipe merge 'scans/*.pdf' -o scans.pdf
    Merge {
        /// Input PDF files or glob patterns
        #[arg(required = true, value_name = "FILE")]
        inputs: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Keep only the given pages
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Pages to keep (e.g., "1-5,10,15-20")
        #[arg(short, long, value_name = "RANGE")]
        pages: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Drop the given pages
    Remove {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Pages to drop (e.g., "2,4-6")
        #[arg(short, long, value_name = "RANGE")]
        pages: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Encrypt a PDF with qpdf
    Protect {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Password required to open the document
        #[arg(long, env = "DOCPIPE_USER_PASSWORD", hide_env_values = true)]
        user_password: Option<String>,

        /// Password that lifts the restrictions
        #[arg(long, env = "DOCPIPE_OWNER_PASSWORD", hide_env_values = true)]
        owner_password: Option<String>,

        /// Encryption key length in bits (40, 128 or 256)
        #[arg(long, value_name = "BITS")]
        key_length: Option<i64>,

        /// Permissions to withhold: no-print, no-copy, no-modify
        #[arg(long = "restrict", value_name = "FLAG", value_delimiter = ',')]
        restrictions: Vec<String>,
    },

    /// Turn images into a PDF, one page per image
    Images {
        /// Input image files or glob patterns
        #[arg(required = true, value_name = "FILE")]
        inputs: Vec<String>,

        /// Page size: fit, a4 or letter
        #[arg(long, value_name = "SIZE", default_value = "fit")]
        page_size: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Copy a file into the staging directory and print its path
    Stage {
        /// File to stage
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Minutes this file should live instead of the configured lifetime
        #[arg(long, value_name = "MINUTES")]
        expires_in: Option<u64>,
    },

    /// Copy a PDF into the public directory and print its URL
    Publish {
        /// PDF file to publish
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Public file name; sanitized and given a .pdf extension
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },

    /// Remove staged files older than the lifetime
    Cleanup,
}

/// A document operation ready to hand to a processor.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Operation to run.
    pub kind: OperationKind,
    /// Primary input; empty for list-driven operations.
    pub input: PathBuf,
    /// Output file.
    pub output: PathBuf,
    /// Operation options.
    pub options: Options,
}

impl Commands {
    /// Input patterns that need glob expansion before [`Commands::invocation`].
    pub fn patterns(&self) -> &[String] {
        match self {
            Self::Merge { inputs, .. } | Self::Images { inputs, .. } => inputs.as_slice(),
            _ => &[],
        }
    }

    /// The document operation for this command, with `files` as the
    /// expanded input list. `None` for storage commands.
    pub fn invocation(&self, files: &[PathBuf]) -> Option<Invocation> {
        let file_list = || -> Value {
            files
                .iter()
                .map(|f| Value::from(f.to_string_lossy().into_owned()))
                .collect()
        };

        let invocation = match self {
            Self::Merge { output, .. } => Invocation {
                kind: OperationKind::Merge,
                input: PathBuf::new(),
                output: output.output.clone(),
                options: output.options().with("files", file_list()),
            },
            Self::Extract {
                input,
                pages,
                output,
            } => Invocation {
                kind: OperationKind::Extract,
                input: input.clone(),
                output: output.output.clone(),
                options: output.options().with("pages", pages.as_str()),
            },
            Self::Remove {
                input,
                pages,
                output,
            } => Invocation {
                kind: OperationKind::Remove,
                input: input.clone(),
                output: output.output.clone(),
                options: output.options().with("pages", pages.as_str()),
            },
            Self::Protect {
                input,
                output,
                user_password,
                owner_password,
                key_length,
                restrictions,
            } => {
                let mut options = Options::new();
                if let Some(password) = user_password {
                    options.insert("user_password", password.as_str());
                }
                if let Some(password) = owner_password {
                    options.insert("owner_password", password.as_str());
                }
                if let Some(bits) = key_length {
                    options.insert("key_length", *bits);
                }
                if !restrictions.is_empty() {
                    options.insert("restrictions", restrictions.clone());
                }
                Invocation {
                    kind: OperationKind::Protect,
                    input: input.clone(),
                    output: output.clone(),
                    options,
                }
            }
            Self::Images {
                page_size, output, ..
            } => Invocation {
                kind: OperationKind::ImagesToPdf,
                input: PathBuf::new(),
                output: output.output.clone(),
                options: output
                    .options()
                    .with("files", file_list())
                    .with("page_size", page_size.as_str()),
            },
            Self::Stage { .. } | Self::Publish { .. } | Self::Cleanup => return None,
        };
        Some(invocation)
    }
}

impl TryFrom<&Cli> for Config {
    type Error = DocError;

    /// Map global flags onto the library configuration.
    ///
    /// Flags that are absent (on the command line and in the environment)
    /// keep the library defaults.
    fn try_from(cli: &Cli) -> Result<Self> {
        let mut storage = StorageConfig::default();
        if let Some(dir) = &cli.temp_dir {
            storage.base_dir = dir.clone();
        }
        if let Some(dir) = &cli.public_dir {
            storage.public_root = dir.clone();
        }
        if let Some(prefix) = &cli.public_url {
            storage.public_url_prefix = prefix.clone();
        }
        if let Some(minutes) = cli.lifetime {
            storage = storage.lifetime_minutes(minutes)?;
        }

        let mut tools = ToolConfig {
            qpdf_path: cli.qpdf.clone(),
            ..ToolConfig::default()
        };
        if let Some(secs) = cli.tool_timeout {
            tools.timeout = Duration::from_secs(secs);
        }

        let config = Config { storage, tools };
        config.validate()?;
        Ok(config)
    }
}
