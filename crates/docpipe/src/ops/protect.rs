//! Password protection through `qpdf`.
//!
//! This is the one operation that leaves the process. The `qpdf` path is
//! resolved once, when the operation is built; `execute` fails with
//! [`DocError::ToolNotFound`] if it was not found instead of trying to run
//! anything. qpdf writes to a hidden staging file next to the output, which
//! is renamed into place only after a clean exit.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ToolConfig;
use crate::error::{DocError, Result};
use crate::operation::{Operation, OperationKind, OperationRequest, Outcome};
use crate::storage::random_token;
use crate::tools::{QPDF, SystemProbe, ToolProbe, default_candidates, locate, run_tool};
use crate::utils::{check_file_exists, ensure_parent_dir, file_size, staging_path};

/// Supported encryption key lengths in bits.
pub const KEY_LENGTHS: [i64; 3] = [40, 128, 256];

/// Key length used when `key_length` is not given.
pub const DEFAULT_KEY_LENGTH: i64 = 128;

/// qpdf exit status for "succeeded, but with warnings".
const QPDF_EXIT_WARNINGS: i32 = 3;

/// A permission withheld from readers who only know the user password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Restriction {
    /// Disallow printing.
    NoPrint,
    /// Disallow copying text and images.
    NoCopy,
    /// Disallow modification.
    NoModify,
}

impl Restriction {
    /// Option value naming this restriction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoPrint => "no-print",
            Self::NoCopy => "no-copy",
            Self::NoModify => "no-modify",
        }
    }

    /// qpdf flags for this restriction. 40-bit keys take the older `y|n`
    /// permission syntax.
    pub fn qpdf_args(&self, key_length: i64) -> &'static [&'static str] {
        let legacy = key_length == 40;
        match (self, legacy) {
            (Self::NoPrint, false) => &["--print=none"],
            (Self::NoPrint, true) => &["--print=n"],
            (Self::NoCopy, false) => &["--modify=none", "--extract=n"],
            (Self::NoCopy, true) => &["--modify=n", "--extract=n"],
            (Self::NoModify, false) => &["--modify=none"],
            (Self::NoModify, true) => &["--modify=n"],
        }
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Restriction {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "no-print" => Ok(Self::NoPrint),
            "no-copy" => Ok(Self::NoCopy),
            "no-modify" => Ok(Self::NoModify),
            _ => Err(DocError::invalid_option(
                "restrictions",
                format!("{s}. Must be one of: no-print, no-copy, no-modify"),
            )),
        }
    }
}

/// Encrypt a PDF with a user and/or owner password.
///
/// Options: `user_password`, `owner_password` (at least one required),
/// `key_length` (40, 128 or 256; default 128), `restrictions` (any of
/// `no-print`, `no-copy`, `no-modify`).
#[derive(Debug, Clone)]
pub struct ProtectPdf {
    tool: Option<PathBuf>,
    timeout: Duration,
}

impl ProtectPdf {
    /// Resolve `qpdf` on this system.
    ///
    /// A configured `qpdf_path` is probed before the well-known locations.
    pub fn new(config: &ToolConfig) -> Self {
        Self::with_probe(config, &SystemProbe)
    }

    /// Resolve `qpdf` through a custom probe.
    pub fn with_probe(config: &ToolConfig, probe: &dyn ToolProbe) -> Self {
        let candidates: Vec<PathBuf> = config
            .qpdf_path
            .iter()
            .cloned()
            .chain(default_candidates(QPDF))
            .collect();

        let tool = locate(QPDF, &candidates, probe);
        if tool.is_none() {
            warn!("qpdf not found; password protection is unavailable");
        }

        Self {
            tool,
            timeout: config.timeout,
        }
    }

    /// Use an already resolved tool path (or none).
    pub fn with_tool(tool: Option<PathBuf>, timeout: Duration) -> Self {
        Self { tool, timeout }
    }

    /// The resolved tool, if any.
    pub fn tool_path(&self) -> Option<&Path> {
        self.tool.as_deref()
    }
}

/// Validated protection settings.
struct Protection {
    user: Option<String>,
    owner: Option<String>,
    key_length: i64,
    restrictions: Vec<Restriction>,
    warnings: Vec<String>,
}

impl Protection {
    fn from_options(options: &crate::options::Options) -> Result<Self> {
        let user = options.string("user_password");
        let owner = options.string("owner_password");
        if user.is_none() && owner.is_none() {
            return Err(DocError::PasswordRequired);
        }

        let key_length = options.integer("key_length")?.unwrap_or(DEFAULT_KEY_LENGTH);
        if !KEY_LENGTHS.contains(&key_length) {
            return Err(DocError::invalid_option(
                "key_length",
                format!("{key_length}. Must be one of: 40, 128, 256"),
            ));
        }

        let mut restrictions = Vec::new();
        let mut warnings = Vec::new();
        for token in options.token_set("restrictions") {
            match token.parse::<Restriction>() {
                Ok(restriction) => restrictions.push(restriction),
                Err(_) => warnings.push(format!("Ignored unknown restriction '{token}'")),
            }
        }
        restrictions.sort();
        restrictions.dedup();

        Ok(Self {
            user,
            owner,
            key_length,
            restrictions,
            warnings,
        })
    }

    /// `--encrypt user owner bits [flags...] -- input output`
    fn qpdf_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let user = self.user.clone().unwrap_or_default();
        let owner = self.owner.clone().unwrap_or_else(|| user.clone());

        let mut args: Vec<OsString> = vec![
            "--encrypt".into(),
            user.into(),
            owner.into(),
            self.key_length.to_string().into(),
        ];
        for restriction in &self.restrictions {
            args.extend(restriction.qpdf_args(self.key_length).iter().map(OsString::from));
        }
        args.push("--".into());
        args.push(input.into());
        args.push(output.into());
        args
    }
}

impl Operation for ProtectPdf {
    fn kind(&self) -> OperationKind {
        OperationKind::Protect
    }

    async fn execute(&self, request: &OperationRequest<'_>) -> Result<Outcome> {
        let mut protection = Protection::from_options(request.options)?;
        check_file_exists(request.input).await?;

        let tool = self
            .tool
            .as_deref()
            .ok_or_else(|| DocError::tool_not_found(QPDF))?;

        ensure_parent_dir(request.output).await?;
        let staged = staging_path(request.output, &random_token(8));
        let args = protection.qpdf_args(request.input, &staged);

        debug!(
            tool = %tool.display(),
            key_length = protection.key_length,
            restrictions = protection.restrictions.len(),
            "Encrypting"
        );

        let result = run_encrypt(tool, args, self.timeout, &staged, request.output).await;
        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let _ = tokio::fs::remove_file(&staged).await;
                return Err(err);
            }
        };
        if output.code == Some(QPDF_EXIT_WARNINGS) && !output.stderr.is_empty() {
            protection
                .warnings
                .push(format!("qpdf reported warnings: {}", output.stderr));
        }

        let output_size = file_size(request.output).await;
        let restrictions: Vec<&str> = protection.restrictions.iter().map(|r| r.as_str()).collect();

        Ok(Outcome::new(format!(
            "Protected PDF with {}-bit encryption",
            protection.key_length
        ))
        .detail("user_password_set", protection.user.is_some())
        .detail("owner_password_set", protection.owner.is_some())
        .detail("key_length", protection.key_length)
        .detail("restrictions", restrictions)
        .detail("output_size", output_size)
        .warnings(protection.warnings))
    }
}

/// Run qpdf into `staged` and move the result to `output`.
async fn run_encrypt(
    tool: &Path,
    args: Vec<OsString>,
    timeout: Duration,
    staged: &Path,
    output: &Path,
) -> Result<crate::tools::ToolOutput> {
    let result = run_tool(QPDF, tool, args, timeout).await?;

    let accepted = result.success() || result.code == Some(QPDF_EXIT_WARNINGS);
    if !accepted {
        return Err(result.into_failure(QPDF));
    }
    if file_size(staged).await == 0 {
        return Err(DocError::OutputMissing {
            path: output.to_path_buf(),
        });
    }

    tokio::fs::rename(staged, output)
        .await
        .map_err(|e| DocError::FailedToWrite {
            path: output.to_path_buf(),
            source: e,
        })?;
    Ok(result)
}
