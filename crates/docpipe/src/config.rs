//! Configuration for docpipe.
//!
//! [`Config`] bundles the settings that outlive a single operation call:
//! where staged files live and for how long ([`StorageConfig`]) and how the
//! external encryption tool is found and bounded ([`ToolConfig`]).
//! Per-call settings travel in [`Options`](crate::options::Options) instead.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{DocError, Result};

/// Default lifetime of staged files, in minutes.
pub const DEFAULT_LIFETIME_MINUTES: u64 = 60;

/// Default wall-clock budget for external tool invocations.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Compression level for written PDFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// No compression - streams are written as they are.
    None,
    /// Compress streams and renumber objects.
    #[default]
    Standard,
    /// Additionally prune unreferenced objects.
    Maximum,
}

impl CompressionLevel {
    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Standard => "standard",
            Self::Maximum => "maximum",
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "standard" => Ok(Self::Standard),
            "maximum" => Ok(Self::Maximum),
            _ => Err(DocError::invalid_option(
                "quality",
                format!("{s}. Must be one of: none, standard, maximum"),
            )),
        }
    }
}

/// PDF metadata to set on an output document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title.
    pub title: Option<String>,
    /// Document author.
    pub author: Option<String>,
    /// Document subject.
    pub subject: Option<String>,
    /// Document keywords (comma-separated).
    pub keywords: Option<String>,
}

impl Metadata {
    /// Check if any metadata fields are set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
    }

    /// Create metadata from optional strings, trimming whitespace.
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    ) -> Self {
        let to_string_opt = |opt: Option<String>| {
            opt.filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
        };

        Self {
            title: to_string_opt(title),
            author: to_string_opt(author),
            subject: to_string_opt(subject),
            keywords: to_string_opt(keywords),
        }
    }
}

/// Staging directory settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding staged files. Created if missing.
    pub base_dir: PathBuf,

    /// Root directory served publicly.
    pub public_root: PathBuf,

    /// Subdirectory of `public_root` that receives published PDFs.
    pub public_subdir: String,

    /// URL prefix under which `public_root` is served.
    pub public_url_prefix: String,

    /// Age after which the sweep reclaims a staged file.
    pub lifetime: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: std::env::temp_dir().join("docpipe"),
            public_root: PathBuf::from("public"),
            public_subdir: "pdfs".to_string(),
            public_url_prefix: "/storage".to_string(),
            lifetime: Duration::from_secs(DEFAULT_LIFETIME_MINUTES * 60),
        }
    }
}

impl StorageConfig {
    /// Storage rooted at `base_dir`, defaults elsewhere.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Set the public root directory.
    pub fn public_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.public_root = root.into();
        self
    }

    /// Set the staged file lifetime.
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the staged file lifetime in minutes.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::InvalidConfig`] if `minutes` does not fit in a
    /// [`Duration`] of seconds.
    pub fn lifetime_minutes(self, minutes: u64) -> Result<Self> {
        Ok(self.lifetime(from_minutes(minutes)?))
    }
}

/// Convert a minute count to a [`Duration`].
///
/// # Errors
///
/// Returns [`DocError::InvalidConfig`] if the count overflows.
pub fn from_minutes(minutes: u64) -> Result<Duration> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| DocError::invalid_config(format!("{minutes} minutes is too long")))
}

/// External tool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Explicit path to the `qpdf` executable. Probed before the defaults.
    pub qpdf_path: Option<PathBuf>,

    /// Wall-clock budget for one tool invocation.
    pub timeout: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            qpdf_path: None,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

/// Complete library configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Staging directory settings.
    pub storage: StorageConfig,

    /// External tool settings.
    pub tools: ToolConfig,
}

impl Config {
    /// Build a configuration from `DOCPIPE_*` environment variables,
    /// falling back to defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse or the
    /// resulting configuration fails [`Config::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("DOCPIPE_TEMP_DIR") {
            config.storage.base_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DOCPIPE_PUBLIC_DIR") {
            config.storage.public_root = PathBuf::from(dir);
        }
        if let Some(prefix) = lookup("DOCPIPE_PUBLIC_URL") {
            config.storage.public_url_prefix = prefix;
        }
        if let Some(minutes) = lookup("DOCPIPE_TEMP_LIFETIME") {
            let minutes: u64 = minutes.trim().parse().map_err(|_| {
                DocError::invalid_config(format!("DOCPIPE_TEMP_LIFETIME is not a number: {minutes}"))
            })?;
            config.storage.lifetime = from_minutes(minutes)?;
        }
        if let Some(path) = lookup("DOCPIPE_QPDF_PATH") {
            config.tools.qpdf_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = lookup("DOCPIPE_TOOL_TIMEOUT") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                DocError::invalid_config(format!("DOCPIPE_TOOL_TIMEOUT is not a number: {secs}"))
            })?;
            config.tools.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The staging directory path is empty
    /// - The lifetime or the tool timeout is zero
    /// - The public subdirectory escapes the public root
    pub fn validate(&self) -> Result<()> {
        if self.storage.base_dir.as_os_str().is_empty() {
            return Err(DocError::invalid_config("Staging directory cannot be empty"));
        }

        if self.storage.lifetime.is_zero() {
            return Err(DocError::invalid_config(
                "Staged file lifetime must be at least one minute",
            ));
        }

        if self.tools.timeout.is_zero() {
            return Err(DocError::invalid_config("Tool timeout must be positive"));
        }

        let subdir = &self.storage.public_subdir;
        if subdir.is_empty() || subdir.contains("..") || subdir.starts_with('/') {
            return Err(DocError::invalid_config(format!(
                "Invalid public subdirectory: {subdir}"
            )));
        }

        Ok(())
    }
}
