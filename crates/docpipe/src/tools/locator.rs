//! Finding external executables.
//!
//! [`locate`] is a pure function of its inputs: a list of candidate paths
//! and a [`ToolProbe`] that answers "is this executable?" and "what does the
//! `PATH` lookup say?". Production code passes [`SystemProbe`]; tests pass a
//! fake and never touch the real filesystem or `PATH`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filesystem and search path queries used while locating a tool.
pub trait ToolProbe: Send + Sync {
    /// Whether `path` names an executable file.
    fn is_executable(&self, path: &Path) -> bool;

    /// Search path lookup.
    fn which(&self, name: &str) -> Option<PathBuf>;
}

/// Probe backed by the real filesystem and `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ToolProbe for SystemProbe {
    fn is_executable(&self, path: &Path) -> bool {
        let Ok(meta) = std::fs::metadata(path) else {
            return false;
        };
        if !meta.is_file() {
            return false;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            meta.permissions().mode() & 0o111 != 0
        }
        #[cfg(not(unix))]
        {
            true
        }
    }

    fn which(&self, name: &str) -> Option<PathBuf> {
        self.which_in(name, std::env::var_os("PATH"))
    }
}

impl SystemProbe {
    /// Search `paths` (a `PATH`-style list) for `name`.
    pub fn which_in(&self, name: &str, paths: Option<OsString>) -> Option<PathBuf> {
        let cwd = std::env::current_dir().ok()?;
        which::which_in(name, paths, cwd)
            .ok()
            .filter(|path| self.is_executable(path))
    }
}

/// Well-known install locations for `name` on this OS family.
pub fn default_candidates(name: &str) -> Vec<PathBuf> {
    if cfg!(windows) {
        let exe = format!("{name}.exe");
        [
            r"C:\Program Files\qpdf\bin",
            r"C:\Program Files (x86)\qpdf\bin",
            r"C:\qpdf\bin",
        ]
        .iter()
        .map(|dir| Path::new(dir).join(&exe))
        .collect()
    } else {
        [
            "/usr/bin",
            "/usr/local/bin",
            "/opt/homebrew/bin",
            "/opt/local/bin",
            "/snap/bin",
        ]
        .iter()
        .map(|dir| Path::new(dir).join(name))
        .collect()
    }
}

/// Resolve `name` to an executable path.
///
/// Candidates are probed in order; the first executable one wins. If none
/// is, the `PATH` lookup decides.
///
/// # Examples
///
/// ```
/// use docpipe::tools::{ToolProbe, locate};
/// use std::path::{Path, PathBuf};
///
/// struct Nothing;
///
/// impl ToolProbe for Nothing {
///     fn is_executable(&self, _: &Path) -> bool { false }
///     fn which(&self, _: &str) -> Option<PathBuf> { None }
/// }
///
/// assert_eq!(locate("qpdf", &[PathBuf::from("/usr/bin/qpdf")], &Nothing), None);
/// ```
pub fn locate(name: &str, candidates: &[PathBuf], probe: &dyn ToolProbe) -> Option<PathBuf> {
    if let Some(found) = candidates.iter().find(|c| probe.is_executable(c)) {
        debug!(tool = name, path = %found.display(), "Found tool at known location");
        return Some(found.clone());
    }

    let found = probe.which(name);
    match &found {
        Some(path) => debug!(tool = name, path = %path.display(), "Found tool on PATH"),
        None => debug!(tool = name, "Tool not found"),
    }
    found
}
