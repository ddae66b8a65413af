//! Running external executables under a wall-clock budget.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

use crate::error::{DocError, Result};

/// Captured result of a finished tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` if terminated by a signal.
    pub code: Option<i32>,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded and trimmed.
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the tool exited with code zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Convert a non-zero exit into [`DocError::ToolFailed`].
    pub fn into_failure(self, tool: &str) -> DocError {
        DocError::ToolFailed {
            tool: tool.to_string(),
            code: self.code,
            stderr: self.stderr,
        }
    }
}

/// Run `program` with `args`, killing it if it outlives `timeout`.
///
/// Arguments are never logged; they may carry passwords.
///
/// # Errors
///
/// - [`DocError::ToolNotFound`] if the program cannot be spawned because it
///   does not exist
/// - [`DocError::ToolTimedOut`] if it runs longer than `timeout`
/// - [`DocError::Io`] for other spawn or pipe failures
///
/// A non-zero exit is not an error here; check [`ToolOutput::success`].
pub async fn run_tool<I, S>(
    tool: &str,
    program: &Path,
    args: I,
    timeout: Duration,
) -> Result<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let start = Instant::now();

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DocError::tool_not_found(tool),
            _ => DocError::Io(e),
        })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| DocError::ToolTimedOut {
            tool: tool.to_string(),
            timeout,
        })??;

    let result = ToolOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };

    debug!(
        tool,
        program = %program.display(),
        code = ?result.code,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Tool finished"
    );

    Ok(result)
}
