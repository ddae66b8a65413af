//! Operation results.
//!
//! [`OperationResult`] is what an operation reports after `process`. It
//! serializes to `{success, message, details, error?, trace?}` and is meant
//! to be stored verbatim by whoever keeps the processing history, which is
//! what [`ProcessingRecord`] is for.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error as _;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{DocError, exit_code_for};

/// Key under which skipped inputs and pages are reported.
pub const WARNINGS_KEY: &str = "warnings";

/// Outcome of the last `process` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Whether an output was produced.
    pub success: bool,

    /// Human-readable summary.
    pub message: String,

    /// Operation-specific facts (counts, sizes, warnings).
    #[serde(default)]
    pub details: Map<String, Value>,

    /// Failure description. Always set when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Diagnostic context for failures: error kind and cause chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl OperationResult {
    /// Result of an operation that has not run yet.
    pub fn not_run() -> Self {
        Self {
            success: false,
            message: "Operation has not been run".to_string(),
            details: Map::new(),
            error: Some("not run".to_string()),
            trace: None,
        }
    }

    /// Successful result. `warnings` are folded into `details` when present.
    pub fn succeeded(
        message: impl Into<String>,
        mut details: Map<String, Value>,
        warnings: Vec<String>,
    ) -> Self {
        if !warnings.is_empty() {
            details.insert(WARNINGS_KEY.to_string(), Value::from(warnings));
        }

        Self {
            success: true,
            message: message.into(),
            details,
            error: None,
            trace: None,
        }
    }

    /// Failed result built from a library error.
    pub fn failed(err: &DocError) -> Self {
        let mut trace = format!("kind: {}", err.kind());
        let mut source = err.source();
        while let Some(cause) = source {
            trace.push_str("\ncaused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }

        let mut details = Map::new();
        details.insert("error_kind".to_string(), Value::from(err.kind()));

        Self {
            success: false,
            message: format!("Operation failed: {err}"),
            details,
            error: Some(err.to_string()),
            trace: Some(trace),
        }
    }

    /// Failed result for a panic caught at the operation boundary.
    pub fn panicked(message: &str) -> Self {
        let mut details = Map::new();
        details.insert("error_kind".to_string(), Value::from("internal"));

        Self {
            success: false,
            message: "Operation failed: internal error".to_string(),
            details,
            error: Some(format!("internal error: {message}")),
            trace: Some("kind: panic".to_string()),
        }
    }

    /// Warnings recorded in `details`, if any.
    pub fn warnings(&self) -> Vec<&str> {
        match self.details.get(WARNINGS_KEY) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Process exit code for this result: 0 on success, otherwise derived
    /// from `details.error_kind`.
    pub fn exit_code(&self) -> i32 {
        if self.success {
            return 0;
        }
        self.details
            .get("error_kind")
            .and_then(Value::as_str)
            .map_or(1, exit_code_for)
    }

    /// Shorthand for reading a numeric detail.
    pub fn detail_u64(&self, key: &str) -> Option<u64> {
        self.details.get(key).and_then(Value::as_u64)
    }
}

impl Default for OperationResult {
    fn default() -> Self {
        Self::not_run()
    }
}

/// One entry of the processing history.
///
/// The library never persists these; callers append them wherever they keep
/// history (the CLI writes JSON lines).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    /// Operation name, e.g. `extract`.
    pub operation: String,

    /// Primary input path.
    pub input: PathBuf,

    /// Output path.
    pub output: PathBuf,

    /// The result, flattened into the record.
    #[serde(flatten)]
    pub result: OperationResult,

    /// Seconds since the Unix epoch.
    pub recorded_at: u64,
}

impl ProcessingRecord {
    /// Record `result` as of now.
    pub fn new(
        operation: impl Into<String>,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        result: OperationResult,
    ) -> Self {
        let recorded_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Self {
            operation: operation.into(),
            input: input.into(),
            output: output.into(),
            result,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;

    #[test]
    fn test_succeeded_omits_empty_warnings() {
        let result = OperationResult::succeeded("done", Map::new(), Vec::new());
        assert!(result.success);
        assert!(!result.details.contains_key(WARNINGS_KEY));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, json!({"success": true, "message": "done", "details": {}}));
    }

    #[test]
    fn test_succeeded_records_warnings() {
        let result = OperationResult::succeeded(
            "done",
            Map::new(),
            vec!["Page 15 is out of range (1-10)".to_string()],
        );
        assert_eq!(result.warnings(), vec!["Page 15 is out of range (1-10)"]);
    }

    #[test]
    fn test_failed_carries_error_and_trace() {
        let err = DocError::FailedToWrite {
            path: PathBuf::from("out.pdf"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let result = OperationResult::failed(&err);

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("out.pdf"));
        let trace = result.trace.unwrap();
        assert!(trace.contains("kind: io"));
        assert!(trace.contains("caused by: denied"));
        assert_eq!(result.details["error_kind"], json!("io"));
    }

    #[test]
    fn test_exit_code_follows_error_kind() {
        let ok = OperationResult::succeeded("done", Map::new(), Vec::new());
        assert_eq!(ok.exit_code(), 0);

        let empty = OperationResult::failed(&DocError::NoFilesToMerge);
        assert_eq!(empty.exit_code(), DocError::NoFilesToMerge.exit_code());
        assert_eq!(OperationResult::panicked("boom").exit_code(), 1);
    }

    #[test]
    fn test_not_run_is_a_failure() {
        let result = OperationResult::default();
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_record_flattens_result() {
        let result = OperationResult::succeeded("Merged 2 files", Map::new(), Vec::new());
        let record = ProcessingRecord::new("merge", "a.pdf", "out.pdf", result);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["operation"], json!("merge"));
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["message"], json!("Merged 2 files"));
        assert!(value["recorded_at"].as_u64().unwrap() > 0);

        let back: ProcessingRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
