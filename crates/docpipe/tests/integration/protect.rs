//! Password protection against stand-in `qpdf` scripts.

use docpipe::config::ToolConfig;
use docpipe::ops::ProtectPdf;
use docpipe::{Options, Processor};
use serde_json::json;
use serial_test::serial;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use crate::common::letter_pdf;

#[cfg(unix)]
fn fake_qpdf(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("qpdf");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A qpdf that records its arguments and writes the last one.
#[cfg(unix)]
fn recording_qpdf(dir: &Path) -> (PathBuf, PathBuf) {
    let args = dir.join("args.txt");
    let body = format!(
        "printf '%s\\n' \"$@\" > '{}'\nfor arg; do out=\"$arg\"; done\nprintf 'encrypted' > \"$out\"",
        args.display()
    );
    (fake_qpdf(dir, &body), args)
}

fn protect_with(tool: Option<PathBuf>, timeout: Duration) -> Processor<ProtectPdf> {
    Processor::new(ProtectPdf::with_tool(tool, timeout))
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_protect_requires_a_password_before_running_qpdf() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "in.pdf", "p", 1);
    let (tool, args) = recording_qpdf(dir.path());

    let mut processor = protect_with(Some(tool), Duration::from_secs(5));
    let options = Options::new()
        .with("user_password", "")
        .with("owner_password", "");
    let ok = processor
        .process(&input, dir.path().join("out.pdf"), &options)
        .await;

    assert!(!ok);
    assert_eq!(
        processor.info().error.as_deref(),
        Some("At least one of user_password or owner_password is required")
    );
    assert!(!args.exists(), "qpdf must not be invoked");
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_protect_passes_passwords_and_restrictions() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "in.pdf", "p", 1);
    let output = dir.path().join("locked/out.pdf");
    let (tool, args) = recording_qpdf(dir.path());

    let options = Options::new()
        .with("user_password", "reader")
        .with("owner_password", "admin")
        .with("key_length", 256)
        .with("restrictions", json!(["no-copy", "no-print"]));

    let mut processor = protect_with(Some(tool), Duration::from_secs(5));
    let ok = processor.process(&input, &output, &options).await;

    let info = processor.info();
    assert!(ok, "protect failed: {:?}", info.error);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "encrypted");
    assert_eq!(info.details["key_length"], 256);
    assert_eq!(info.details["restrictions"], json!(["no-print", "no-copy"]));
    assert_eq!(info.details["owner_password_set"], true);

    let recorded = std::fs::read_to_string(&args).unwrap();
    let recorded: Vec<&str> = recorded.lines().collect();
    assert_eq!(
        &recorded[..8],
        &[
            "--encrypt",
            "reader",
            "admin",
            "256",
            "--print=none",
            "--modify=none",
            "--extract=n",
            "--",
        ]
    );
    assert_eq!(recorded[8], input.display().to_string());
    assert!(recorded[9].ends_with(".part"));
    assert!(!Path::new(recorded[9]).exists(), "staging file must be renamed");
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_protect_reports_qpdf_failure() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "in.pdf", "p", 1);
    let output = dir.path().join("out.pdf");
    let tool = fake_qpdf(dir.path(), "echo 'invalid password' >&2\nexit 2");

    let mut processor = protect_with(Some(tool), Duration::from_secs(5));
    let ok = processor
        .process(&input, &output, &Options::new().with("user_password", "x"))
        .await;

    assert!(!ok);
    let info = processor.info();
    assert_eq!(info.details["error_kind"], "external_tool");
    assert_eq!(
        info.error.as_deref(),
        Some("qpdf failed (exit code 2): invalid password")
    );
    assert!(!output.exists());
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_protect_accepts_qpdf_warnings() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "in.pdf", "p", 1);
    let output = dir.path().join("out.pdf");
    let tool = fake_qpdf(
        dir.path(),
        "for arg; do out=\"$arg\"; done\nprintf 'encrypted' > \"$out\"\necho 'damaged xref' >&2\nexit 3",
    );

    let mut processor = protect_with(Some(tool), Duration::from_secs(5));
    let ok = processor
        .process(&input, &output, &Options::new().with("owner_password", "x"))
        .await;

    assert!(ok, "protect failed: {:?}", processor.info().error);
    assert_eq!(
        processor.info().warnings(),
        vec!["qpdf reported warnings: damaged xref"]
    );
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_protect_times_out() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "in.pdf", "p", 1);
    let output = dir.path().join("out.pdf");
    let tool = fake_qpdf(dir.path(), "sleep 30");

    let mut processor = protect_with(Some(tool), Duration::from_millis(300));
    let ok = processor
        .process(&input, &output, &Options::new().with("user_password", "x"))
        .await;

    assert!(!ok);
    assert_eq!(processor.info().details["error_kind"], "external_tool");
    assert!(
        processor
            .info()
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("qpdf timed out"))
    );
}

#[tokio::test]
async fn test_protect_without_qpdf_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "in.pdf", "p", 1);

    let mut processor = protect_with(None, Duration::from_secs(5));
    let ok = processor
        .process(
            &input,
            dir.path().join("out.pdf"),
            &Options::new().with("user_password", "x"),
        )
        .await;

    assert!(!ok);
    assert!(
        processor
            .info()
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("Required tool not found: qpdf"))
    );
}

#[cfg(unix)]
#[test]
#[serial]
fn test_configured_qpdf_path_is_used() {
    let dir = TempDir::new().unwrap();
    let (tool, _) = recording_qpdf(dir.path());

    let config = ToolConfig {
        qpdf_path: Some(tool.clone()),
        ..ToolConfig::default()
    };
    assert_eq!(ProtectPdf::new(&config).tool_path(), Some(tool.as_path()));
}
