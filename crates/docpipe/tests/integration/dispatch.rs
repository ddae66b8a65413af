//! Dispatch by operation name and the result record.

use docpipe::config::ToolConfig;
use docpipe::{AnyOperation, Config, OperationKind, Options, ProcessingRecord, Processor};
use std::time::Duration;
use tempfile::TempDir;

use crate::common::{letter_pdf, page_labels};

fn config_without_qpdf() -> Config {
    Config {
        tools: ToolConfig {
            qpdf_path: None,
            timeout: Duration::from_secs(5),
        },
        ..Config::default()
    }
}

#[test]
fn test_every_kind_builds_its_operation() {
    let config = config_without_qpdf();
    for kind in OperationKind::ALL {
        let operation = AnyOperation::new(kind, &config);
        assert_eq!(docpipe::Operation::kind(&operation), kind);
    }
}

#[tokio::test]
async fn test_dispatch_by_name() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "in.pdf", "p", 4);
    let output = dir.path().join("out.pdf");

    let kind: OperationKind = "EXTRACT".parse().unwrap();
    let mut processor = Processor::new(AnyOperation::new(kind, &config_without_qpdf()));
    assert!(
        processor
            .process(&input, &output, &Options::new().with("pages", "4,1"))
            .await
    );
    assert_eq!(page_labels(&output), vec!["p-1", "p-4"]);
}

#[tokio::test]
async fn test_failed_run_serializes_with_error_and_trace() {
    let dir = TempDir::new().unwrap();
    let mut processor = Processor::new(AnyOperation::new(
        OperationKind::Remove,
        &config_without_qpdf(),
    ));
    processor
        .process(
            dir.path().join("absent.pdf"),
            dir.path().join("out.pdf"),
            &Options::new().with("pages", "1"),
        )
        .await;

    let record = ProcessingRecord::new(
        OperationKind::Remove.as_str(),
        dir.path().join("absent.pdf"),
        dir.path().join("out.pdf"),
        processor.into_info(),
    );
    let value = serde_json::to_value(&record).unwrap();

    assert_eq!(value["operation"], "remove");
    assert_eq!(value["success"], false);
    assert!(value["error"].as_str().unwrap().starts_with("File not found"));
    assert_eq!(value["trace"], "kind: invalid_input");
    assert!(value["recorded_at"].is_u64());
}

#[tokio::test]
async fn test_successful_run_omits_error_fields() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "in.pdf", "p", 2);

    let mut processor = Processor::new(AnyOperation::new(
        OperationKind::Remove,
        &config_without_qpdf(),
    ));
    assert!(
        processor
            .process(&input, dir.path().join("out.pdf"), &Options::new().with("pages", "2"))
            .await
    );

    let value = serde_json::to_value(processor.info()).unwrap();
    assert_eq!(value["success"], true);
    assert!(value.get("error").is_none());
    assert!(value.get("trace").is_none());
    assert_eq!(value["details"]["pages"], serde_json::json!([1]));
}
