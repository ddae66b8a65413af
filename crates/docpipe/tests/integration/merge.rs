//! Merging end to end.

use docpipe::config::Metadata;
use docpipe::ops::MergePdfs;
use docpipe::pdf::MetadataManager;
use docpipe::{Options, Processor};
use lopdf::Document;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

use crate::common::{
    A4_LANDSCAPE, LETTER, labels, letter_pdf, page_geometry, page_labels, write_pdf,
};

fn files(paths: &[&Path]) -> Options {
    let list: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    Options::new().with("files", json!(list))
}

#[tokio::test]
async fn test_merge_skips_missing_file_and_continues() {
    let dir = TempDir::new().unwrap();
    let a = letter_pdf(&dir, "A.pdf", "a", 2);
    let missing = dir.path().join("missing.pdf");
    let b = letter_pdf(&dir, "B.pdf", "b", 3);
    let output = dir.path().join("merged.pdf");

    let mut processor = Processor::new(MergePdfs::new());
    let ok = processor
        .process("", &output, &files(&[&a, &missing, &b]))
        .await;

    let info = processor.info();
    assert!(ok, "merge failed: {:?}", info.error);
    assert_eq!(info.warnings().len(), 1);
    assert!(info.warnings()[0].contains("missing.pdf"));
    assert_eq!(info.detail_u64("files_count"), Some(3));
    assert_eq!(info.detail_u64("files_merged"), Some(2));
    assert_eq!(info.detail_u64("total_pages"), Some(5));

    let mut expected = labels("a", 2);
    expected.extend(labels("b", 3));
    assert_eq!(page_labels(&output), expected);
}

#[tokio::test]
async fn test_merge_single_file_round_trips() {
    let dir = TempDir::new().unwrap();
    let a = write_pdf(
        &dir.path().join("A.pdf"),
        "a",
        &[LETTER, A4_LANDSCAPE, (300.0, 400.0)],
    );
    let output = dir.path().join("copy.pdf");

    let mut processor = Processor::new(MergePdfs::new());
    assert!(processor.process("", &output, &files(&[&a])).await);

    assert_eq!(page_labels(&output), page_labels(&a));
    assert_eq!(page_geometry(&output), page_geometry(&a));
}

#[tokio::test]
async fn test_merge_with_no_files_fails() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("merged.pdf");

    let mut processor = Processor::new(MergePdfs::new());
    assert!(!processor.process("", &output, &Options::new()).await);
    assert_eq!(
        processor.info().error.as_deref(),
        Some("No input files specified")
    );
}

#[tokio::test]
async fn test_merge_with_only_unusable_files_fails() {
    let dir = TempDir::new().unwrap();
    let garbage = dir.path().join("garbage.pdf");
    std::fs::write(&garbage, b"not a pdf").unwrap();
    let output = dir.path().join("merged.pdf");

    let mut processor = Processor::new(MergePdfs::new());
    let ok = processor
        .process("", &output, &files(&[&garbage, &dir.path().join("gone.pdf")]))
        .await;

    assert!(!ok);
    assert_eq!(processor.info().details["error_kind"], "empty_result");
    assert!(!output.exists());
}

#[tokio::test]
async fn test_merge_applies_metadata() {
    let dir = TempDir::new().unwrap();
    let a = letter_pdf(&dir, "A.pdf", "a", 1);
    let output = dir.path().join("merged.pdf");

    let options = files(&[&a]).with(
        "metadata",
        json!({ "title": "Quarterly Report", "author": "Finance" }),
    );
    let mut processor = Processor::new(MergePdfs::new());
    assert!(processor.process("", &output, &options).await);

    let doc = Document::load(&output).unwrap();
    let metadata = MetadataManager::new().get_metadata(&doc);
    assert_eq!(
        metadata,
        Metadata::new(
            Some("Quarterly Report".to_string()),
            Some("Finance".to_string()),
            None,
            None
        )
    );
}

#[tokio::test]
async fn test_merge_rejects_unknown_quality() {
    let dir = TempDir::new().unwrap();
    let a = letter_pdf(&dir, "A.pdf", "a", 1);

    let mut processor = Processor::new(MergePdfs::new());
    let ok = processor
        .process(
            "",
            dir.path().join("merged.pdf"),
            &files(&[&a]).with("quality", "ultra"),
        )
        .await;

    assert!(!ok);
    assert_eq!(processor.info().details["error_kind"], "invalid_input");
}
