//! Extraction and removal end to end.

use docpipe::ops::{ExtractPages, RemovePages};
use docpipe::pdf::{Orientation, PageSet};
use docpipe::{Options, Processor};
use tempfile::TempDir;

use crate::common::{A4_LANDSCAPE, LETTER, letter_pdf, page_geometry, page_labels, write_pdf};

#[test]
fn test_page_parsing_is_sorted_and_deduplicated() {
    assert_eq!(
        PageSet::parse("1,3-5,7,10-12").pages(),
        vec![1, 3, 4, 5, 7, 10, 11, 12]
    );
    assert_eq!(PageSet::parse("5,3,5,1-2").pages(), vec![1, 2, 3, 5]);
}

#[test]
fn test_malformed_tokens_are_reported_not_dropped_silently() {
    let set = PageSet::parse("1,abc,3");
    assert_eq!(set.pages(), vec![1, 3]);

    let selection = set.select(5);
    assert_eq!(selection.valid, vec![1, 3]);
    assert_eq!(selection.warnings, vec!["Ignored malformed page token 'abc'"]);
}

#[tokio::test]
async fn test_extract_keeps_valid_pages_and_warns_about_the_rest() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "ten.pdf", "p", 10);
    let output = dir.path().join("out/extract.pdf");

    let mut processor = Processor::new(ExtractPages::new());
    let ok = processor
        .process(&input, &output, &Options::new().with("pages", "2,15"))
        .await;

    let info = processor.info();
    assert!(ok, "extract failed: {:?}", info.error);
    assert_eq!(page_labels(&output), vec!["p-2"]);
    assert_eq!(info.detail_u64("pages_extracted"), Some(1));
    assert_eq!(info.detail_u64("total_pages"), Some(10));
    assert_eq!(info.warnings(), vec!["Page 15 is out of range (1-10)"]);
}

#[tokio::test]
async fn test_extract_fails_when_nothing_is_in_range() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "ten.pdf", "p", 10);
    let output = dir.path().join("extract.pdf");

    let mut processor = Processor::new(ExtractPages::new());
    let ok = processor
        .process(&input, &output, &Options::new().with("pages", "20-25"))
        .await;

    assert!(!ok);
    let info = processor.info();
    assert_eq!(info.details["error_kind"], "empty_result");
    assert!(info.message.starts_with("Operation failed:"));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_extract_orders_pages_ascending() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "five.pdf", "p", 5);
    let output = dir.path().join("extract.pdf");

    let mut processor = Processor::new(ExtractPages::new());
    assert!(
        processor
            .process(&input, &output, &Options::new().with("pages", "5,1,3-2"))
            .await
    );
    assert_eq!(page_labels(&output), vec!["p-1", "p-2", "p-3", "p-5"]);
}

#[tokio::test]
async fn test_extract_requires_pages_option() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "one.pdf", "p", 1);

    let mut processor = Processor::new(ExtractPages::new());
    assert!(
        !processor
            .process(&input, dir.path().join("out.pdf"), &Options::new())
            .await
    );
    assert_eq!(
        processor.info().error.as_deref(),
        Some("Missing required option: pages")
    );
}

#[tokio::test]
async fn test_extract_from_missing_input_fails() {
    let dir = TempDir::new().unwrap();

    let mut processor = Processor::new(ExtractPages::new());
    let ok = processor
        .process(
            dir.path().join("nope.pdf"),
            dir.path().join("out.pdf"),
            &Options::new().with("pages", "1"),
        )
        .await;

    assert!(!ok);
    assert_eq!(processor.info().details["error_kind"], "invalid_input");
}

#[tokio::test]
async fn test_remove_refuses_to_empty_the_document() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "three.pdf", "p", 3);
    let output = dir.path().join("removed.pdf");

    let mut processor = Processor::new(RemovePages::new());
    let ok = processor
        .process(&input, &output, &Options::new().with("pages", "1,2,3"))
        .await;

    assert!(!ok);
    assert_eq!(
        processor.info().error.as_deref(),
        Some("Cannot remove 3 page(s) from a document with 3 page(s)")
    );
    assert!(!output.exists());
}

#[tokio::test]
async fn test_remove_keeps_remaining_pages_in_order() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "three.pdf", "p", 3);
    let output = dir.path().join("removed.pdf");

    let mut processor = Processor::new(RemovePages::new());
    let ok = processor
        .process(&input, &output, &Options::new().with("pages", "2"))
        .await;

    assert!(ok, "remove failed: {:?}", processor.info().error);
    assert_eq!(page_labels(&output), vec!["p-1", "p-3"]);
    assert_eq!(processor.info().detail_u64("pages_kept"), Some(2));
}

#[tokio::test]
async fn test_remove_with_out_of_range_pages_warns() {
    let dir = TempDir::new().unwrap();
    let input = letter_pdf(&dir, "three.pdf", "p", 3);
    let output = dir.path().join("removed.pdf");

    let mut processor = Processor::new(RemovePages::new());
    assert!(
        processor
            .process(&input, &output, &Options::new().with("pages", "1,7-9"))
            .await
    );
    assert_eq!(page_labels(&output), vec!["p-2", "p-3"]);
    assert_eq!(
        processor.info().warnings(),
        vec!["Pages 7-9 are out of range (1-3)"]
    );
}

#[tokio::test]
async fn test_page_geometry_survives_extraction() {
    let dir = TempDir::new().unwrap();
    let input = write_pdf(
        &dir.path().join("mixed.pdf"),
        "m",
        &[LETTER, A4_LANDSCAPE, LETTER],
    );
    let output = dir.path().join("landscape.pdf");

    let mut processor = Processor::new(ExtractPages::new());
    assert!(
        processor
            .process(&input, &output, &Options::new().with("pages", "2"))
            .await
    );

    let geometry = page_geometry(&output);
    assert_eq!(geometry.len(), 1);
    assert_eq!(geometry[0].orientation, Orientation::Landscape);
    assert_eq!(geometry[0].width, 842.0);
}
