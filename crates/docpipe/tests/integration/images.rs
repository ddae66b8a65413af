//! Images to PDF end to end.

use docpipe::ops::ImagesToPdf;
use docpipe::pdf::Orientation;
use docpipe::{Options, Processor};
use serde_json::json;
use tempfile::TempDir;

use crate::common::{page_geometry, write_png};

#[tokio::test]
async fn test_each_image_becomes_a_page() {
    let dir = TempDir::new().unwrap();
    let wide = write_png(&dir.path().join("wide.png"), 300, 150);
    let tall = write_png(&dir.path().join("tall.png"), 150, 300);
    let output = dir.path().join("album.pdf");

    let options = Options::new().with(
        "files",
        json!([wide.display().to_string(), tall.display().to_string()]),
    );
    let mut processor = Processor::new(ImagesToPdf::new());
    let ok = processor.process("", &output, &options).await;

    assert!(ok, "conversion failed: {:?}", processor.info().error);
    assert_eq!(processor.info().detail_u64("pages"), Some(2));

    let geometry = page_geometry(&output);
    assert_eq!(geometry.len(), 2);
    assert_eq!(geometry[0].orientation, Orientation::Landscape);
    assert_eq!(geometry[1].orientation, Orientation::Portrait);
    assert!((geometry[0].width - 144.0).abs() < 0.5);
}

#[tokio::test]
async fn test_primary_input_is_used_without_files() {
    let dir = TempDir::new().unwrap();
    let image = write_png(&dir.path().join("photo.png"), 40, 40);
    let output = dir.path().join("photo.pdf");

    let mut processor = Processor::new(ImagesToPdf::new());
    let options = Options::new().with("page_size", "letter");
    assert!(processor.process(&image, &output, &options).await);

    let geometry = page_geometry(&output);
    assert_eq!(geometry.len(), 1);
    assert_eq!((geometry[0].width, geometry[0].height), (612.0, 792.0));
}

#[tokio::test]
async fn test_undecodable_images_are_skipped() {
    let dir = TempDir::new().unwrap();
    let good = write_png(&dir.path().join("good.png"), 20, 20);
    let bad = dir.path().join("bad.png");
    std::fs::write(&bad, b"not an image").unwrap();
    let output = dir.path().join("out.pdf");

    let options = Options::new().with(
        "files",
        json!([bad.display().to_string(), good.display().to_string()]),
    );
    let mut processor = Processor::new(ImagesToPdf::new());
    assert!(processor.process("", &output, &options).await);

    let info = processor.info();
    assert_eq!(info.detail_u64("pages"), Some(1));
    assert_eq!(info.warnings().len(), 1);
    assert!(info.warnings()[0].contains("bad.png"));
}

#[tokio::test]
async fn test_no_usable_images_fails() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.jpg");
    std::fs::write(&bad, b"nope").unwrap();

    let mut processor = Processor::new(ImagesToPdf::new());
    let ok = processor
        .process(&bad, dir.path().join("out.pdf"), &Options::new())
        .await;

    assert!(!ok);
    assert_eq!(processor.info().details["error_kind"], "empty_result");
}

#[tokio::test]
async fn test_unknown_page_size_is_rejected() {
    let dir = TempDir::new().unwrap();
    let image = write_png(&dir.path().join("photo.png"), 10, 10);

    let mut processor = Processor::new(ImagesToPdf::new());
    let ok = processor
        .process(
            &image,
            dir.path().join("out.pdf"),
            &Options::new().with("page_size", "tabloid"),
        )
        .await;

    assert!(!ok);
    assert_eq!(processor.info().details["error_kind"], "invalid_input");
}
