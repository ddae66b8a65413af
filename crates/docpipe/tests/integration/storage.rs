//! Staging directory behaviour.

use docpipe::TemporaryStorage;
use docpipe::config::StorageConfig;
use docpipe::storage::UploadedFile;
use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const MINUTE: Duration = Duration::from_secs(60);

fn storage(dir: &TempDir, lifetime_minutes: u64) -> TemporaryStorage {
    let config = StorageConfig::with_base_dir(dir.path().join("staging"))
        .public_root(dir.path().join("public"))
        .lifetime_minutes(lifetime_minutes)
        .unwrap();
    TemporaryStorage::new(config).unwrap()
}

fn age(path: &Path, by: Duration) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - by).unwrap();
}

#[tokio::test]
async fn test_cleanup_reclaims_only_expired_files() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, 60);

    let stale = storage.store_contents(b"old", "pdf").await.unwrap();
    let fresh = storage.store_contents(b"new", "pdf").await.unwrap();
    age(&stale, 61 * MINUTE);
    age(&fresh, MINUTE);

    assert_eq!(storage.cleanup().await.unwrap(), 1);
    assert!(!stale.exists());
    assert!(fresh.exists());
}

#[tokio::test]
async fn test_cleanup_twice_on_clean_directory_returns_zero() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, 60);
    storage.store_contents(b"new", "pdf").await.unwrap();

    assert_eq!(storage.cleanup().await.unwrap(), 0);
    assert_eq!(storage.cleanup().await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_sweeps_count_each_file_once() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, 1);

    for _ in 0..8 {
        let path = storage.store_contents(b"x", "tmp").await.unwrap();
        age(&path, 2 * MINUTE);
    }

    let (a, b) = tokio::join!(storage.cleanup(), storage.cleanup());
    assert_eq!(a.unwrap() + b.unwrap(), 8);
}

#[tokio::test]
async fn test_cleanup_leaves_subdirectories_alone() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, 1);

    let nested = storage.base_dir().join("keep");
    std::fs::create_dir(&nested).unwrap();
    std::fs::write(nested.join("inner.pdf"), b"x").unwrap();
    age(&nested.join("inner.pdf"), 10 * MINUTE);

    assert_eq!(storage.cleanup().await.unwrap(), 0);
    assert!(nested.join("inner.pdf").exists());
}

#[tokio::test]
async fn test_upload_lifetime_shifts_apparent_age() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, 60);

    let source = dir.path().join("scan.PNG");
    std::fs::write(&source, b"pixels").unwrap();
    let upload = UploadedFile::new("scan.PNG", &source);

    let short = storage
        .store_uploaded_file(&upload, Some(5 * MINUTE))
        .await
        .unwrap();
    let long = storage.store_uploaded_file(&upload, None).await.unwrap();
    assert_eq!(short.extension().unwrap(), "png");

    // Five minutes into a sixty minute lifetime: looks 55 minutes old.
    let modified = std::fs::metadata(&short).unwrap().modified().unwrap();
    let apparent_age = SystemTime::now().duration_since(modified).unwrap();
    assert!(apparent_age >= 54 * MINUTE && apparent_age < 56 * MINUTE);

    age(&long, 2 * MINUTE);
    assert_eq!(storage.cleanup().await.unwrap(), 0);

    age(&short, 61 * MINUTE);
    assert_eq!(storage.cleanup().await.unwrap(), 1);
    assert!(!short.exists());
    assert!(long.exists());
}

#[tokio::test]
async fn test_published_pdf_is_reachable_by_url() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, 60);
    let staged = storage.store_contents(b"%PDF-1.5", "pdf").await.unwrap();

    let relative = storage
        .store_pdf_in_public(&staged, Some("Annual Report 2024"))
        .await
        .unwrap();

    assert_eq!(relative, "pdfs/Annual_Report_2024.pdf");
    assert_eq!(
        std::fs::read(storage.public_path(&relative)).unwrap(),
        b"%PDF-1.5"
    );
    assert_eq!(
        storage.public_url(&relative),
        "/storage/pdfs/Annual_Report_2024.pdf"
    );
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, 60);
    let staged = storage.store_contents(b"x", "pdf").await.unwrap();
    let name = staged.file_name().unwrap().to_str().unwrap().to_string();

    assert!(storage.delete(&name).await);
    assert!(!storage.delete(&name).await);
    assert!(!storage.delete("../outside.pdf").await);
}
