//! Static asset publishing integration tests

use appwire::storage::{
    FileEntry, PlaceholderStorage, ProgressCallback, ReleaseDescriptor, ReportStorage,
    StaticAssets, StorageError, StorageResult,
};
use async_trait::async_trait;
use std::path::Path;

fn write_bundle(dir: &Path) {
    std::fs::create_dir_all(dir.join("assets")).unwrap();
    std::fs::write(dir.join("index.html"), b"<div id=\"root\"></div>").unwrap();
    std::fs::write(dir.join("assets").join("app.js"), b"render()").unwrap();
    std::fs::write(dir.join("assets").join("app.css"), b"body{}").unwrap();
}

#[test]
fn release_is_stable_across_scans() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path());

    let first = StaticAssets::scan_with_version(dir.path(), "1.2.0").unwrap();
    let second = StaticAssets::scan_with_version(dir.path(), "1.2.0").unwrap();

    assert_eq!(first.release(), second.release());
    let rendered = first.release().to_string();
    let (version, prefix) = rendered.split_once('-').unwrap();
    assert_eq!(version, "1.2.0");
    assert!(!prefix.is_empty() && prefix.len() <= 5);
    assert!(prefix.chars().all(|c| c.is_ascii_alphanumeric()));

    let paths: Vec<&str> = first.files().iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["assets/app.css", "assets/app.js", "index.html"]);
}

#[test]
fn release_changes_with_content() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path());
    let before = StaticAssets::scan_with_version(dir.path(), "1.2.0").unwrap();

    std::fs::write(dir.path().join("assets").join("app.js"), b"render(2)").unwrap();
    let after = StaticAssets::scan_with_version(dir.path(), "1.2.0").unwrap();

    assert_ne!(before.release(), after.release());
}

#[test]
fn empty_or_missing_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let err = StaticAssets::scan(dir.path()).unwrap_err();
    assert!(matches!(err, StorageError::NoStaticAssetsFound { .. }));

    let err = PlaceholderStorage::new(dir.path().join("missing"), "https://share.example.com")
        .unwrap_err();
    assert!(matches!(err, StorageError::NoStaticAssetsFound { .. }));
    assert!(err.to_string().contains("Run the frontend build first"));
}

#[tokio::test]
async fn placeholder_publish_returns_report_url() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path());
    let storage = PlaceholderStorage::new(dir.path(), "https://share.example.com/reports").unwrap();

    let mut seen = Vec::new();
    let files = vec![
        FileEntry::new("report.json", b"{}".to_vec()),
        FileEntry::from(("data.arrow", b"ARROW1".to_vec())),
    ];
    let url = {
        let progress: ProgressCallback<'_> = &mut |p: u8| seen.push(p);
        storage
            .save_report_files("report-123", &files, Some(progress))
            .await
            .unwrap()
    };

    assert_eq!(url, "https://share.example.com/reports/report-123");
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    // Initial 0, then one step per asset and report file
    assert_eq!(seen.len(), 6);
}

#[tokio::test]
async fn publish_without_progress_callback() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path());
    let storage = PlaceholderStorage::new(dir.path(), "https://share.example.com").unwrap();

    let url = storage.save_report_files("r", &[], None).await.unwrap();
    assert_eq!(url, "https://share.example.com/r");
}

/// Backend that rejects every upload
struct RejectingStorage {
    release: ReleaseDescriptor,
}

#[async_trait]
impl ReportStorage for RejectingStorage {
    fn release(&self) -> &ReleaseDescriptor {
        &self.release
    }

    async fn save_report_files(
        &self,
        report_id: &str,
        _files: &[FileEntry],
        _progress: Option<ProgressCallback<'_>>,
    ) -> StorageResult<String> {
        Err(StorageError::Upload(format!("bucket is read-only ({})", report_id)))
    }
}

#[tokio::test]
async fn storage_backends_are_interchangeable() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path());
    let assets = StaticAssets::scan(dir.path()).unwrap();

    let backends: Vec<Box<dyn ReportStorage>> = vec![
        Box::new(PlaceholderStorage::with_assets(assets.clone(), "https://share.example.com").unwrap()),
        Box::new(RejectingStorage {
            release: assets.release().clone(),
        }),
    ];

    let results: Vec<StorageResult<String>> = futures::future::join_all(
        backends
            .iter()
            .map(|backend| backend.save_report_files("r1", &[], None)),
    )
    .await;

    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(StorageError::Upload(_))));
    assert_eq!(backends[0].release(), backends[1].release());
}
