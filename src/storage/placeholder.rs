//! Placeholder report storage
//!
//! Walks the upload sequence without sending anything anywhere and returns a
//! url derived from the report id. Used when no real backend is configured.

use super::assets::{FileEntry, ReleaseDescriptor, StaticAssets};
use super::progress::ProgressTracker;
use super::{ProgressCallback, ReportStorage, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::Path;
use url::Url;

/// Storage backend that uploads nothing
#[derive(Debug, Clone)]
pub struct PlaceholderStorage {
    assets: StaticAssets,
    base_url: Url,
}

impl PlaceholderStorage {
    /// Scan `static_dir` and serve reports under `base_url`
    pub fn new(static_dir: impl AsRef<Path>, base_url: &str) -> StorageResult<Self> {
        let assets = StaticAssets::scan(static_dir)?;
        Self::with_assets(assets, base_url)
    }

    /// Use already scanned assets
    pub fn with_assets(assets: StaticAssets, base_url: &str) -> StorageResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StorageError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self { assets, base_url })
    }

    /// Static assets published with every report
    pub fn static_assets(&self) -> &StaticAssets {
        &self.assets
    }

    /// Url a report is published under
    pub fn report_url(&self, report_id: &str) -> StorageResult<String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(report_id);
        Ok(url.to_string())
    }
}

#[async_trait]
impl ReportStorage for PlaceholderStorage {
    fn release(&self) -> &ReleaseDescriptor {
        self.assets.release()
    }

    async fn save_report_files(
        &self,
        report_id: &str,
        files: &[FileEntry],
        progress: Option<ProgressCallback<'_>>,
    ) -> StorageResult<String> {
        let mut tracker = ProgressTracker::new(progress);
        let uploads: Vec<&FileEntry> = self.assets.files().iter().chain(files).collect();
        let total = uploads.len();

        tracing::info!(
            "Publishing report {} ({} file(s), release {})",
            report_id,
            total,
            self.release()
        );
        tracker.report(0);

        for (index, file) in uploads.iter().enumerate() {
            tracing::debug!("Uploading {} ({} bytes)", file.path, file.data.len());
            tokio::task::yield_now().await;
            tracker.report_steps(index + 1, total);
        }

        let url = self.report_url(report_id)?;
        tracing::info!("Report {} published at {}", report_id, url);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets() -> (tempfile::TempDir, StaticAssets) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.js"), b"app()").unwrap();
        let assets = StaticAssets::scan(dir.path()).unwrap();
        (dir, assets)
    }

    #[test]
    fn test_report_url() {
        let (_dir, assets) = assets();
        let storage = PlaceholderStorage::with_assets(assets, "https://share.example.com/reports/").unwrap();
        assert_eq!(
            storage.report_url("report 1").unwrap(),
            "https://share.example.com/reports/report%201"
        );
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let (_dir, assets) = assets();
        assert!(matches!(
            PlaceholderStorage::with_assets(assets.clone(), "not a url"),
            Err(StorageError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            PlaceholderStorage::with_assets(assets, "mailto:ops@example.com"),
            Err(StorageError::InvalidBaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_progress_reaches_100() {
        let (_dir, assets) = assets();
        let storage = PlaceholderStorage::with_assets(assets, "https://share.example.com").unwrap();

        let mut seen = Vec::new();
        let files = vec![FileEntry::new("report.json", b"{}".to_vec())];
        {
            let callback: ProgressCallback<'_> = &mut |p: u8| seen.push(p);
            storage
                .save_report_files("r1", &files, Some(callback))
                .await
                .unwrap();
        }

        assert_eq!(seen, vec![0, 50, 100]);
    }
}
