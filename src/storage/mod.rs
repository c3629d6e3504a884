//! Report storage
//!
//! Scans the built frontend bundle once at startup, derives a release
//! identifier from its contents, and publishes report files to a storage
//! backend.

pub mod assets;
pub mod placeholder;
pub mod progress;

pub use assets::{FileEntry, ReleaseDescriptor, StaticAssets};
pub use placeholder::PlaceholderStorage;
pub use progress::ProgressTracker;

use async_trait::async_trait;
use std::path::PathBuf;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Cannot find static files in {}. Run the frontend build first.", dir.display())]
    NoStaticAssetsFound { dir: PathBuf },

    #[error("Failed to read static file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan static directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid storage base url: {0}")]
    InvalidBaseUrl(String),

    #[error("Upload failed: {0}")]
    Upload(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Progress callback, called with a percentage in [0, 100]
pub type ProgressCallback<'a> = &'a mut (dyn FnMut(u8) + Send);

/// Storage backend for published reports
#[async_trait]
pub trait ReportStorage: Send + Sync {
    /// Release identifier of the static bundle this storage serves
    fn release(&self) -> &ReleaseDescriptor;

    /// Upload the files of a report and return the url it can be fetched from
    ///
    /// Files are written in the given order; later files may depend on
    /// earlier ones. `progress`, if set, receives non-decreasing percentages.
    async fn save_report_files(
        &self,
        report_id: &str,
        files: &[FileEntry],
        progress: Option<ProgressCallback<'_>>,
    ) -> StorageResult<String>;
}
