//! Static asset discovery and release hashing

use super::{StorageError, StorageResult};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Number of digest bytes kept in the release identifier
const DIGEST_PREFIX_LEN: usize = 3;

/// A file to publish: path relative to its root, using '/', and its bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub data: Vec<u8>,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }
}

impl<P: Into<String>, D: Into<Vec<u8>>> From<(P, D)> for FileEntry {
    fn from((path, data): (P, D)) -> Self {
        Self::new(path, data)
    }
}

/// Identifies a build of the static bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    pub version: String,
    pub digest_prefix: String,
}

impl ReleaseDescriptor {
    /// Build a descriptor from a version and a content digest
    pub fn new(version: impl Into<String>, digest: &[u8]) -> Self {
        let prefix = &digest[..digest.len().min(DIGEST_PREFIX_LEN)];
        Self {
            version: version.into(),
            digest_prefix: bs58::encode(prefix).into_string(),
        }
    }
}

impl fmt::Display for ReleaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.version, self.digest_prefix)
    }
}

/// The built frontend bundle, read once and shared read-only afterwards
#[derive(Debug, Clone)]
pub struct StaticAssets {
    dir: PathBuf,
    files: Vec<FileEntry>,
    release: ReleaseDescriptor,
}

impl StaticAssets {
    /// Scan `dir`, using the crate version for the release identifier
    pub fn scan(dir: impl AsRef<Path>) -> StorageResult<Self> {
        Self::scan_with_version(dir, env!("CARGO_PKG_VERSION"))
    }

    /// Scan `dir` recursively and hash every file in walk order
    ///
    /// Entries are visited sorted by file name, so two scans of an unchanged
    /// directory produce the same release identifier.
    pub fn scan_with_version(dir: impl AsRef<Path>, version: &str) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tracing::debug!("Scanning static assets in {:?}", dir);

        if !dir.is_dir() {
            return Err(StorageError::NoStaticAssetsFound { dir });
        }

        let mut files = Vec::new();
        let mut digest = md5::Context::new();

        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let data = std::fs::read(entry.path()).map_err(|source| StorageError::Io {
                path: entry.path().to_path_buf(),
                source,
            })?;
            digest.consume(&data);
            files.push(FileEntry::new(relative_path(&dir, entry.path()), data));
        }

        if files.is_empty() {
            return Err(StorageError::NoStaticAssetsFound { dir });
        }

        let release = ReleaseDescriptor::new(version, &digest.compute().0);
        tracing::info!(
            "Loaded {} static file(s) from {:?}, release {}",
            files.len(),
            dir,
            release
        );

        Ok(Self {
            dir,
            files,
            release,
        })
    }

    /// Directory the assets were read from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files in walk order
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Release identifier
    pub fn release(&self) -> &ReleaseDescriptor {
        &self.release
    }

    /// Total size of all files in bytes
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.data.len()).sum()
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
