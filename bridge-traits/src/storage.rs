//! File Index Abstraction
//!
//! The reconciliation pipeline never walks the disk itself. It asks a
//! [`FileIndex`] which files a folder holds and when a file was last
//! modified, so hosts can back it with the real file system, a network
//! share listing, or an in-memory fixture.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// A single file observed inside a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last modification time as a Unix timestamp in seconds
    pub modified_at: Option<i64>,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: 0,
            modified_at: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_modified_at(mut self, modified_at: i64) -> Self {
        self.modified_at = Some(modified_at);
        self
    }

    /// File name without its extension, if the path has one.
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }

    /// Lowercased extension without the leading dot.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
    }
}

/// Observed-state collaborator used by the scan pipeline
///
/// Implementations list the direct children of a folder. Only regular files
/// are returned; sub-folders are not descended into.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileIndex;
///
/// async fn count_videos(index: &dyn FileIndex, folder: &Path) -> Result<usize> {
///     let files = index.list_files(folder).await?;
///     Ok(files.iter().filter(|f| f.extension().as_deref() == Some("mkv")).count())
/// }
/// ```
#[async_trait]
pub trait FileIndex: Send + Sync {
    /// List the files directly inside `folder`
    ///
    /// A folder that does not exist yields an empty list, not an error.
    async fn list_files(&self, folder: &Path) -> Result<Vec<FileEntry>>;

    /// Check whether `folder` exists and is a directory
    async fn folder_exists(&self, folder: &Path) -> Result<bool>;

    /// Modification time of a single file, `None` when the file is absent
    async fn modified_at(&self, path: &Path) -> Result<Option<i64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_entry_stem_and_extension() {
        let entry = FileEntry::new("/tv/Show/Season 01/Show - S01E01 - Pilot.MKV")
            .with_size(42)
            .with_modified_at(1_700_000_000);

        assert_eq!(entry.stem(), Some("Show - S01E01 - Pilot"));
        assert_eq!(entry.extension().as_deref(), Some("mkv"));
        assert_eq!(entry.size, 42);
        assert_eq!(entry.modified_at, Some(1_700_000_000));
    }

    #[test]
    fn test_file_entry_without_extension() {
        let entry = FileEntry::new("/tv/README");
        assert_eq!(entry.stem(), Some("README"));
        assert_eq!(entry.extension(), None);
    }
}
