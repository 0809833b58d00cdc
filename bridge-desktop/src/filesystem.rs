//! File Index Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileEntry, FileIndex},
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::debug;

const APP_DIR: &str = "media-library-core";

/// Default directory for cache snapshots and the ignore list.
///
/// Falls back to `~/.local/share` and finally the working directory when the
/// platform reports no data directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local")
                .join("share")
        })
        .join(APP_DIR)
}

/// Tokio-based file index reading the local file system
#[derive(Debug, Clone, Default)]
pub struct TokioFileIndex;

impl TokioFileIndex {
    pub fn new() -> Self {
        Self
    }

    fn map_io_error(path: &Path, e: std::io::Error) -> BridgeError {
        match e.kind() {
            ErrorKind::PermissionDenied => BridgeError::inaccessible(path, e.to_string()),
            _ => BridgeError::Io(e),
        }
    }

    fn to_epoch(time: std::io::Result<SystemTime>) -> Option<i64> {
        time.ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
    }
}

#[async_trait]
impl FileIndex for TokioFileIndex {
    async fn list_files(&self, folder: &Path) -> Result<Vec<FileEntry>> {
        let mut reader = match fs::read_dir(folder).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?folder, "Folder not found, listing as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(Self::map_io_error(folder, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| Self::map_io_error(folder, e))?
        {
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // Entry vanished between read_dir and stat
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Self::map_io_error(&entry.path(), e)),
            };
            if !metadata.is_file() {
                continue;
            }
            files.push(FileEntry {
                path: entry.path(),
                size: metadata.len(),
                modified_at: Self::to_epoch(metadata.modified()),
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(path = ?folder, count = files.len(), "Listed folder");
        Ok(files)
    }

    async fn folder_exists(&self, folder: &Path) -> Result<bool> {
        match fs::metadata(folder).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_io_error(folder, e)),
        }
    }

    async fn modified_at(&self, path: &Path) -> Result<Option<i64>> {
        match fs::metadata(path).await {
            Ok(metadata) => Ok(Self::to_epoch(metadata.modified())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_io_error(path, e)),
        }
    }
}
