//! Paths the user dismissed
//!
//! Entries are compared as exact, case-sensitive strings. Nothing is
//! normalised here: `/tv/Lost` and `/tv/lost/` are different entries, so
//! callers must store paths in the same form the reconciler produces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, ScanError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IgnoreRegistry {
    paths: BTreeSet<String>,
}

impl IgnoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the path was already ignored or is empty.
    pub fn add(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if path.is_empty() {
            return false;
        }
        self.paths.insert(path)
    }

    pub fn remove(&mut self, path: &str) -> bool {
        self.paths.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        !path.is_empty() && self.paths.contains(path)
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.contains(&path.to_string_lossy())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    /// Read a registry saved with [`save`](Self::save). A missing file is an
    /// empty registry.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?path, "No ignore list on disk");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(ScanError::IgnoreIo {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        let registry: Self =
            serde_json::from_slice(&bytes).map_err(|e| ScanError::IgnoreFormat {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        info!(entries = registry.len(), "Loaded ignore list");
        Ok(registry)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let io_error = |source| ScanError::IgnoreIo {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        fs::write(path, bytes).await.map_err(io_error)?;
        debug!(entries = self.len(), "Saved ignore list");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exact_case_sensitive_matching() {
        let mut ignore = IgnoreRegistry::new();
        assert!(ignore.add("/tv/Lost/Season 01/Lost - S01E01 - Pilot"));
        assert!(!ignore.add("/tv/Lost/Season 01/Lost - S01E01 - Pilot"));

        assert!(ignore.contains("/tv/Lost/Season 01/Lost - S01E01 - Pilot"));
        assert!(!ignore.contains("/tv/lost/Season 01/Lost - S01E01 - Pilot"));
        assert!(!ignore.contains("/tv/Lost/Season 01/Lost - S01E01 - Pilot/"));
    }

    #[test]
    fn test_empty_path_never_matches() {
        let mut ignore = IgnoreRegistry::new();
        assert!(!ignore.add(""));
        assert!(!ignore.contains(""));
        assert!(ignore.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut ignore = IgnoreRegistry::new();
        ignore.add("/a");
        ignore.add("/b");
        assert!(ignore.remove("/a"));
        assert!(!ignore.remove("/a"));
        assert_eq!(ignore.iter().collect::<Vec<_>>(), vec!["/b"]);
        ignore.clear();
        assert_eq!(ignore.len(), 0);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("ignore-list.json");

        let mut ignore = IgnoreRegistry::new();
        ignore.add("/tv/Lost/S01E01");
        ignore.add("/tv/Fringe/S02E03");
        ignore.save(&path).await.unwrap();

        let loaded = IgnoreRegistry::load(&path).await.unwrap();
        assert_eq!(loaded, ignore);
    }

    #[tokio::test]
    async fn test_load_missing_and_corrupt() {
        let dir = TempDir::new().unwrap();
        let missing = IgnoreRegistry::load(&dir.path().join("none.json")).await.unwrap();
        assert!(missing.is_empty());

        let corrupt = dir.path().join("bad.json");
        fs::write(&corrupt, b"{").await.unwrap();
        assert!(matches!(
            IgnoreRegistry::load(&corrupt).await,
            Err(ScanError::IgnoreFormat { .. })
        ));
    }
}
