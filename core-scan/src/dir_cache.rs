//! Per-pass directory listings

use bridge_traits::{FileEntry, FileIndex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;

/// Lists each folder at most once per pass.
pub struct DirCache {
    index: Arc<dyn FileIndex>,
    listings: HashMap<PathBuf, Arc<Vec<FileEntry>>>,
    hits: usize,
}

impl DirCache {
    pub fn new(index: Arc<dyn FileIndex>) -> Self {
        Self {
            index,
            listings: HashMap::new(),
            hits: 0,
        }
    }

    pub async fn list(&mut self, folder: &Path) -> Result<Arc<Vec<FileEntry>>> {
        if let Some(listing) = self.listings.get(folder) {
            self.hits += 1;
            return Ok(Arc::clone(listing));
        }
        let listing = Arc::new(self.index.list_files(folder).await?);
        self.listings
            .insert(folder.to_path_buf(), Arc::clone(&listing));
        Ok(listing)
    }

    /// Modification time of `path`, from its folder listing when possible.
    pub async fn modified_at(&mut self, path: &Path) -> Result<Option<i64>> {
        let Some(folder) = path.parent() else {
            return Ok(self.index.modified_at(path).await?);
        };
        let listing = self.list(folder).await?;
        match listing.iter().find(|entry| entry.path == path) {
            None => Ok(None),
            Some(entry) if entry.modified_at.is_some() => Ok(entry.modified_at),
            Some(_) => Ok(self.index.modified_at(path).await?),
        }
    }

    pub fn folders_listed(&self) -> usize {
        self.listings.len()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}
