//! Cache persistence
//!
//! A snapshot holds the cached records and the last confirmed watermark of
//! one cache. Nothing else about the file is interpreted by the core.
//!
//! An unreadable snapshot is never fatal: [`restore_cache`] reports it and
//! leaves the cache empty with a zero watermark, so the next sync performs a
//! full refresh.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::cache::MediaCache;
use crate::clock::UpdateClock;
use crate::error::{LibraryError, Result};
use crate::models::{CachedMediaRecord, MediaKind};

/// Bumped whenever the record layout changes incompatibly.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Persisted state of one cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub format_version: u32,
    pub kind: MediaKind,
    /// Watermark of the last committed sync
    pub last_confirmed: i64,
    pub records: Vec<CachedMediaRecord>,
}

impl CacheSnapshot {
    pub fn new(kind: MediaKind, last_confirmed: i64, records: Vec<CachedMediaRecord>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            kind,
            last_confirmed,
            records,
        }
    }

    /// Capture the current content of `cache` with the clock's durable watermark.
    pub fn capture(cache: &MediaCache, clock: &UpdateClock) -> Self {
        Self::new(cache.kind(), clock.last_confirmed_time(), cache.records())
    }
}

/// Persistence collaborator for cache snapshots
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the stored snapshot; `Ok(None)` when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// [`LibraryError::MalformedSnapshot`] when stored data cannot be decoded.
    async fn load_snapshot(&self) -> Result<Option<CacheSnapshot>>;

    async fn save_snapshot(&self, snapshot: &CacheSnapshot) -> Result<()>;
}

/// Snapshot store writing one JSON file
///
/// Writes go to a sibling temporary file first and are renamed into place,
/// so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
    kind: MediaKind,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> LibraryError {
        LibraryError::SnapshotIo {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn malformed(&self, message: impl Into<String>) -> LibraryError {
        LibraryError::MalformedSnapshot {
            path: self.path.display().to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    #[instrument(skip(self), fields(kind = %self.kind))]
    async fn load_snapshot(&self) -> Result<Option<CacheSnapshot>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "No snapshot on disk");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let snapshot: CacheSnapshot =
            serde_json::from_slice(&bytes).map_err(|e| self.malformed(e.to_string()))?;

        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(self.malformed(format!(
                "unsupported format version {} (expected {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        if snapshot.kind != self.kind {
            return Err(self.malformed(format!(
                "snapshot holds {} records, expected {}",
                snapshot.kind, self.kind
            )));
        }

        Ok(Some(snapshot))
    }

    #[instrument(skip(self, snapshot), fields(kind = %self.kind, records = snapshot.records.len()))]
    async fn save_snapshot(&self, snapshot: &CacheSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let temp = self.temp_path();
        fs::write(&temp, &bytes).await.map_err(|e| self.io_error(e))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = ?self.path, bytes = bytes.len(), "Saved snapshot");
        Ok(())
    }
}

/// Result of restoring a cache from its snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreOutcome {
    /// Records now in the cache
    pub records: usize,
    /// Clock restored from the snapshot, zero when nothing was usable
    pub clock: UpdateClock,
    /// Why a stored snapshot was thrown away, if it was
    pub discarded: Option<String>,
}

/// Load `store` into `cache`.
///
/// A malformed snapshot degrades to an empty cache and a zero clock.
///
/// # Errors
///
/// Only I/O failures other than "file not found" are returned.
pub async fn restore_cache(store: &dyn SnapshotStore, cache: &MediaCache) -> Result<RestoreOutcome> {
    match store.load_snapshot().await {
        Ok(Some(snapshot)) => {
            let records = cache.load(snapshot.records);
            let clock = UpdateClock::from_confirmed(snapshot.last_confirmed);
            info!(
                kind = %cache.kind(),
                records,
                last_confirmed = snapshot.last_confirmed,
                "Restored cache snapshot"
            );
            Ok(RestoreOutcome {
                records,
                clock,
                discarded: None,
            })
        }
        Ok(None) => {
            cache.forget_everything();
            Ok(RestoreOutcome {
                records: 0,
                clock: UpdateClock::new(),
                discarded: None,
            })
        }
        Err(e) if e.is_malformed_snapshot() => {
            warn!(kind = %cache.kind(), error = %e, "Discarding unreadable snapshot, full refresh scheduled");
            cache.forget_everything();
            Ok(RestoreOutcome {
                records: 0,
                clock: UpdateClock::new(),
                discarded: Some(e.to_string()),
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CachedEpisode, MediaId};
    use tempfile::TempDir;

    fn sample_cache() -> MediaCache {
        let cache = MediaCache::new(MediaKind::Series);
        cache
            .merge(
                CachedMediaRecord::full(MediaId(1), MediaKind::Series, "Lost")
                    .with_alias("Perdidos")
                    .with_episode(CachedEpisode::new(10, 1, 1, "Pilot (1)"))
                    .with_server_last_updated(1_500_000_000),
            )
            .unwrap();
        cache.upsert_placeholder(MediaId(2));
        cache
    }

    #[tokio::test]
    async fn test_save_then_restore() {
        let dir = TempDir::new().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("series-cache.json"), MediaKind::Series);

        let cache = sample_cache();
        let clock = UpdateClock::from_confirmed(1_600_000_000);
        store
            .save_snapshot(&CacheSnapshot::capture(&cache, &clock))
            .await
            .unwrap();
        assert!(!store.temp_path().exists());

        let restored = MediaCache::new(MediaKind::Series);
        let outcome = restore_cache(&store, &restored).await.unwrap();

        assert_eq!(outcome.records, 2);
        assert_eq!(outcome.clock.begin_sync(), 1_600_000_000);
        assert!(outcome.discarded.is_none());
        assert_eq!(restored.records(), cache.records());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_and_never_synced() {
        let dir = TempDir::new().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("nothing.json"), MediaKind::Movie);

        assert!(store.load_snapshot().await.unwrap().is_none());

        let cache = MediaCache::new(MediaKind::Movie);
        let outcome = restore_cache(&store, &cache).await.unwrap();
        assert_eq!(outcome.records, 0);
        assert!(!outcome.clock.has_synced());
    }

    #[tokio::test]
    async fn test_malformed_snapshot_degrades_to_full_refresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("series-cache.json");
        fs::write(&path, b"{ not json").await.unwrap();
        let store = JsonSnapshotStore::new(&path, MediaKind::Series);

        assert!(store.load_snapshot().await.unwrap_err().is_malformed_snapshot());

        let cache = sample_cache();
        let outcome = restore_cache(&store, &cache).await.unwrap();
        assert!(cache.is_empty());
        assert_eq!(outcome.clock, UpdateClock::new());
        assert!(outcome.discarded.unwrap().contains("Malformed snapshot"));
    }

    #[tokio::test]
    async fn test_wrong_kind_or_version_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let movies = JsonSnapshotStore::new(&path, MediaKind::Movie);
        movies
            .save_snapshot(&CacheSnapshot::new(MediaKind::Movie, 5, Vec::new()))
            .await
            .unwrap();
        let series = JsonSnapshotStore::new(&path, MediaKind::Series);
        assert!(series.load_snapshot().await.unwrap_err().is_malformed_snapshot());

        let mut future = CacheSnapshot::new(MediaKind::Movie, 5, Vec::new());
        future.format_version = SNAPSHOT_FORMAT_VERSION + 1;
        movies.save_snapshot(&future).await.unwrap();
        assert!(movies.load_snapshot().await.unwrap_err().is_malformed_snapshot());
    }
}
