//! Integration tests for the service facade
//!
//! Each test starts a [`CoreService`] over a temporary data directory:
//! - Sync commits and persists; a restarted service sees the same records
//! - Malformed snapshots degrade to an empty cache
//! - The ignore list survives restarts
//! - Cancellation affects one pass only
//! - Requests after shutdown fail cleanly

use async_trait::async_trait;
use bridge_traits::{BridgeError, FileEntry, FileIndex, ManualClock};
use chrono::NaiveDate;
use core_library::{CachedEpisode, CachedMediaRecord, MediaId, MediaKind};
use core_runtime::config::CoreConfig;
use core_scan::{Library, ScanSelection, TrackedShow};
use core_service::{CoreError, CoreService};
use core_sync::{ChangedIds, MetadataProvider, ProviderResult};
use mockall::mock;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const NOW: i64 = 1_700_000_000;
const LOST: MediaId = MediaId(4);

// ============================================================================
// Collaborators
// ============================================================================

mock! {
    pub Provider {}

    #[async_trait]
    impl MetadataProvider for Provider {
        fn name(&self) -> &'static str;
        fn kind(&self) -> MediaKind;
        async fn fetch_by_id(&self, id: MediaId) -> ProviderResult<CachedMediaRecord>;
        async fn fetch_changed_ids(&self, since: i64) -> ProviderResult<ChangedIds>;
        async fn search(&self, text: &str) -> ProviderResult<Vec<CachedMediaRecord>>;
    }
}

/// Every folder exists and is empty.
struct EmptyFolders;

#[async_trait]
impl FileIndex for EmptyFolders {
    async fn list_files(&self, _folder: &Path) -> Result<Vec<FileEntry>, BridgeError> {
        Ok(Vec::new())
    }

    async fn folder_exists(&self, _folder: &Path) -> Result<bool, BridgeError> {
        Ok(true)
    }

    async fn modified_at(&self, _path: &Path) -> Result<Option<i64>, BridgeError> {
        Ok(None)
    }
}

fn lost() -> CachedMediaRecord {
    CachedMediaRecord::full(LOST, MediaKind::Series, "Lost")
        .with_server_last_updated(NOW - 10)
        .with_episode(
            CachedEpisode::new(401, 1, 1, "Pilot")
                .with_first_aired(NaiveDate::from_ymd_opt(2004, 9, 22).unwrap()),
        )
        .with_episode(CachedEpisode::new(402, 1, 2, "Tabula Rasa"))
}

fn movie_provider() -> Arc<dyn MetadataProvider> {
    let mut provider = MockProvider::new();
    provider.expect_name().return_const("movies");
    provider.expect_kind().return_const(MediaKind::Movie);
    Arc::new(provider)
}

fn series_provider() -> MockProvider {
    let mut provider = MockProvider::new();
    provider.expect_name().return_const("series");
    provider.expect_kind().return_const(MediaKind::Series);
    provider
}

fn fetching_series_provider() -> Arc<dyn MetadataProvider> {
    let mut provider = series_provider();
    provider.expect_fetch_by_id().returning(|_| Ok(lost()));
    provider
        .expect_fetch_changed_ids()
        .returning(|_| Ok(ChangedIds::new(Vec::new(), NOW)));
    Arc::new(provider)
}

fn config(dir: &TempDir) -> CoreConfig {
    CoreConfig::builder()
        .data_dir(dir.path())
        .file_index(Arc::new(EmptyFolders))
        .clock(Arc::new(ManualClock::new(NOW)))
        .build()
        .unwrap()
}

async fn start(dir: &TempDir, series: Arc<dyn MetadataProvider>) -> CoreService {
    CoreService::start(config(dir), movie_provider(), series)
        .await
        .unwrap()
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test]
async fn test_start_on_empty_data_dir() {
    let dir = TempDir::new().unwrap();
    let core = start(&dir, Arc::new(series_provider())).await;

    assert!(core.series_record(LOST).is_none());
    assert_eq!(core.pending_updates(MediaKind::Series), 0);
    assert!(core.ignored_paths().is_empty());
}

#[tokio::test]
async fn test_start_rejects_provider_of_wrong_kind() {
    let dir = TempDir::new().unwrap();
    let result = CoreService::start(config(&dir), movie_provider(), movie_provider()).await;
    assert!(matches!(result, Err(CoreError::InitializationFailed(_))));
}

#[tokio::test]
async fn test_malformed_snapshot_starts_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("series-cache.json"), b"not json").unwrap();

    let core = start(&dir, Arc::new(series_provider())).await;

    assert!(core.series_record(LOST).is_none());
}

// ============================================================================
// Sync
// ============================================================================

#[tokio::test]
async fn test_first_sync_commits_and_survives_restart() {
    let dir = TempDir::new().unwrap();
    let core = start(&dir, fetching_series_provider()).await;

    let report = core.synchronize(MediaKind::Series, &[LOST]).await.unwrap();

    assert!(report.committed);
    assert!(!report.is_cancelled());
    let record = core.series_record(LOST).unwrap();
    assert_eq!(record.name, "Lost");
    assert!(!record.dirty);
    assert!(dir.path().join("series-cache.json").exists());

    core.shutdown().await.unwrap();

    // Restored watermark means the next sync asks for changes
    let mut provider = series_provider();
    provider
        .expect_fetch_changed_ids()
        .withf(|since| *since == NOW)
        .times(1)
        .returning(|_| Ok(ChangedIds::new(Vec::new(), NOW + 60)));
    let core = start(&dir, Arc::new(provider)).await;

    assert_eq!(core.series_record(LOST).unwrap().episodes.len(), 2);
    let report = core.synchronize(MediaKind::Series, &[LOST]).await.unwrap();
    assert!(report.committed);
}

#[tokio::test]
async fn test_cancel_affects_one_pass_only() {
    let dir = TempDir::new().unwrap();
    let core = start(&dir, fetching_series_provider()).await;

    core.cancel();
    let report = core.synchronize(MediaKind::Series, &[LOST]).await.unwrap();
    assert!(report.is_cancelled());
    assert!(!report.committed);
    assert_eq!(core.pending_updates(MediaKind::Series), 1);

    let report = core.synchronize(MediaKind::Series, &[LOST]).await.unwrap();
    assert!(report.committed);
    assert_eq!(core.pending_updates(MediaKind::Series), 0);
}

#[tokio::test]
async fn test_search_caches_search_only_records() {
    let dir = TempDir::new().unwrap();
    let mut provider = series_provider();
    provider.expect_search().returning(|_| {
        Ok(vec![CachedMediaRecord::full(MediaId(7), MediaKind::Series, "Fringe")])
    });
    let core = start(&dir, Arc::new(provider)).await;

    let hits = core.search(MediaKind::Series, "fringe").await.unwrap();

    assert_eq!(hits.len(), 1);
    assert!(core.series_record(MediaId(7)).unwrap().is_search_result_only);
    assert_eq!(
        core.find_by_name(MediaKind::Series, "Fringe", None).map(|r| r.id),
        Some(MediaId(7))
    );
}

#[tokio::test]
async fn test_tidy_and_forget_everything() {
    let dir = TempDir::new().unwrap();
    let core = start(&dir, fetching_series_provider()).await;
    core.synchronize(MediaKind::Series, &[LOST]).await.unwrap();

    let evicted = core
        .tidy(MediaKind::Series, HashSet::from([LOST]))
        .await
        .unwrap();
    assert!(evicted.is_empty());

    let evicted = core.tidy(MediaKind::Series, HashSet::new()).await.unwrap();
    assert_eq!(evicted, vec![LOST]);
    assert!(core.series_record(LOST).is_none());

    core.synchronize(MediaKind::Series, &[LOST]).await.unwrap();
    assert_eq!(core.forget_everything(MediaKind::Series).await.unwrap(), 1);
    assert!(core.series_record(LOST).is_none());
}

// ============================================================================
// Scan and ignore list
// ============================================================================

#[tokio::test]
async fn test_scan_reports_missing_and_honours_ignore() {
    let dir = TempDir::new().unwrap();
    let core = start(&dir, fetching_series_provider()).await;
    core.synchronize(MediaKind::Series, &[LOST]).await.unwrap();
    let library = Library::from(vec![TrackedShow::new(LOST, "/tv/Lost")]);

    let outcome = core.scan(&library, ScanSelection::All).await.unwrap();
    let missing: Vec<_> = outcome.actions.missing().cloned().collect();
    // Episode 2 has no air date and counts as unaired
    assert_eq!(missing.len(), 1);

    let path = missing[0].expected_path.to_string_lossy().into_owned();
    assert!(core.ignore(path.clone()).await.unwrap());
    assert!(!core.ignore(path.clone()).await.unwrap());

    let outcome = core.scan(&library, ScanSelection::All).await.unwrap();
    assert_eq!(outcome.actions.missing().count(), 0);

    core.shutdown().await.unwrap();
    let core = start(&dir, Arc::new(series_provider())).await;
    assert_eq!(core.ignored_paths(), vec![path.clone()]);
    assert!(core.unignore(&path).await.unwrap());
    assert!(core.ignored_paths().is_empty());
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_requests_after_shutdown_fail() {
    let dir = TempDir::new().unwrap();
    let core = start(&dir, Arc::new(series_provider())).await;
    let handle = core.clone();

    core.shutdown().await.unwrap();

    assert!(dir.path().join("movies-cache.json").exists());
    assert!(matches!(
        handle.search(MediaKind::Series, "lost").await,
        Err(CoreError::ShutDown)
    ));
}
