//! # Sync Engine
//!
//! Drives incremental metadata updates for one cache.
//!
//! ## Overview
//!
//! A sync is a two-phase protocol over an [`UpdateClock`]:
//!
//! 1. [`SyncEngine::synchronize`] reserves placeholders for tracked ids,
//!    promotes search-only records to dirty, and marks every id the provider
//!    reports as changed since the last confirmed watermark. A cache that was
//!    never synced is marked dirty wholesale instead.
//! 2. [`SyncEngine::refresh_dirty`] re-fetches dirty records one at a time.
//! 3. [`SyncEngine::commit`] makes the proposed watermark durable. Callers
//!    only commit after a completed refresh, so an interrupted run retries
//!    from the old watermark.
//!
//! The cache lock is never held across a provider call.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut engine = SyncEngine::new(provider, cache, UpdateClock::new(), clock)
//!     .with_events(event_bus);
//!
//! let cancel = CancellationToken::new();
//! let outcome = engine.synchronize(&tracked, &cancel).await?;
//! if !outcome.is_cancelled() {
//!     let refresh = engine.refresh_dirty(&cancel).await?;
//!     if refresh.completed {
//!         engine.commit();
//!     }
//! }
//! ```

use bridge_traits::time::Clock;
use core_library::{
    CacheSnapshot, CachedMediaRecord, MediaCache, MediaId, UpdateClock, NEVER_SYNCED,
};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus, SyncEvent};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::outcome::{FailureKind, RefreshOutcome, SyncFailure, SyncOutcome, SyncStatus};
use crate::provider::MetadataProvider;

/// Changed-id progress is reported every this many ids.
const PROGRESS_INTERVAL: usize = 100;

/// Incremental sync driver for one cache and one provider
pub struct SyncEngine<P: MetadataProvider + ?Sized> {
    provider: Arc<P>,
    cache: Arc<MediaCache>,
    update_clock: UpdateClock,
    clock: Arc<dyn Clock>,
    events: Option<EventBus>,
    refresh_batch_limit: Option<usize>,
    current_run: Option<String>,
}

impl<P: MetadataProvider + ?Sized> SyncEngine<P> {
    /// Create an engine.
    ///
    /// # Arguments
    ///
    /// * `provider` - Remote catalog for the cache's kind
    /// * `cache` - Shared cache instance, also read by the reconciler
    /// * `update_clock` - Watermark restored from the snapshot
    /// * `clock` - Source of "now" for the first full refresh
    pub fn new(
        provider: Arc<P>,
        cache: Arc<MediaCache>,
        update_clock: UpdateClock,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            cache,
            update_clock,
            clock,
            events: None,
            refresh_batch_limit: None,
            current_run: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Refresh at most `limit` dirty records per [`refresh_dirty`](Self::refresh_dirty) call.
    pub fn with_refresh_batch_limit(mut self, limit: Option<usize>) -> Self {
        self.refresh_batch_limit = limit;
        self
    }

    pub fn cache(&self) -> &Arc<MediaCache> {
        &self.cache
    }

    pub fn update_clock(&self) -> &UpdateClock {
        &self.update_clock
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(events) = &self.events {
            events.emit(event).ok();
        }
    }

    /// Mark everything that changed since the last confirmed watermark as dirty.
    ///
    /// # Arguments
    ///
    /// * `tracked_ids` - Ids the library references; missing ones get placeholders
    /// * `cancel` - Checked once per changed id
    ///
    /// # Returns
    ///
    /// A [`SyncOutcome`]. A cancelled run reports [`SyncStatus::Cancelled`] and
    /// leaves the watermark untouched.
    ///
    /// # Errors
    ///
    /// [`SyncError::Connectivity`] when the provider cannot be reached. The
    /// clock is not modified.
    #[instrument(
        skip(self, tracked_ids, cancel),
        fields(kind = %self.cache.kind(), provider = self.provider.name(), tracked = tracked_ids.len())
    )]
    pub async fn synchronize(
        &mut self,
        tracked_ids: &[MediaId],
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome> {
        let run_id = Uuid::new_v4().to_string();
        self.current_run = Some(run_id.clone());

        // Phase 1: reserve tracked ids and demote weak records
        let placeholders_added = tracked_ids
            .iter()
            .filter(|id| self.cache.upsert_placeholder(**id))
            .count();
        let search_results_promoted = self.cache.mark_search_results_dirty();
        debug!(
            placeholders_added,
            search_results_promoted, "Phase 1: prepared cache"
        );

        let since = self.update_clock.begin_sync();
        let full_refresh = since == NEVER_SYNCED;

        self.emit(CoreEvent::Sync(SyncEvent::Started {
            run_id: run_id.clone(),
            media_kind: self.cache.kind().to_string(),
            provider: self.provider.name().to_string(),
            full_refresh,
        }));

        // Phase 2a: never synced, refresh everything
        if full_refresh {
            let marked_dirty = self.cache.mark_all_dirty();
            self.update_clock
                .register_server_time(self.clock.unix_timestamp());
            info!(marked_dirty, "Phase 2: no previous sync, full refresh scheduled");

            return Ok(SyncOutcome {
                run_id,
                status: SyncStatus::FullRefreshScheduled,
                placeholders_added,
                search_results_promoted,
                changed_ids: 0,
                marked_dirty,
            });
        }

        // Phase 2b: ask the provider what changed
        info!(since, "Phase 2: fetching changed ids");
        let changed = match self.provider.fetch_changed_ids(since).await {
            Ok(changed) => changed,
            Err(e) => return Err(self.fail(&run_id, e)),
        };

        let mut seen = HashSet::with_capacity(changed.ids.len());
        let unique: Vec<MediaId> = changed
            .ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();
        let total = unique.len();

        // Phase 3: mark changed ids dirty
        let mut marked_dirty = 0;
        for (index, id) in unique.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(processed = index, total, "Sync cancelled, watermark not advanced");
                self.emit(CoreEvent::Sync(SyncEvent::Cancelled {
                    run_id: run_id.clone(),
                    processed: index as u64,
                }));
                return Ok(SyncOutcome {
                    run_id,
                    status: SyncStatus::Cancelled,
                    placeholders_added,
                    search_results_promoted,
                    changed_ids: total,
                    marked_dirty,
                });
            }

            if self.cache.mark_dirty(*id) {
                marked_dirty += 1;
            }

            if (index + 1) % PROGRESS_INTERVAL == 0 {
                self.emit(CoreEvent::Sync(SyncEvent::Progress {
                    run_id: run_id.clone(),
                    phase: "mark_dirty".to_string(),
                    processed: (index + 1) as u64,
                    total: Some(total as u64),
                }));
                // Let a pending cancel request run before the next batch
                tokio::task::yield_now().await;
            }
        }

        self.update_clock.register_server_time(changed.server_time);

        info!(
            changed_ids = total,
            marked_dirty,
            pending = self.cache.pending_update_count(),
            proposed = self.update_clock.proposed_time(),
            "Phase 3: changed ids marked dirty"
        );

        Ok(SyncOutcome {
            run_id,
            status: SyncStatus::Incremental,
            placeholders_added,
            search_results_promoted,
            changed_ids: total,
            marked_dirty,
        })
    }

    /// Re-fetch dirty records.
    ///
    /// Each fetch runs without holding the cache lock; its result is merged
    /// as a full fetch. Per-id consistency and not-found failures are
    /// collected and the batch continues.
    ///
    /// # Errors
    ///
    /// [`SyncError::Connectivity`] aborts the pass. Records refreshed before
    /// the failure stay refreshed.
    #[instrument(skip(self, cancel), fields(kind = %self.cache.kind(), provider = self.provider.name()))]
    pub async fn refresh_dirty(&mut self, cancel: &CancellationToken) -> Result<RefreshOutcome> {
        let started = Instant::now();
        let run_id = self
            .current_run
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let dirty = self.cache.dirty_ids();
        let limit = self.refresh_batch_limit.unwrap_or(dirty.len());
        let batch = &dirty[..limit.min(dirty.len())];

        let mut outcome = RefreshOutcome {
            run_id: run_id.clone(),
            requested: dirty.len(),
            ..Default::default()
        };

        info!(dirty = dirty.len(), batch = batch.len(), "Refreshing dirty records");

        let mut cancelled = false;
        for id in batch {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let result = self.provider.fetch_by_id(*id).await;

            if cancel.is_cancelled() {
                debug!(id = %id, "Discarding fetch finished after cancellation");
                outcome.discarded += 1;
                cancelled = true;
                break;
            }

            match result.map_err(SyncError::from).and_then(|r| self.accept(*id, r)) {
                Ok(()) => outcome.refreshed += 1,
                Err(SyncError::Consistency { id, message }) => {
                    warn!(id = %id, %message, "Skipping inconsistent record");
                    outcome.failures.push(SyncFailure {
                        id,
                        kind: FailureKind::Consistency,
                        message,
                    });
                }
                Err(SyncError::NotFound(id)) => {
                    warn!(id = %id, "Record no longer exists on provider");
                    outcome.failures.push(SyncFailure {
                        id,
                        kind: FailureKind::NotFound,
                        message: format!("{} not found on {}", id, self.provider.name()),
                    });
                }
                Err(e) => return Err(self.fail(&run_id, e)),
            }
        }

        outcome.completed = !cancelled && batch.len() == dirty.len();

        if cancelled {
            self.emit(CoreEvent::Sync(SyncEvent::Cancelled {
                run_id,
                processed: (outcome.refreshed + outcome.failures.len()) as u64,
            }));
        } else {
            self.emit(CoreEvent::Sync(SyncEvent::Completed {
                run_id,
                marked_dirty: outcome.requested as u64,
                refreshed: outcome.refreshed as u64,
                failures: outcome.failures.len() as u64,
                duration_ms: started.elapsed().as_millis() as u64,
            }));
        }

        info!(
            refreshed = outcome.refreshed,
            failures = outcome.failures.len(),
            completed = outcome.completed,
            "Refresh finished"
        );

        Ok(outcome)
    }

    /// Make the proposed watermark durable.
    pub fn commit(&mut self) {
        self.update_clock.commit();
        self.current_run = None;
        info!(
            kind = %self.cache.kind(),
            watermark = self.update_clock.last_confirmed_time(),
            "Committed sync watermark"
        );
        self.emit(CoreEvent::Sync(SyncEvent::Committed {
            media_kind: self.cache.kind().to_string(),
            watermark: self.update_clock.last_confirmed_time(),
        }));
    }

    /// Fetch one record now, whether cached or not.
    ///
    /// # Errors
    ///
    /// Provider failures are returned as the matching [`SyncError`] variant.
    pub async fn ensure_updated(&self, id: MediaId) -> Result<CachedMediaRecord> {
        let record = self.provider.fetch_by_id(id).await?;
        self.accept(id, record)?;
        self.cache.get(id).ok_or(SyncError::NotFound(id))
    }

    /// Search the provider and cache the hits as search-only records.
    ///
    /// Hits never downgrade records that were already fully fetched.
    pub async fn search(&self, text: &str) -> Result<Vec<CachedMediaRecord>> {
        let hits = self.provider.search(text).await?;
        let mut stored = Vec::with_capacity(hits.len());

        for mut hit in hits {
            if hit.kind != self.cache.kind() {
                debug!(id = %hit.id, kind = %hit.kind, "Ignoring search hit of another kind");
                continue;
            }
            let id = hit.id;
            hit.is_placeholder = false;
            hit.is_search_result_only = true;
            hit.dirty = false;
            self.cache.merge(hit)?;
            if let Some(record) = self.cache.get(id) {
                stored.push(record);
            }
        }

        debug!(text, hits = stored.len(), "Search merged into cache");
        Ok(stored)
    }

    pub fn lookup_by_name(&self, hint: &str, year: Option<i32>) -> Option<CachedMediaRecord> {
        self.cache.find_by_name(hint, year)
    }

    pub fn forget(&self, id: MediaId, make_placeholder: bool) -> bool {
        self.cache.forget(id, make_placeholder)
    }

    /// Drop every record and the watermark; the next sync is a full refresh.
    pub fn forget_everything(&mut self) -> usize {
        let removed = self.cache.forget_everything();
        self.update_clock.reset();
        self.current_run = None;
        info!(kind = %self.cache.kind(), removed, "Cache cleared");
        removed
    }

    /// Evict records the library no longer references.
    pub fn tidy(&self, keep: &HashSet<MediaId>) -> Vec<MediaId> {
        let evicted = self.cache.tidy(keep);
        if !evicted.is_empty() {
            info!(kind = %self.cache.kind(), count = evicted.len(), "Evicted unreferenced records");
            self.emit(CoreEvent::Cache(CacheEvent::RecordsEvicted {
                media_kind: self.cache.kind().to_string(),
                count: evicted.len() as u64,
            }));
        }
        evicted
    }

    /// Records and confirmed watermark, ready to persist.
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot::capture(&self.cache, &self.update_clock)
    }

    /// Validate and merge a fetched record as a full fetch.
    fn accept(&self, requested: MediaId, mut record: CachedMediaRecord) -> Result<()> {
        if record.kind != self.cache.kind() {
            return Err(SyncError::Consistency {
                id: requested,
                message: format!(
                    "expected a {} record, provider returned a {}",
                    self.cache.kind(),
                    record.kind
                ),
            });
        }
        if record.id != requested {
            return Err(SyncError::Consistency {
                id: requested,
                message: format!("provider returned record {}", record.id),
            });
        }

        record.is_placeholder = false;
        record.is_search_result_only = false;
        record.dirty = false;
        self.cache.merge(record)?;
        Ok(())
    }

    fn fail(&self, run_id: &str, error: impl Into<SyncError>) -> SyncError {
        let error = error.into();
        warn!(error = %error, retryable = error.is_retryable(), "Sync failed");
        self.emit(CoreEvent::Sync(SyncEvent::Failed {
            run_id: run_id.to_string(),
            message: error.to_string(),
            recoverable: error.is_retryable(),
        }));
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChangedIds, ProviderError, ProviderResult};
    use async_trait::async_trait;
    use bridge_traits::time::ManualClock;
    use core_library::MediaKind;
    use mockall::mock;
    use mockall::predicate::eq;

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

    const NOW: i64 = 1_700_000_000;

    fn provider() -> MockProvider {
        let mut provider = MockProvider::new();
        provider.expect_name().return_const("mock");
        provider.expect_kind().return_const(MediaKind::Series);
        provider
    }

    fn engine(provider: MockProvider, clock: UpdateClock) -> SyncEngine<MockProvider> {
        SyncEngine::new(
            Arc::new(provider),
            Arc::new(MediaCache::new(MediaKind::Series)),
            clock,
            Arc::new(ManualClock::new(NOW)),
        )
    }

    fn full(id: i64, name: &str) -> CachedMediaRecord {
        CachedMediaRecord::full(MediaId(id), MediaKind::Series, name)
    }

    #[tokio::test]
    async fn test_first_sync_marks_everything_without_provider_call() {
        let mut provider = provider();
        provider.expect_fetch_changed_ids().never();

        let mut engine = engine(provider, UpdateClock::new());
        engine.cache().merge(full(1, "Lost")).unwrap();

        let outcome = engine
            .synchronize(&[MediaId(1), MediaId(2)], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, SyncStatus::FullRefreshScheduled);
        assert_eq!(outcome.placeholders_added, 1);
        assert_eq!(outcome.marked_dirty, 2);
        assert_eq!(engine.update_clock().proposed_time(), NOW);
        assert_eq!(engine.update_clock().last_confirmed_time(), NEVER_SYNCED);
    }

    #[tokio::test]
    async fn test_incremental_marks_cached_changed_ids() {
        let mut provider = provider();
        provider
            .expect_fetch_changed_ids()
            .with(eq(500))
            .times(1)
            .returning(|_| {
                Ok(ChangedIds::new(
                    vec![MediaId(1), MediaId(1), MediaId(99)],
                    900,
                ))
            });

        let mut engine = engine(provider, UpdateClock::from_confirmed(500));
        engine.cache().merge(full(1, "Lost")).unwrap();
        engine.cache().merge(full(2, "Fringe")).unwrap();

        let outcome = engine
            .synchronize(&[MediaId(1), MediaId(2)], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, SyncStatus::Incremental);
        assert_eq!(outcome.changed_ids, 2);
        assert_eq!(outcome.marked_dirty, 1);
        assert_eq!(engine.cache().dirty_ids(), vec![MediaId(1)]);
        assert!(!engine.cache().contains(MediaId(99)));
        assert_eq!(engine.update_clock().proposed_time(), 900);
        assert_eq!(engine.update_clock().begin_sync(), 500);
    }

    #[tokio::test]
    async fn test_connectivity_failure_leaves_clock_untouched() {
        let mut provider = provider();
        provider
            .expect_fetch_changed_ids()
            .returning(|_| Err(ProviderError::Connectivity("connection reset".into())));

        let clock = UpdateClock::from_confirmed(500);
        let mut engine = engine(provider, clock);

        let err = engine
            .synchronize(&[], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(*engine.update_clock(), clock);
    }

    #[tokio::test]
    async fn test_search_results_promoted_to_dirty() {
        let mut provider = provider();
        provider
            .expect_fetch_changed_ids()
            .returning(|_| Ok(ChangedIds::new(Vec::new(), 600)));

        let mut engine = engine(provider, UpdateClock::from_confirmed(500));
        engine
            .cache()
            .merge(CachedMediaRecord::search_result(
                MediaId(5),
                MediaKind::Series,
                "Dark",
            ))
            .unwrap();

        let outcome = engine
            .synchronize(&[], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.search_results_promoted, 1);
        assert_eq!(engine.cache().dirty_ids(), vec![MediaId(5)]);
    }

    #[tokio::test]
    async fn test_refresh_collects_failures_and_continues() {
        let mut provider = provider();
        provider.expect_fetch_by_id().returning(|id| match id.0 {
            1 => Ok(full(1, "Lost").with_server_last_updated(800)),
            2 => Err(ProviderError::NotFound(id)),
            3 => Ok(CachedMediaRecord::full(id, MediaKind::Movie, "Heat")),
            _ => Ok(full(42, "Wrong id")),
        });

        let mut engine = engine(provider, UpdateClock::from_confirmed(500));
        for id in 1..=4 {
            engine.cache().upsert_placeholder(MediaId(id));
        }

        let outcome = engine.refresh_dirty(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.requested, 4);
        assert_eq!(outcome.refreshed, 1);
        assert_eq!(outcome.failures.len(), 3);
        assert!(outcome.completed);
        assert_eq!(outcome.not_found().collect::<Vec<_>>(), vec![MediaId(2)]);

        let lost = engine.cache().get(MediaId(1)).unwrap();
        assert!(!lost.dirty);
        assert_eq!(lost.name, "Lost");
        assert!(engine.cache().get(MediaId(2)).unwrap().is_placeholder);
        assert_eq!(
            engine.cache().dirty_ids(),
            vec![MediaId(2), MediaId(3), MediaId(4)]
        );
    }

    #[tokio::test]
    async fn test_refresh_connectivity_aborts() {
        let mut provider = provider();
        provider
            .expect_fetch_by_id()
            .returning(|_| Err(ProviderError::Connectivity("timeout".into())));

        let mut engine = engine(provider, UpdateClock::from_confirmed(500));
        engine.cache().upsert_placeholder(MediaId(1));

        let err = engine
            .refresh_dirty(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Connectivity(_)));
    }

    #[tokio::test]
    async fn test_refresh_batch_limit_is_not_completed() {
        let mut provider = provider();
        provider
            .expect_fetch_by_id()
            .times(2)
            .returning(|id| Ok(full(id.0, "Show")));

        let mut engine =
            engine(provider, UpdateClock::from_confirmed(500)).with_refresh_batch_limit(Some(2));
        for id in 1..=3 {
            engine.cache().upsert_placeholder(MediaId(id));
        }

        let outcome = engine.refresh_dirty(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.refreshed, 2);
        assert!(!outcome.completed);
        assert_eq!(engine.cache().dirty_ids(), vec![MediaId(3)]);
    }

    #[tokio::test]
    async fn test_commit_emits_event() {
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let mut engine = engine(provider(), UpdateClock::new()).with_events(events);

        engine
            .synchronize(&[MediaId(1)], &CancellationToken::new())
            .await
            .unwrap();
        engine.commit();

        assert_eq!(engine.update_clock().last_confirmed_time(), NOW);
        let mut committed = None;
        while let Ok(event) = rx.try_recv() {
            if let CoreEvent::Sync(SyncEvent::Committed { watermark, .. }) = event {
                committed = Some(watermark);
            }
        }
        assert_eq!(committed, Some(NOW));
    }

    #[tokio::test]
    async fn test_search_never_downgrades_full_record() {
        let mut provider = provider();
        provider.expect_search().with(eq("lost")).returning(|_| {
            Ok(vec![
                CachedMediaRecord::search_result(MediaId(1), MediaKind::Series, "Lost (2004)"),
                CachedMediaRecord::search_result(MediaId(8), MediaKind::Series, "Lost Girl"),
                CachedMediaRecord::search_result(MediaId(9), MediaKind::Movie, "Lost Highway"),
            ])
        });

        let engine = engine(provider, UpdateClock::new());
        engine.cache().merge(full(1, "Lost")).unwrap();

        let hits = engine.search("lost").await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(engine.cache().get(MediaId(1)).unwrap().name, "Lost");
        assert!(engine.cache().get(MediaId(8)).unwrap().is_search_result_only);
        assert!(!engine.cache().contains(MediaId(9)));
    }

    #[tokio::test]
    async fn test_ensure_updated_inserts_absent_record() {
        let mut provider = provider();
        provider
            .expect_fetch_by_id()
            .with(eq(MediaId(7)))
            .returning(|id| Ok(full(id.0, "The Wire")));

        let engine = engine(provider, UpdateClock::new());
        let record = engine.ensure_updated(MediaId(7)).await.unwrap();

        assert_eq!(record.name, "The Wire");
        assert!(!record.dirty);
        assert_eq!(engine.lookup_by_name("wire", None).unwrap().id, MediaId(7));
    }

    #[tokio::test]
    async fn test_forget_everything_resets_clock() {
        let mut engine = engine(provider(), UpdateClock::from_confirmed(500));
        engine.cache().merge(full(1, "Lost")).unwrap();

        assert_eq!(engine.forget_everything(), 1);
        assert!(engine.cache().is_empty());
        assert!(!engine.update_clock().has_synced());
        assert_eq!(engine.snapshot().last_confirmed, NEVER_SYNCED);
    }

    #[tokio::test]
    async fn test_tidy_evicts_and_reports() {
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let engine = engine(provider(), UpdateClock::new()).with_events(events);
        engine.cache().merge(full(1, "Lost")).unwrap();
        engine.cache().merge(full(2, "Fringe")).unwrap();

        let keep: HashSet<MediaId> = [MediaId(1)].into_iter().collect();
        assert_eq!(engine.tidy(&keep), vec![MediaId(2)]);
        assert!(matches!(
            rx.try_recv(),
            Ok(CoreEvent::Cache(CacheEvent::RecordsEvicted { count: 1, .. }))
        ));
    }
}
