//! Background worker
//!
//! Owns both sync engines and the reconciler. Requests arrive over an
//! `mpsc` channel and are handled one at a time, so a sync never overlaps a
//! scan of the same cache.

use core_library::{CachedMediaRecord, JsonSnapshotStore, MediaId, MediaKind, SnapshotStore};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use core_scan::{Library, Reconciler, ScanOutcome, ScanSelection};
use core_sync::{MetadataProvider, RefreshOutcome, SyncEngine, SyncOutcome};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;

/// Result of [`CoreService::synchronize`](crate::CoreService::synchronize)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub kind: MediaKind,
    pub sync: SyncOutcome,
    /// `None` when the run was cancelled before refreshing
    pub refresh: Option<RefreshOutcome>,
    /// The watermark advanced
    pub committed: bool,
}

impl SyncReport {
    pub fn is_cancelled(&self) -> bool {
        !self.committed
            && (self.sync.is_cancelled() || self.refresh.as_ref().is_some_and(|r| !r.completed))
    }
}

pub(crate) enum Request {
    Synchronize {
        kind: MediaKind,
        tracked_ids: Vec<MediaId>,
        reply: oneshot::Sender<Result<SyncReport>>,
    },
    Scan {
        library: Library,
        selection: ScanSelection,
        reply: oneshot::Sender<ScanOutcome>,
    },
    Search {
        kind: MediaKind,
        text: String,
        reply: oneshot::Sender<Result<Vec<CachedMediaRecord>>>,
    },
    ForgetEverything {
        kind: MediaKind,
        reply: oneshot::Sender<Result<usize>>,
    },
    Tidy {
        kind: MediaKind,
        keep: HashSet<MediaId>,
        reply: oneshot::Sender<Result<Vec<MediaId>>>,
    },
    Shutdown {
        reply: oneshot::Sender<Result<()>>,
    },
}

/// One cache with its engine and snapshot file
pub(crate) struct CacheSlot {
    pub engine: SyncEngine<dyn MetadataProvider>,
    pub store: JsonSnapshotStore,
}

pub(crate) struct Worker {
    pub movies: CacheSlot,
    pub series: CacheSlot,
    pub reconciler: Reconciler,
    pub cancel: Arc<Mutex<CancellationToken>>,
    pub events: EventBus,
    pub snapshot_after_commit: bool,
}

impl Worker {
    pub async fn run(mut self, mut requests: mpsc::Receiver<Request>) {
        info!("Core worker started");

        while let Some(request) = requests.recv().await {
            match request {
                Request::Synchronize {
                    kind,
                    tracked_ids,
                    reply,
                } => {
                    let result = self.synchronize(kind, &tracked_ids).await;
                    reply.send(result).ok();
                }
                Request::Scan {
                    library,
                    selection,
                    reply,
                } => {
                    let cancel = self.current_token();
                    let outcome = self.reconciler.scan(&library, &selection, &cancel).await;
                    self.reset_if_cancelled(&cancel);
                    reply.send(outcome).ok();
                }
                Request::Search { kind, text, reply } => {
                    let result = self.slot(kind).engine.search(&text).await;
                    reply.send(result.map_err(Into::into)).ok();
                }
                Request::ForgetEverything { kind, reply } => {
                    let removed = self.slot_mut(kind).engine.forget_everything();
                    let result = self.save_snapshot(kind).await.map(|_| removed);
                    reply.send(result).ok();
                }
                Request::Tidy { kind, keep, reply } => {
                    let evicted = self.slot(kind).engine.tidy(&keep);
                    let result = if evicted.is_empty() {
                        Ok(evicted)
                    } else {
                        self.save_snapshot(kind).await.map(|_| evicted)
                    };
                    reply.send(result).ok();
                }
                Request::Shutdown { reply } => {
                    let result = self.persist_all().await;
                    reply.send(result).ok();
                    break;
                }
            }
        }

        info!("Core worker stopped");
    }

    fn slot(&self, kind: MediaKind) -> &CacheSlot {
        match kind {
            MediaKind::Movie => &self.movies,
            MediaKind::Series => &self.series,
        }
    }

    fn slot_mut(&mut self, kind: MediaKind) -> &mut CacheSlot {
        match kind {
            MediaKind::Movie => &mut self.movies,
            MediaKind::Series => &mut self.series,
        }
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel.lock().clone()
    }

    /// A cancelled token stays cancelled; give the next request a fresh one.
    fn reset_if_cancelled(&self, used: &CancellationToken) {
        if used.is_cancelled() {
            let mut current = self.cancel.lock();
            if current.is_cancelled() {
                *current = CancellationToken::new();
                debug!("Cancellation token replaced");
            }
        }
    }

    /// Sync, refresh, then commit and persist when every dirty record was
    /// accounted for.
    #[instrument(skip(self, tracked_ids), fields(tracked = tracked_ids.len()))]
    async fn synchronize(&mut self, kind: MediaKind, tracked_ids: &[MediaId]) -> Result<SyncReport> {
        let cancel = self.current_token();
        let result = self.run_sync(kind, tracked_ids, &cancel).await;
        self.reset_if_cancelled(&cancel);
        result
    }

    async fn run_sync(
        &mut self,
        kind: MediaKind,
        tracked_ids: &[MediaId],
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let engine = &mut self.slot_mut(kind).engine;

        let sync = engine.synchronize(tracked_ids, cancel).await?;
        if sync.is_cancelled() {
            return Ok(SyncReport {
                kind,
                sync,
                refresh: None,
                committed: false,
            });
        }

        let refresh = engine.refresh_dirty(cancel).await?;
        let committed = refresh.completed;
        if committed {
            engine.commit();
            if self.snapshot_after_commit {
                self.save_snapshot(kind).await?;
            }
        } else {
            info!(
                refreshed = refresh.refreshed,
                requested = refresh.requested,
                "Refresh incomplete, watermark kept"
            );
        }

        Ok(SyncReport {
            kind,
            sync,
            refresh: Some(refresh),
            committed,
        })
    }

    #[instrument(skip(self))]
    async fn save_snapshot(&self, kind: MediaKind) -> Result<()> {
        let slot = self.slot(kind);
        let snapshot = slot.engine.snapshot();
        let records = snapshot.records.len();
        slot.store.save_snapshot(&snapshot).await?;

        self.events
            .emit(CoreEvent::Cache(CacheEvent::SnapshotSaved {
                media_kind: kind.to_string(),
                records: records as u64,
            }))
            .ok();
        Ok(())
    }

    async fn persist_all(&self) -> Result<()> {
        let movies = self.save_snapshot(MediaKind::Movie).await;
        let series = self.save_snapshot(MediaKind::Series).await;
        if let Err(e) = &movies {
            warn!(error = %e, "Failed to save movie snapshot on shutdown");
        }
        if let Err(e) = &series {
            warn!(error = %e, "Failed to save series snapshot on shutdown");
        }
        movies.and(series)
    }
}
