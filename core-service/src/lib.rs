//! # Core Service
//!
//! Host-facing facade over the media library core.
//!
//! ## Overview
//!
//! [`CoreService::start`] restores both cache snapshots, loads the ignore
//! list and spawns a background worker that owns the sync engines and the
//! reconciler. The returned handle is cheap to clone; every clone talks to
//! the same worker.
//!
//! Long-running work (sync, scan, search) is queued to the worker and runs
//! one request at a time. Reads of cached records go straight to the shared
//! caches and never wait for the worker.
//!
//! ## Usage
//!
//! ```ignore
//! let config = CoreConfig::builder().data_dir("/var/lib/medialib").build()?;
//! let core = CoreService::start(config, movie_provider, series_provider).await?;
//!
//! let report = core.synchronize(MediaKind::Series, &tracked_ids).await?;
//! let library = Library::from(tracked_shows).with_movie(TrackedMovie::new(heat_id, "/movies/Heat"));
//! let outcome = core.scan(&library, ScanSelection::All).await?;
//! core.shutdown().await?;
//! ```

pub mod error;
mod worker;

pub use error::{CoreError, Result};
pub use worker::SyncReport;

use core_library::{
    restore_cache, CachedMediaRecord, JsonSnapshotStore, MediaCache, MediaId, MediaKind,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use core_runtime::logging::strip_path;
use core_scan::{
    IgnoreRegistry, Library, Reconciler, ScanError, ScanOutcome, ScanSelection,
    SharedIgnoreRegistry,
};
use core_sync::{MetadataProvider, SyncEngine};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use worker::{CacheSlot, Request, Worker};

const REQUEST_QUEUE_SIZE: usize = 32;

/// Primary facade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    requests: mpsc::Sender<Request>,
    movies: Arc<MediaCache>,
    series: Arc<MediaCache>,
    ignore: SharedIgnoreRegistry,
    ignore_path: PathBuf,
    ignore_save: Arc<tokio::sync::Mutex<()>>,
    cancel: Arc<Mutex<CancellationToken>>,
    events: EventBus,
}

impl CoreService {
    /// Restore persisted state and start the background worker.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InitializationFailed`] when a provider serves the wrong kind
    /// - [`CoreError::Library`] when a snapshot exists but cannot be read
    /// - [`CoreError::Scan`] when the ignore list cannot be read
    ///
    /// Unreadable snapshot contents are not an error: the cache starts
    /// empty and the next sync is a full refresh.
    #[instrument(skip_all)]
    pub async fn start(
        config: CoreConfig,
        movie_provider: Arc<dyn MetadataProvider>,
        series_provider: Arc<dyn MetadataProvider>,
    ) -> Result<Self> {
        for (provider, expected) in [
            (&movie_provider, MediaKind::Movie),
            (&series_provider, MediaKind::Series),
        ] {
            if provider.kind() != expected {
                return Err(CoreError::InitializationFailed(format!(
                    "Provider '{}' serves {}, expected {}",
                    provider.name(),
                    provider.kind(),
                    expected
                )));
            }
        }

        let events = EventBus::new(config.event_capacity);

        let movies = restore_slot(&config, &events, MediaKind::Movie, "movies", movie_provider).await?;
        let series = restore_slot(&config, &events, MediaKind::Series, "series", series_provider).await?;

        let ignore_path = config.ignore_list_path();
        let registry = match IgnoreRegistry::load(&ignore_path).await {
            Ok(registry) => registry,
            Err(ScanError::IgnoreFormat { path, message }) => {
                warn!(file = %strip_path(&path), %message, "Ignore list unreadable, starting empty");
                IgnoreRegistry::new()
            }
            Err(e) => return Err(e.into()),
        };
        let ignore = Arc::new(RwLock::new(registry));

        let movie_cache = Arc::clone(movies.engine.cache());
        let series_cache = Arc::clone(series.engine.cache());

        let reconciler = Reconciler::new(
            Arc::clone(&series_cache),
            Arc::clone(&config.file_index),
            Arc::clone(&ignore),
            config.scan.clone(),
            &config.naming,
            Arc::clone(&config.clock),
            Some(events.clone()),
        )?
        .with_movie_cache(Arc::clone(&movie_cache));

        let cancel = Arc::new(Mutex::new(CancellationToken::new()));
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_SIZE);

        let worker = Worker {
            movies,
            series,
            reconciler,
            cancel: Arc::clone(&cancel),
            events: events.clone(),
            snapshot_after_commit: config.sync.snapshot_after_commit,
        };
        tokio::spawn(worker.run(rx));

        info!(
            data_dir = %strip_path(&config.data_dir.to_string_lossy()),
            movies = movie_cache.len(),
            series = series_cache.len(),
            "Core service started"
        );

        Ok(Self {
            requests: tx,
            movies: movie_cache,
            series: series_cache,
            ignore,
            ignore_path,
            ignore_save: Arc::new(tokio::sync::Mutex::new(())),
            cancel,
            events,
        })
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(build(reply))
            .await
            .map_err(|_| CoreError::ShutDown)?;
        response.await.map_err(|_| CoreError::ShutDown)
    }

    fn cache(&self, kind: MediaKind) -> &Arc<MediaCache> {
        match kind {
            MediaKind::Movie => &self.movies,
            MediaKind::Series => &self.series,
        }
    }

    /// Run sync, refresh and commit for one cache.
    ///
    /// The watermark only advances when every dirty record was handled; the
    /// snapshot is saved after the commit when configured.
    pub async fn synchronize(&self, kind: MediaKind, tracked_ids: &[MediaId]) -> Result<SyncReport> {
        let tracked_ids = tracked_ids.to_vec();
        self.request(|reply| Request::Synchronize {
            kind,
            tracked_ids,
            reply,
        })
        .await?
    }

    /// Reconcile the shows and movies of `library` against the file index.
    pub async fn scan(&self, library: &Library, selection: ScanSelection) -> Result<ScanOutcome> {
        let library = library.clone();
        self.request(|reply| Request::Scan {
            library,
            selection,
            reply,
        })
        .await
    }

    /// Cancel the running pass. Queued requests that start before the pass
    /// notices the cancellation are cancelled as well.
    pub fn cancel(&self) {
        info!("Cancellation requested");
        self.cancel.lock().cancel();
    }

    /// Ignore `path` in future scans and persist the list.
    ///
    /// Returns `false` when the path was already ignored or is empty.
    pub async fn ignore(&self, path: impl Into<String>) -> Result<bool> {
        let added = self.ignore.write().add(path);
        if added {
            self.save_ignore_list().await?;
        }
        Ok(added)
    }

    pub async fn unignore(&self, path: &str) -> Result<bool> {
        let removed = self.ignore.write().remove(path);
        if removed {
            self.save_ignore_list().await?;
        }
        Ok(removed)
    }

    pub fn ignored_paths(&self) -> Vec<String> {
        self.ignore.read().iter().map(str::to_string).collect()
    }

    async fn save_ignore_list(&self) -> Result<()> {
        let _serialized = self.ignore_save.lock().await;
        let registry = self.ignore.read().clone();
        registry.save(&self.ignore_path).await?;
        Ok(())
    }

    pub fn movie_record(&self, id: MediaId) -> Option<CachedMediaRecord> {
        self.movies.get(id)
    }

    pub fn series_record(&self, id: MediaId) -> Option<CachedMediaRecord> {
        self.series.get(id)
    }

    /// Best cached match for a user-typed name.
    pub fn find_by_name(&self, kind: MediaKind, hint: &str, year: Option<i32>) -> Option<CachedMediaRecord> {
        self.cache(kind).find_by_name(hint, year)
    }

    /// Dirty records waiting for the next refresh.
    pub fn pending_updates(&self, kind: MediaKind) -> usize {
        self.cache(kind).pending_update_count()
    }

    pub async fn search(&self, kind: MediaKind, text: &str) -> Result<Vec<CachedMediaRecord>> {
        let text = text.to_string();
        self.request(|reply| Request::Search { kind, text, reply })
            .await?
    }

    /// Drop every record of `kind` and its watermark.
    pub async fn forget_everything(&self, kind: MediaKind) -> Result<usize> {
        self.request(|reply| Request::ForgetEverything { kind, reply })
            .await?
    }

    /// Evict records of `kind` not in `keep`.
    pub async fn tidy(&self, kind: MediaKind, keep: HashSet<MediaId>) -> Result<Vec<MediaId>> {
        self.request(|reply| Request::Tidy { kind, keep, reply })
            .await?
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Persist both caches and stop the worker.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Request::Shutdown { reply }).await?
    }
}

async fn restore_slot(
    config: &CoreConfig,
    events: &EventBus,
    kind: MediaKind,
    name: &str,
    provider: Arc<dyn MetadataProvider>,
) -> Result<CacheSlot> {
    let cache = Arc::new(MediaCache::new(kind));
    let store = JsonSnapshotStore::new(config.snapshot_path(name), kind);
    let restored = restore_cache(&store, &cache).await?;

    let event = match &restored.discarded {
        Some(reason) => CacheEvent::SnapshotDiscarded {
            media_kind: kind.to_string(),
            reason: reason.clone(),
        },
        None => CacheEvent::SnapshotLoaded {
            media_kind: kind.to_string(),
            records: restored.records as u64,
            last_confirmed: restored.clock.last_confirmed_time(),
        },
    };
    events.emit(CoreEvent::Cache(event)).ok();

    let engine = SyncEngine::new(provider, cache, restored.clock, Arc::clone(&config.clock))
        .with_events(events.clone())
        .with_refresh_batch_limit(config.sync.refresh_batch_limit);

    Ok(CacheSlot { engine, store })
}
