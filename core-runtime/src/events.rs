//! # Event Bus System
//!
//! Typed progress and outcome notifications for hosts, carried over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: [`SyncEvent`], [`ScanEvent`] and [`CacheEvent`] wrapped in [`CoreEvent`]
//! - **EventBus**: broadcast channel shared by the sync engine, the reconciler and the service
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! Events are advisory. Emitting with no subscribers is not an error for the
//! emitter, so call sites discard the send result with `.ok()`.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, ScanEvent};
//!
//! let event_bus = EventBus::new(64);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Scan(ScanEvent::Started {
//!         pass_id: "pass-1".to_string(),
//!         shows: 12,
//!         full_scan: true,
//!     }))
//!     .ok();
//!
//! assert!(matches!(receiver.try_recv(), Ok(CoreEvent::Scan(_))));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError, error::SendError};

pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Incremental metadata synchronization
    Sync(SyncEvent),
    /// Reconciliation passes
    Scan(ScanEvent),
    /// Cache persistence and maintenance
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Scan(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Cache(CacheEvent::SnapshotDiscarded { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Cancelled { .. })
            | CoreEvent::Scan(ScanEvent::Cancelled { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. })
            | CoreEvent::Sync(SyncEvent::Committed { .. })
            | CoreEvent::Scan(ScanEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events emitted while mirroring provider metadata into a cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    Started {
        run_id: String,
        /// `movie` or `series`
        media_kind: String,
        provider: String,
        /// True when no watermark exists and every record will be refreshed
        full_refresh: bool,
    },
    Progress {
        run_id: String,
        /// e.g. "Marking changed records", "Refreshing dirty records"
        phase: String,
        processed: u64,
        total: Option<u64>,
    },
    Completed {
        run_id: String,
        marked_dirty: u64,
        refreshed: u64,
        failures: u64,
        duration_ms: u64,
    },
    Failed {
        run_id: String,
        message: String,
        /// Whether the next scheduled sync may succeed without intervention
        recoverable: bool,
    },
    Cancelled {
        run_id: String,
        processed: u64,
    },
    /// The watermark advanced; changes up to `watermark` are durably applied.
    Committed {
        media_kind: String,
        watermark: i64,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::Progress { .. } => "Sync in progress",
            SyncEvent::Completed { .. } => "Sync completed",
            SyncEvent::Failed { .. } => "Sync failed",
            SyncEvent::Cancelled { .. } => "Sync cancelled",
            SyncEvent::Committed { .. } => "Sync watermark committed",
        }
    }
}

// ============================================================================
// Scan Events
// ============================================================================

/// Events emitted by reconciliation passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ScanEvent {
    Started {
        pass_id: String,
        /// Shows and movies selected for the pass
        shows: u64,
        full_scan: bool,
    },
    /// One show or movie finished
    ShowChecked {
        pass_id: String,
        show_name: String,
        /// 1-based position within the pass
        index: u64,
        total: u64,
    },
    Completed {
        pass_id: String,
        actions: u64,
        missing: u64,
        issues: u64,
        duration_ms: u64,
    },
    Cancelled {
        pass_id: String,
        shows_scanned: u64,
        actions: u64,
    },
}

impl ScanEvent {
    fn description(&self) -> &str {
        match self {
            ScanEvent::Started { .. } => "Scan started",
            ScanEvent::ShowChecked { .. } => "Show checked",
            ScanEvent::Completed { .. } => "Scan completed",
            ScanEvent::Cancelled { .. } => "Scan cancelled",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events about cache persistence and pruning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    SnapshotLoaded {
        media_kind: String,
        records: u64,
        last_confirmed: i64,
    },
    SnapshotSaved {
        media_kind: String,
        records: u64,
    },
    /// The persisted snapshot was unreadable; the cache starts empty.
    SnapshotDiscarded {
        media_kind: String,
        reason: String,
    },
    RecordsEvicted {
        media_kind: String,
        count: u64,
    },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::SnapshotLoaded { .. } => "Cache snapshot loaded",
            CacheEvent::SnapshotSaved { .. } => "Cache snapshot saved",
            CacheEvent::SnapshotDiscarded { .. } => "Cache snapshot discarded",
            CacheEvent::RecordsEvicted { .. } => "Cache records evicted",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast bus for [`CoreEvent`]s.
///
/// Cloning the bus clones the sender; all clones publish to the same
/// subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// Subscribers falling more than `capacity` events behind receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers reached, or an error when there
    /// are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` that skips events failing a predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(16);
/// let scans_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Scan(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` when the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once every sender is gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns the next buffered matching event without waiting.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
