//! Results reported by the sync engine

use core_library::MediaId;

/// How a [`synchronize`](crate::SyncEngine::synchronize) call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Changed ids were fetched and marked dirty
    Incremental,
    /// No previous sync: every record was marked dirty without asking the provider
    FullRefreshScheduled,
    /// Stopped early; the watermark must not be committed
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub run_id: String,
    pub status: SyncStatus,
    pub placeholders_added: usize,
    pub search_results_promoted: usize,
    /// Unique ids reported by the provider
    pub changed_ids: usize,
    pub marked_dirty: usize,
}

impl SyncOutcome {
    pub fn is_cancelled(&self) -> bool {
        self.status == SyncStatus::Cancelled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Wrong kind or id returned; the record stays dirty
    Consistency,
    /// The provider dropped the item; the caller decides whether to forget it
    NotFound,
}

/// One id that could not be refreshed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub id: MediaId,
    pub kind: FailureKind,
    pub message: String,
}

/// Result of [`refresh_dirty`](crate::SyncEngine::refresh_dirty)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub run_id: String,
    /// Dirty records when the pass started
    pub requested: usize,
    pub refreshed: usize,
    pub failures: Vec<SyncFailure>,
    /// Fetches that finished after cancellation and were thrown away
    pub discarded: usize,
    /// Every dirty record was accounted for; safe to commit
    pub completed: bool,
}

impl RefreshOutcome {
    pub fn not_found(&self) -> impl Iterator<Item = MediaId> + '_ {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::NotFound)
            .map(|f| f.id)
    }
}
