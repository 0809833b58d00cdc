//! Two-phase sync watermark
//!
//! [`UpdateClock`] separates what the provider has told us (`proposed`) from
//! what has been durably applied (`last_confirmed`). Only [`UpdateClock::commit`]
//! moves the durable watermark, so an interrupted sync retries from the old
//! value instead of skipping changes.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Epoch value meaning "never synchronized".
pub const NEVER_SYNCED: i64 = 0;

/// Last-confirmed and proposed synchronization timestamps (Unix seconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateClock {
    last_confirmed: i64,
    proposed: i64,
}

impl UpdateClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a persisted watermark. Nothing is pending afterwards.
    pub fn from_confirmed(epoch: i64) -> Self {
        let epoch = epoch.max(NEVER_SYNCED);
        Self {
            last_confirmed: epoch,
            proposed: epoch,
        }
    }

    pub fn last_confirmed_time(&self) -> i64 {
        self.last_confirmed
    }

    pub fn proposed_time(&self) -> i64 {
        self.proposed
    }

    /// The "since" value for the provider's changed-ids query.
    pub fn begin_sync(&self) -> i64 {
        self.last_confirmed
    }

    /// Ratchet `proposed` forward to `candidate`. Older values are ignored.
    pub fn register_server_time(&mut self, candidate: i64) {
        if candidate > self.proposed {
            self.proposed = candidate;
        }
    }

    /// Make the proposed watermark durable.
    pub fn commit(&mut self) {
        self.last_confirmed = self.proposed;
    }

    /// Forget all sync history; the next sync is a full refresh.
    pub fn reset(&mut self) {
        self.last_confirmed = NEVER_SYNCED;
        self.proposed = NEVER_SYNCED;
    }

    pub fn has_synced(&self) -> bool {
        self.last_confirmed != NEVER_SYNCED
    }

    /// Whether a server time has been registered but not yet committed.
    pub fn has_pending(&self) -> bool {
        self.proposed > self.last_confirmed
    }

    /// `last_confirmed` as a UTC timestamp, for logs.
    pub fn last_confirmed_at(&self) -> Option<DateTime<Utc>> {
        if !self.has_synced() {
            return None;
        }
        Utc.timestamp_opt(self.last_confirmed, 0).single()
    }
}
