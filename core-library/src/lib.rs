//! # Library Cache Module
//!
//! Owns the local mirror of provider metadata.
//!
//! ## Overview
//!
//! This module manages:
//! - Cached movie and series records with trust tiers and dirty tracking
//! - A thread-safe cache per media kind ([`MediaCache`])
//! - The two-phase sync watermark ([`UpdateClock`])
//! - Snapshot persistence ([`SnapshotStore`], [`JsonSnapshotStore`])

pub mod cache;
pub mod clock;
pub mod error;
pub mod models;
pub mod snapshot;

pub use cache::{MediaCache, MergeOutcome};
pub use clock::{UpdateClock, NEVER_SYNCED};
pub use error::{LibraryError, Result};
pub use models::{compare_name, CachedEpisode, CachedMediaRecord, MediaId, MediaKind, RecordTrust};
pub use snapshot::{restore_cache, CacheSnapshot, JsonSnapshotStore, RestoreOutcome, SnapshotStore};
