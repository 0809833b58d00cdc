//! # Metadata Sync
//!
//! Keeps a [`MediaCache`](core_library::MediaCache) in step with a remote
//! catalog.
//!
//! ## Overview
//!
//! - **Provider capability** (`provider`): [`MetadataProvider`] with fetch by
//!   id, changed ids since a watermark, and search
//! - **Sync engine** (`engine`): [`SyncEngine`] marks changed records dirty,
//!   refreshes them and commits the watermark
//! - **Outcomes** (`outcome`): per-run summaries and per-id failures
//!
//! Connectivity failures are retryable and never move the watermark.
//! Consistency and not-found failures are per id and reported after the pass.

pub mod engine;
pub mod error;
pub mod outcome;
pub mod provider;

pub use engine::SyncEngine;
pub use error::{Result, SyncError};
pub use outcome::{FailureKind, RefreshOutcome, SyncFailure, SyncOutcome, SyncStatus};
pub use provider::{ChangedIds, MetadataProvider, ProviderError, ProviderResult};
