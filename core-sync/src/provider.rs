//! Remote catalog capability
//!
//! The engine only needs three calls from a provider. Transport, paging and
//! timeouts are the implementation's concern.

use async_trait::async_trait;
use core_library::{CachedMediaRecord, MediaId, MediaKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network failure or timeout
    #[error("Connectivity failure: {0}")]
    Connectivity(String),

    /// The provider answered with data that does not belong to the request
    #[error("Inconsistent data for {id}: {message}")]
    Consistency { id: MediaId, message: String },

    #[error("{0} not found")]
    NotFound(MediaId),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Answer to a changed-ids query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedIds {
    /// May contain duplicates and ids that are not cached
    pub ids: Vec<MediaId>,
    /// Server clock at the time of the answer (Unix seconds)
    pub server_time: i64,
}

impl ChangedIds {
    pub fn new(ids: Vec<MediaId>, server_time: i64) -> Self {
        Self { ids, server_time }
    }
}

/// Read access to one remote catalog for one kind of media.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short name for logs and events.
    fn name(&self) -> &'static str;

    fn kind(&self) -> MediaKind;

    /// Full detail fetch of one item.
    async fn fetch_by_id(&self, id: MediaId) -> ProviderResult<CachedMediaRecord>;

    /// Ids changed since `since` (Unix seconds).
    async fn fetch_changed_ids(&self, since: i64) -> ProviderResult<ChangedIds>;

    /// Free-text search. Hits carry listing-level detail only.
    async fn search(&self, text: &str) -> ProviderResult<Vec<CachedMediaRecord>>;
}
