use crate::models::{MediaId, MediaKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    /// A record of the wrong media kind was offered to a cache
    #[error("Record {id} is a {actual}, cache holds {expected}")]
    KindMismatch {
        id: MediaId,
        expected: MediaKind,
        actual: MediaKind,
    },

    /// The persisted snapshot could not be decoded
    #[error("Malformed snapshot at {path}: {message}")]
    MalformedSnapshot { path: String, message: String },

    #[error("Snapshot IO error at {path}: {source}")]
    SnapshotIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl LibraryError {
    pub fn is_malformed_snapshot(&self) -> bool {
        matches!(self, LibraryError::MalformedSnapshot { .. })
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
