use core_library::{LibraryError, MediaId};
use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Provider unreachable; retry on the next scheduled sync.
    #[error("Provider unreachable: {0}")]
    Connectivity(String),

    #[error("Provider returned inconsistent data for {id}: {message}")]
    Consistency { id: MediaId, message: String },

    #[error("Provider no longer has {0}")]
    NotFound(MediaId),

    #[error("Cache error: {0}")]
    Library(#[from] LibraryError),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Connectivity(_))
    }
}

impl From<ProviderError> for SyncError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Connectivity(message) => SyncError::Connectivity(message),
            ProviderError::Consistency { id, message } => SyncError::Consistency { id, message },
            ProviderError::NotFound(id) => SyncError::NotFound(id),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connectivity_is_retryable() {
        assert!(SyncError::Connectivity("timeout".into()).is_retryable());
        assert!(!SyncError::NotFound(MediaId(3)).is_retryable());
        assert!(!SyncError::from(ProviderError::Consistency {
            id: MediaId(3),
            message: "movie id on series provider".into(),
        })
        .is_retryable());
    }
}
