use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    /// The background worker stopped; the handle can no longer be used
    #[error("Core service has shut down")]
    ShutDown,

    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Scan error: {0}")]
    Scan(#[from] core_scan::ScanError),
}

impl CoreError {
    /// Whether a later attempt may succeed without user action.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Sync(e) => e.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
