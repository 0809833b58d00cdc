use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("File index error: {0}")]
    FileIndex(#[from] BridgeError),

    #[error("Ignore list I/O failed at {path}: {source}")]
    IgnoreIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Ignore list at {path} is unreadable: {message}")]
    IgnoreFormat { path: String, message: String },

    #[error("Failed to write report to {path}: {source}")]
    ReportIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid file name pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
