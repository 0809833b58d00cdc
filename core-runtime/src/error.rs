use thiserror::Error;

/// Runtime setup errors. Raised at startup, never mid-pass.
#[derive(Error, Debug)]
pub enum Error {
    /// A setting failed validation or the logging stack could not be installed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host collaborator was not injected and has no default
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
