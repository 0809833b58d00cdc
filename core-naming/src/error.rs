use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("Unknown token {{{token}}} in style \"{style}\"")]
    UnknownToken { token: String, style: String },

    #[error("Unbalanced bracket at position {position} in style \"{style}\"")]
    UnbalancedBracket { position: usize, style: String },

    #[error("No preset with index {0}")]
    UnknownPreset(usize),
}

pub type Result<T> = std::result::Result<T, NamingError>;
