//! Error types for algomod

/// Result type alias using algomod's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for moderation operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input rejected before any stage ran
    #[error("validation error: {0}")]
    Validation(String),

    /// The inference backend did not answer within the configured deadline
    #[error("inference request timed out")]
    InferenceTimeout,

    /// The inference backend could not be reached or refused the request
    #[error("inference backend unavailable: {0}")]
    InferenceUnavailable(String),

    /// Model output did not match any known classification shape
    #[error("unparseable model output: {0}")]
    Parse(String),

    /// Configuration or rule-table errors (fatal at startup)
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new backend-unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::InferenceUnavailable(msg.into())
    }

    /// Create a new parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
