use thiserror::Error;

/// Result type for lifecycle state operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Lock file contents could not be decoded.
    #[error("corrupt lock file: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// State could not be encoded.
    #[error("serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}
