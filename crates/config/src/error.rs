use std::path::PathBuf;

use thiserror::Error;

/// Result type for configuration handling.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Explicitly requested config file does not exist.
    #[error("unable to open config file '{0}'")]
    ConfigFileNotFound(PathBuf),

    /// A numeric field did not parse as an integer.
    #[error("invalid number for {field}: '{value}'")]
    InvalidNumber {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected input.
        value: String,
    },

    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// Config file is not valid JSON for the expected shape.
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    /// A root name was requested with the opposite restriction of an existing entry.
    #[error(
        "root name '{name}' is already configured as {}, cannot add it as {}",
        restriction(.existing),
        opposite_restriction(.existing)
    )]
    NameRestrictionConflict {
        /// The conflicting root name.
        name: String,
        /// Restriction of the entry already present.
        existing: bool,
    },

    /// Account count must be positive.
    #[error("account count must be greater than zero")]
    ZeroAccounts,
}

const fn restriction(restricted: &bool) -> &'static str {
    if *restricted { "restricted" } else { "unrestricted" }
}

const fn opposite_restriction(restricted: &bool) -> &'static str {
    restriction(&!*restricted)
}
