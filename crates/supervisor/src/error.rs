//! Error types for process supervision.

use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Result type for supervisor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while supervising node processes.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error.
    #[error("io error: {0} - {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// Pid does not fit the platform's pid type.
    #[error("invalid pid {0}")]
    InvalidPid(u32),

    /// Process exited with non-zero status.
    #[error("`{command}` exited with non-zero status: {status}")]
    NonZeroExit {
        /// The command that failed.
        command: String,
        /// Its exit status.
        status: ExitStatus,
    },

    /// Process table scan task failed.
    #[error("process table scan failed: {0}")]
    ProcessTable(String),

    /// Failed to signal a process.
    #[error("failed to signal process {pid}: {source}")]
    Signal {
        /// Target pid.
        pid: u32,
        /// Underlying errno.
        #[source]
        source: nix::Error,
    },

    /// Failed to spawn a process.
    #[error("failed to spawn '{executable}': {source}")]
    Spawn {
        /// Executable that could not be started.
        executable: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A wait did not finish within its budget.
    #[error("timed out after {after:?} waiting for {what}")]
    Timeout {
        /// What was being waited for.
        what: String,
        /// Budget that elapsed.
        after: Duration,
    },
}
