use thiserror::Error;

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating the node.
#[derive(Debug, Error)]
pub enum Error {
    /// A managed node is already running for the home directory.
    #[error("the node is already running (pid {0}); use --force to restart it")]
    AlreadyRunning(u32),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] localnet_config::Error),

    /// Requested configuration differs from the one genesis was built from.
    #[error(
        "configuration does not match the already initialized blockchain data; reset the blockchain data first"
    )]
    ConfigMismatch,

    /// Genesis planning error.
    #[error(transparent)]
    Genesis(#[from] localnet_genesis::Error),

    /// IO error.
    #[error("io error: {0} - {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// Key derivation error.
    #[error(transparent)]
    Keys(#[from] localnet_keys::Error),

    /// Lock file error.
    #[error(transparent)]
    LockFile(#[from] localnet_lock_file::Error),

    /// No managed node is running.
    #[error("the node is not running")]
    NotRunning,

    /// Reset was requested while a managed node is running.
    #[error("cannot reset while the node is running (pid {0}); stop it first")]
    ResetWhileRunning(u32),

    /// The node did not come up after being started.
    #[error("failed to start the node: {0}")]
    StartFailed(String),

    /// Process supervision error.
    #[error(transparent)]
    Supervisor(#[from] localnet_supervisor::Error),
}
