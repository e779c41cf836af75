//! Locating, starting, stopping and awaiting the external node process.
//!
//! The node is identified by its binary name together with the `--home`
//! argument it was started with. A pid recorded elsewhere is only a hint and
//! is never trusted without a fresh look at the process table.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod command;
mod error;
mod process_table;
mod system;

pub use command::NodeCommand;
pub use error::{Error, Result};
pub use nix::sys::signal::Signal;
pub use system::SystemSupervisor;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

/// Interval between polls of the process table or a TCP port.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Process control used by the orchestrator.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync + 'static {
    /// Finds the live node process started with `--home home_dir`.
    async fn find_managed_pid(&self, home_dir: &Path) -> Result<Option<u32>>;

    /// Runs a command to completion. A non-zero exit is an error.
    async fn run(&self, command: &NodeCommand) -> Result<()>;

    /// Launches a long-running command.
    ///
    /// In the background the process is detached and survives the caller; the
    /// call returns once it is spawned. In the foreground the call returns when
    /// the process exits, failing on a non-zero status.
    async fn start(&self, command: &NodeCommand, background: bool) -> Result<()>;

    /// Polls until something accepts TCP connections on `host:port`.
    ///
    /// Returns `false` if `timeout` elapses first.
    async fn await_ready(&self, host: &str, port: u16, timeout: Duration) -> bool;

    /// Sends `signal` to `pid`, and with `kill_tree` to all of its descendants.
    ///
    /// Failing to signal a descendant is logged and ignored.
    async fn stop(&self, pid: u32, kill_tree: bool, signal: Signal) -> Result<()>;

    /// Polls until `pid` has left the process table.
    ///
    /// Fails with [`Error::Timeout`] if `timeout` elapses first.
    async fn await_exit(&self, pid: u32, timeout: Duration) -> Result<()>;
}
