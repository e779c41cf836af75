//! In-memory [`ProcessSupervisor`] for testing orchestration without spawning
//! real processes.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use localnet_supervisor::{Error, NodeCommand, ProcessSupervisor, Result, Signal};
use tokio::sync::Mutex;
use tracing::debug;

const FIRST_PID: u32 = 4242;

#[derive(Debug, Default)]
struct State {
    commands: Vec<NodeCommand>,
    crash_on_start: bool,
    fail_on: Option<String>,
    ignore_signals: bool,
    never_ready: bool,
    next_pid: u32,
    running: HashMap<PathBuf, u32>,
    signals: Vec<(u32, Signal)>,
    started: Vec<(NodeCommand, bool)>,
}

/// Mock supervisor that simulates one node process per home directory.
///
/// Background starts register a fake pid under the command's `--home`
/// argument; stopping a pid removes it. Clones share state.
#[derive(Clone, Debug)]
pub struct MockSupervisor {
    state: Arc<Mutex<State>>,
}

impl Default for MockSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSupervisor {
    /// Creates a mock with nothing running.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_pid: FIRST_PID,
                ..State::default()
            })),
        }
    }

    /// Makes every `run` whose arguments contain `arg` exit non-zero.
    pub async fn fail_on(&self, arg: impl Into<String>) {
        self.state.lock().await.fail_on = Some(arg.into());
    }

    /// Makes background starts exit immediately instead of staying up.
    pub async fn crash_on_start(&self) {
        self.state.lock().await.crash_on_start = true;
    }

    /// Makes `await_ready` always report `false`.
    pub async fn never_ready(&self) {
        self.state.lock().await.never_ready = true;
    }

    /// Makes `stop` record signals without ending the process.
    pub async fn ignore_signals(&self) {
        self.state.lock().await.ignore_signals = true;
    }

    /// Simulates a node started outside this mock, returning its pid.
    pub async fn spawn_external(&self, home_dir: &Path) -> u32 {
        let mut state = self.state.lock().await;
        let pid = state.next_pid;
        state.next_pid += 1;
        state.running.insert(home_dir.to_path_buf(), pid);
        pid
    }

    /// Every command passed to `run`, in order.
    pub async fn commands(&self) -> Vec<NodeCommand> {
        self.state.lock().await.commands.clone()
    }

    /// Every command passed to `start` with its `background` flag, in order.
    pub async fn started(&self) -> Vec<(NodeCommand, bool)> {
        self.state.lock().await.started.clone()
    }

    /// Every signal sent, in order.
    pub async fn signals(&self) -> Vec<(u32, Signal)> {
        self.state.lock().await.signals.clone()
    }

    /// Clears the recorded commands, starts and signals.
    pub async fn clear_history(&self) {
        let mut state = self.state.lock().await;
        state.commands.clear();
        state.started.clear();
        state.signals.clear();
    }
}

fn home_of(command: &NodeCommand) -> Option<PathBuf> {
    command
        .args
        .iter()
        .position(|arg| arg == "--home")
        .and_then(|i| command.args.get(i + 1))
        .map(PathBuf::from)
}

fn failed(command: &NodeCommand) -> Error {
    Error::NonZeroExit {
        command: command.to_string(),
        status: ExitStatus::from_raw(1 << 8),
    }
}

#[async_trait]
impl ProcessSupervisor for MockSupervisor {
    async fn find_managed_pid(&self, home_dir: &Path) -> Result<Option<u32>> {
        Ok(self.state.lock().await.running.get(home_dir).copied())
    }

    async fn run(&self, command: &NodeCommand) -> Result<()> {
        let mut state = self.state.lock().await;
        state.commands.push(command.clone());

        debug!("mock run: {}", command);

        match &state.fail_on {
            Some(arg) if command.args.contains(arg) => Err(failed(command)),
            _ => Ok(()),
        }
    }

    async fn start(&self, command: &NodeCommand, background: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        state.started.push((command.clone(), background));

        if background && !state.crash_on_start {
            if let Some(home) = home_of(command) {
                let pid = state.next_pid;
                state.next_pid += 1;
                state.running.insert(home, pid);
            }
        }

        Ok(())
    }

    async fn await_ready(&self, _host: &str, _port: u16, _timeout: Duration) -> bool {
        !self.state.lock().await.never_ready
    }

    async fn stop(&self, pid: u32, _kill_tree: bool, signal: Signal) -> Result<()> {
        let mut state = self.state.lock().await;

        if !state.running.values().any(|&running| running == pid) {
            return Err(Error::Signal {
                pid,
                source: nix::Error::ESRCH,
            });
        }

        state.signals.push((pid, signal));

        if !state.ignore_signals {
            state.running.retain(|_, running| *running != pid);
        }

        Ok(())
    }

    async fn await_exit(&self, pid: u32, timeout: Duration) -> Result<()> {
        if self
            .state
            .lock()
            .await
            .running
            .values()
            .any(|&running| running == pid)
        {
            return Err(Error::Timeout {
                what: format!("process {pid} to exit"),
                after: timeout,
            });
        }

        Ok(())
    }
}
