//! [`ProcessSupervisor`] backed by the real operating system.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::{NodeCommand, POLL_INTERVAL, ProcessSupervisor, process_table};

/// Supervises processes of one node binary on the local machine.
#[derive(Clone, Debug)]
pub struct SystemSupervisor {
    binary_name: String,
}

impl SystemSupervisor {
    /// Creates a supervisor that recognises processes named `binary_name`.
    pub fn new(binary_name: impl Into<String>) -> Self {
        Self {
            binary_name: binary_name.into(),
        }
    }

    /// Creates a supervisor for the binary at `binary`, matching on its file name.
    #[must_use]
    pub fn for_binary(binary: &Path) -> Self {
        let name = binary
            .file_name()
            .map_or_else(|| binary.to_string_lossy(), |name| name.to_string_lossy());
        Self::new(name)
    }

    fn command(command: &NodeCommand) -> Command {
        let mut cmd = Command::new(&command.executable);
        cmd.args(&command.args);
        cmd
    }

    fn spawn_error(command: &NodeCommand, source: std::io::Error) -> Error {
        Error::Spawn {
            executable: command.executable.display().to_string(),
            source,
        }
    }

    fn background_stdio(log_file: Option<&PathBuf>) -> Result<(Stdio, Stdio)> {
        let Some(path) = log_file else {
            return Ok((Stdio::null(), Stdio::null()));
        };

        let stdout = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::Io("failed to open node log file", e))?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| Error::Io("failed to duplicate node log file", e))?;

        Ok((Stdio::from(stdout), Stdio::from(stderr)))
    }

    async fn blocking<T, F>(f: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| Error::ProcessTable(e.to_string()))
    }
}

#[async_trait]
impl ProcessSupervisor for SystemSupervisor {
    async fn find_managed_pid(&self, home_dir: &Path) -> Result<Option<u32>> {
        let binary_name = self.binary_name.clone();
        let home_dir = std::path::absolute(home_dir)
            .map_err(|e| Error::Io("failed to resolve home directory", e))?;

        let pid =
            Self::blocking(move || process_table::find_by_home(&binary_name, &home_dir)).await?;

        trace!("managed pid lookup for {}: {:?}", self.binary_name, pid);

        Ok(pid)
    }

    async fn run(&self, command: &NodeCommand) -> Result<()> {
        debug!("running: {}", command);

        let mut cmd = Self::command(command);
        cmd.stdin(if command.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| Self::spawn_error(command, e))?;

        if let (Some(input), Some(mut stdin)) = (&command.stdin, child.stdin.take()) {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| Error::Io("failed to write process stdin", e))?;
            stdin
                .write_all(b"\n")
                .await
                .map_err(|e| Error::Io("failed to write process stdin", e))?;
            // Dropping stdin closes the pipe.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::Io("failed to wait for process", e))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(target: "provenanced", "{}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!(target: "provenanced", "{}", line);
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::NonZeroExit {
                command: command.to_string(),
                status: output.status,
            })
        }
    }

    async fn start(&self, command: &NodeCommand, background: bool) -> Result<()> {
        let mut cmd = Self::command(command);

        if background {
            let (stdout, stderr) = Self::background_stdio(command.log_file.as_ref())?;
            cmd.stdin(Stdio::null()).stdout(stdout).stderr(stderr);
            // Own process group: terminal signals aimed at the caller do not reach the node.
            cmd.process_group(0);

            let mut child = cmd.spawn().map_err(|e| Self::spawn_error(command, e))?;
            info!("started {} in the background (pid {:?})", self.binary_name, child.id());

            // Reap the child if it exits while this runtime is still alive.
            tokio::spawn(async move {
                if let Ok(status) = child.wait().await {
                    debug!("background node exited with status: {}", status);
                }
            });

            return Ok(());
        }

        info!("starting {} in the foreground", self.binary_name);

        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Self::spawn_error(command, e))?;

        if status.success() {
            info!("{} exited with status: {}", self.binary_name, status);
            Ok(())
        } else {
            Err(Error::NonZeroExit {
                command: command.to_string(),
                status,
            })
        }
    }

    async fn await_ready(&self, host: &str, port: u16, timeout: Duration) -> bool {
        let poll = async {
            loop {
                if TcpStream::connect((host, port)).await.is_ok() {
                    return;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        let ready = tokio::time::timeout(timeout, poll).await.is_ok();
        debug!("port {}:{} ready: {}", host, port, ready);
        ready
    }

    async fn stop(&self, pid: u32, kill_tree: bool, signal: Signal) -> Result<()> {
        // Collect children before the parent goes away and they are reparented.
        let descendants = if kill_tree {
            Self::blocking(move || process_table::descendants(pid)).await?
        } else {
            Vec::new()
        };

        signal_tree(pid, &descendants, signal)
    }

    async fn await_exit(&self, pid: u32, timeout: Duration) -> Result<()> {
        let poll = async {
            loop {
                if !Self::blocking(move || process_table::is_running(pid)).await? {
                    return Ok::<_, Error>(());
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                what: format!("process {pid} to exit"),
                after: timeout,
            }),
        }
    }
}

/// Signals `pid`, then each of `descendants`.
///
/// Only a failure to signal `pid` is an error; descendants may already be gone.
fn signal_tree(pid: u32, descendants: &[u32], signal: Signal) -> Result<()> {
    let raw_pid = i32::try_from(pid).map_err(|_| Error::InvalidPid(pid))?;

    debug!("sending {} to {}", signal, pid);
    signal::kill(Pid::from_raw(raw_pid), signal).map_err(|source| Error::Signal { pid, source })?;

    for &child in descendants {
        let Ok(raw_child) = i32::try_from(child) else {
            debug!("skipping descendant with invalid pid {}", child);
            continue;
        };
        if let Err(e) = signal::kill(Pid::from_raw(raw_child), signal) {
            debug!("failed to signal descendant {}: {}", child, e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::TcpListener;

    use tempfile::tempdir;

    /// Shell that stays alive with a `--home` argument on its command line.
    fn fake_node(home: &Path) -> NodeCommand {
        NodeCommand::new(
            "sh",
            [
                "-c",
                "sleep 30; true",
                "sh",
                "--home",
                home.to_str().unwrap(),
            ],
        )
    }

    #[tokio::test]
    async fn test_await_ready_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let supervisor = SystemSupervisor::new("provenanced");

        assert!(
            supervisor
                .await_ready("127.0.0.1", port, Duration::from_secs(2))
                .await
        );
    }

    #[tokio::test]
    async fn test_await_ready_times_out() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let supervisor = SystemSupervisor::new("provenanced");

        assert!(
            !supervisor
                .await_ready("127.0.0.1", port, Duration::from_millis(600))
                .await
        );
    }

    #[tokio::test]
    async fn test_await_exit_times_out_for_live_process() {
        let supervisor = SystemSupervisor::new("provenanced");

        let result = supervisor
            .await_exit(std::process::id(), Duration::from_millis(600))
            .await;

        assert!(matches!(result, Err(Error::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_run_reports_non_zero_exit() {
        let supervisor = SystemSupervisor::new("sh");

        let ok = NodeCommand::new("sh", ["-c", "exit 0"]);
        assert!(supervisor.run(&ok).await.is_ok());

        let failing = NodeCommand::new("sh", ["-c", "exit 3"]);
        assert!(matches!(
            supervisor.run(&failing).await,
            Err(Error::NonZeroExit { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_pipes_stdin() {
        let supervisor = SystemSupervisor::new("sh");

        let command =
            NodeCommand::new("sh", ["-c", r#"read line; [ "$line" = "hello" ]"#]).with_stdin("hello");

        assert!(supervisor.run(&command).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let supervisor = SystemSupervisor::new("missing");
        let command = NodeCommand::new("/nonexistent/provenanced", ["start"]);

        assert!(matches!(
            supervisor.run(&command).await,
            Err(Error::Spawn { .. })
        ));
        assert!(matches!(
            supervisor.start(&command, true).await,
            Err(Error::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn test_signal_unknown_pid() {
        let supervisor = SystemSupervisor::new("provenanced");

        assert!(matches!(
            supervisor.stop(u32::MAX, false, Signal::SIGTERM).await,
            Err(Error::InvalidPid(_))
        ));
    }

    #[tokio::test]
    async fn test_background_lifecycle() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let home = tempdir().unwrap();
        let other_home = tempdir().unwrap();
        let supervisor = SystemSupervisor::new("sh");

        supervisor
            .start(&fake_node(home.path()), true)
            .await
            .unwrap();

        let mut pid = None;
        for _ in 0..20 {
            pid = supervisor.find_managed_pid(home.path()).await.unwrap();
            if pid.is_some() {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        let pid = pid.expect("background process not found");

        assert_eq!(
            supervisor.find_managed_pid(other_home.path()).await.unwrap(),
            None
        );

        supervisor.stop(pid, true, Signal::SIGTERM).await.unwrap();
        supervisor
            .await_exit(pid, Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(supervisor.find_managed_pid(home.path()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_relative_home_resolved_against_process_cwd() {
        let dir = tempdir().unwrap();
        let cwd = dir.path().canonicalize().unwrap();
        let supervisor = SystemSupervisor::new("sh");

        let mut child = Command::new("sh")
            .args(["-c", "sleep 30; true", "sh", "--home", ".localnet"])
            .current_dir(&cwd)
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let child_pid = child.id();

        let mut pid = None;
        for _ in 0..20 {
            pid = supervisor
                .find_managed_pid(&cwd.join(".localnet"))
                .await
                .unwrap();
            if pid.is_some() {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        assert_eq!(pid, child_pid);

        // Resolved against this process's working directory, which is elsewhere.
        assert_eq!(
            supervisor
                .find_managed_pid(Path::new(".localnet"))
                .await
                .unwrap(),
            None
        );

        child.kill().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_signals_descendants() {
        let home = tempdir().unwrap();
        let supervisor = SystemSupervisor::new("sh");
        let command = NodeCommand::new(
            "sh",
            [
                "-c",
                "sleep 30 & wait",
                "sh",
                "--home",
                home.path().to_str().unwrap(),
            ],
        );

        supervisor.start(&command, true).await.unwrap();

        let mut found = None;
        for _ in 0..20 {
            if let Some(pid) = supervisor.find_managed_pid(home.path()).await.unwrap() {
                let children = process_table::descendants(pid);
                if !children.is_empty() {
                    found = Some((pid, children));
                    break;
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        let (pid, children) = found.expect("node with a child process not found");

        supervisor.stop(pid, true, Signal::SIGTERM).await.unwrap();

        supervisor
            .await_exit(pid, Duration::from_secs(10))
            .await
            .unwrap();
        for child in children {
            supervisor
                .await_exit(child, Duration::from_secs(10))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_unreachable_descendants_do_not_fail_signal() {
        let mut sleeper = Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let sleeper_pid = sleeper.id().unwrap();

        let mut finished = Command::new("true").spawn().unwrap();
        let finished_pid = finished.id().unwrap();
        finished.wait().await.unwrap();

        let result = signal_tree(sleeper_pid, &[finished_pid, u32::MAX], Signal::SIGCONT);

        assert!(result.is_ok());

        sleeper.kill().await.unwrap();
    }

    #[tokio::test]
    async fn test_signal_failure_on_main_pid_is_reported() {
        let mut finished = Command::new("true").spawn().unwrap();
        let finished_pid = finished.id().unwrap();
        finished.wait().await.unwrap();

        assert!(matches!(
            signal_tree(finished_pid, &[], Signal::SIGCONT),
            Err(Error::Signal { .. })
        ));
    }
}
