//! Lifecycle orchestration of a single local node: genesis provisioning,
//! idempotent restarts, and start/stop/reset against a managed home directory.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod error;
mod provisioning;
mod report;

pub use error::{Error, Result};
pub use provisioning::{CommandBuilder, HASH_DENOM, VALIDATOR_KEY};
pub use report::{AccountReport, StartReport};

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use localnet_config::Configuration;
use localnet_genesis::GenesisPlan;
use localnet_keys::{DEFAULT_ADDRESS_PREFIX, HdPath, KeyDeriver, generate_mnemonic};
use localnet_lock_file::LifecycleStore;
use localnet_supervisor::{ProcessSupervisor, Signal};
use tokio::fs;
use tracing::{debug, info, warn};

/// Default node binary name.
pub const DEFAULT_BINARY: &str = "provenanced";

/// Default interface the node listens on.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Default home directory, relative to the working directory.
pub const DEFAULT_HOME_DIR: &str = ".localnet";

/// Default budget for the gRPC port to open after a background start.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default budget for the node to exit after being signalled.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Log file of a background node, inside the home directory.
pub const NODE_LOG_FILE: &str = "node.log";

/// Keyring index all funded accounts derive under.
const ACCOUNT_KEYRING: u32 = 0;

/// Options for creating a new `NodeOrchestrator`.
#[derive(Clone, Debug)]
pub struct NodeOrchestratorOptions<S, P>
where
    S: LifecycleStore,
    P: ProcessSupervisor,
{
    /// Bech32 prefix of reported account addresses.
    pub address_prefix: String,

    /// Path or name of the node binary.
    pub binary: PathBuf,

    /// Interface the node's listeners are configured on.
    pub bind_address: String,

    /// Home directory of the node; also holds the lock file.
    pub home_dir: PathBuf,

    /// How long a background start waits for the gRPC port.
    pub ready_timeout: Duration,

    /// How long `stop` waits for the node to exit.
    pub stop_timeout: Duration,

    /// Lifecycle record of the home directory.
    pub store: S,

    /// Process control.
    pub supervisor: P,
}

impl<S, P> NodeOrchestratorOptions<S, P>
where
    S: LifecycleStore,
    P: ProcessSupervisor,
{
    /// Options with every default applied for `home_dir`.
    pub fn new(store: S, supervisor: P, home_dir: impl Into<PathBuf>) -> Self {
        Self {
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
            binary: PathBuf::from(DEFAULT_BINARY),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            home_dir: home_dir.into(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            store,
            supervisor,
        }
    }
}

/// Options for [`NodeOrchestrator::start`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StartOptions {
    /// Stop a running node and rebuild genesis from scratch.
    pub force: bool,

    /// Detach the node and wait for it to become ready.
    pub background: bool,
}

/// Drives one node home directory through its lifecycle.
pub struct NodeOrchestrator<S, P>
where
    S: LifecycleStore,
    P: ProcessSupervisor,
{
    address_prefix: String,
    bind_address: String,
    commands: CommandBuilder,
    home_dir: PathBuf,
    ready_timeout: Duration,
    stop_timeout: Duration,
    store: S,
    supervisor: P,
}

impl<S, P> NodeOrchestrator<S, P>
where
    S: LifecycleStore,
    P: ProcessSupervisor,
{
    /// Creates a new orchestrator.
    ///
    /// A relative `home_dir` is resolved against the current directory so
    /// that the `--home` passed to the node and process discovery agree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the current directory cannot be read.
    pub fn new(
        NodeOrchestratorOptions {
            address_prefix,
            binary,
            bind_address,
            home_dir,
            ready_timeout,
            stop_timeout,
            store,
            supervisor,
        }: NodeOrchestratorOptions<S, P>,
    ) -> Result<Self> {
        let home_dir = std::path::absolute(&home_dir)
            .map_err(|e| Error::Io("failed to resolve home directory", e))?;

        Ok(Self {
            address_prefix,
            bind_address,
            commands: CommandBuilder::new(binary, home_dir.clone()),
            home_dir,
            ready_timeout,
            stop_timeout,
            store,
            supervisor,
        })
    }

    /// Home directory under management.
    #[must_use]
    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    /// Ensures genesis exists for `config`, then starts the node.
    ///
    /// Equivalent to [`prepare`](Self::prepare) followed by
    /// [`launch`](Self::launch).
    ///
    /// # Errors
    ///
    /// See [`prepare`](Self::prepare) and [`launch`](Self::launch).
    pub async fn start(&self, config: Configuration, options: StartOptions) -> Result<StartReport> {
        let (config, mut report) = self.prepare(config, options.force).await?;
        report.pid = self.launch(&config, options.background).await?;

        Ok(report)
    }

    /// Everything `start` does before launching the node process.
    ///
    /// Fills in the mnemonic (the stored one when the directory is initialized,
    /// even under `force`), refuses to proceed while a managed node is running
    /// (stopping it first when `force` is set), and builds genesis if the home
    /// directory is uninitialized or `force` is set. An initialized directory is
    /// only reused when `config` equals the stored configuration exactly.
    ///
    /// Returns the configuration in effect, mnemonic included.
    ///
    /// A failing provisioning command aborts immediately and leaves the home
    /// directory partially initialized; it must be reset before retrying.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`], [`Error::ConfigMismatch`], or any
    /// configuration, key, lock-file, or supervisor error.
    pub async fn prepare(
        &self,
        mut config: Configuration,
        force: bool,
    ) -> Result<(Configuration, StartReport)> {
        config.validate()?;

        let state = self.store.load().await?;

        if config.mnemonic.is_none() {
            let stored = state
                .initialized_config()
                .and_then(|stored| stored.mnemonic.clone());

            config.mnemonic = Some(match stored {
                Some(mnemonic) => mnemonic,
                None => generate_mnemonic()?,
            });
        }
        let mnemonic = config.mnemonic.clone().unwrap_or_default();

        // Fails on a bad mnemonic before anything is touched.
        let deriver = KeyDeriver::from_mnemonic(&mnemonic, self.address_prefix.clone())?;

        if let Some(pid) = self.supervisor.find_managed_pid(&self.home_dir).await? {
            if !force {
                self.store.set_pid(Some(pid)).await?;
                return Err(Error::AlreadyRunning(pid));
            }

            info!("stopping running node (pid {}) before forced start", pid);
            self.stop_pid(pid).await?;
        }

        let plan = GenesisPlan::new(&config.total_supply()?, config.accounts)?;

        let genesis_created = if !state.initialized || force {
            if force {
                self.wipe_home().await?;
            }
            self.provision(&config, &plan, &mnemonic).await?;
            self.store.mark_initialized(config.clone()).await?;
            true
        } else {
            if state.initialized_config() != Some(&config) {
                return Err(Error::ConfigMismatch);
            }
            debug!("reusing genesis in {}", self.home_dir.display());
            false
        };

        let accounts = (0..config.accounts)
            .map(|index| {
                deriver
                    .derive(ACCOUNT_KEYRING, index)
                    .map(|identity| AccountReport {
                        index,
                        address: identity.address,
                        balance: plan.per_account_balance.clone(),
                    })
            })
            .collect::<localnet_keys::Result<Vec<_>>>()?;

        let report = StartReport {
            mnemonic,
            base_hd_path: HdPath::base_display(ACCOUNT_KEYRING),
            plan,
            accounts,
            genesis_created,
            pid: None,
        };

        Ok((config, report))
    }

    /// Starts the node process for a prepared home directory.
    ///
    /// In the background, waits for the gRPC port to open, then records the
    /// live pid and returns it. In the foreground, returns `None` once the node
    /// exits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StartFailed`] if a background node does not become ready
    /// or cannot be found afterwards, or a supervisor error if it cannot be
    /// spawned or exits unsuccessfully.
    pub async fn launch(&self, config: &Configuration, background: bool) -> Result<Option<u32>> {
        let mut command = self.commands.start();

        if !background {
            info!("starting node in the foreground");
            self.supervisor.start(&command, false).await?;
            return Ok(None);
        }

        command = command.with_log_file(self.home_dir.join(NODE_LOG_FILE));
        self.supervisor.start(&command, true).await?;

        let host = ready_host(&self.bind_address);
        let port = config.ports.grpc;
        if !self
            .supervisor
            .await_ready(&host, port, self.ready_timeout)
            .await
        {
            return Err(Error::StartFailed(format!(
                "gRPC port {host}:{port} did not open within {:?}",
                self.ready_timeout
            )));
        }

        let Some(pid) = self.supervisor.find_managed_pid(&self.home_dir).await? else {
            return Err(Error::StartFailed(
                "node process not found after start".to_string(),
            ));
        };

        self.store.set_pid(Some(pid)).await?;
        info!("node running in the background (pid {})", pid);

        Ok(Some(pid))
    }

    /// Stops the managed node and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRunning`] if no managed node is found, after clearing
    /// any stale pid, or a supervisor error if it cannot be signalled or does not
    /// exit in time.
    pub async fn stop(&self) -> Result<()> {
        let Some(pid) = self.supervisor.find_managed_pid(&self.home_dir).await? else {
            self.store.set_pid(None).await?;
            return Err(Error::NotRunning);
        };

        self.stop_pid(pid).await
    }

    /// Removes the home directory and with it all chain data and the lock file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResetWhileRunning`] if a managed node is running.
    pub async fn reset(&self) -> Result<()> {
        if let Some(pid) = self.supervisor.find_managed_pid(&self.home_dir).await? {
            return Err(Error::ResetWhileRunning(pid));
        }

        self.remove_home().await
    }

    /// [`stop`](Self::stop) followed by [`reset`](Self::reset).
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub async fn stop_and_reset(&self) -> Result<()> {
        self.stop().await?;
        self.reset().await
    }

    async fn stop_pid(&self, pid: u32) -> Result<()> {
        info!("stopping node (pid {})", pid);

        self.supervisor.stop(pid, true, Signal::SIGTERM).await?;
        self.supervisor.await_exit(pid, self.stop_timeout).await?;
        self.store.set_pid(None).await?;

        Ok(())
    }

    async fn provision(&self, config: &Configuration, plan: &GenesisPlan, mnemonic: &str) -> Result<()> {
        let commands = self
            .commands
            .genesis(config, plan, mnemonic, &self.bind_address)?;

        info!(
            "building genesis for {} with {} accounts",
            config.chain_id, config.accounts
        );

        for command in &commands {
            if let Err(e) = self.supervisor.run(command).await {
                warn!(
                    "genesis provisioning failed; reset {} before retrying",
                    self.home_dir.display()
                );
                return Err(e.into());
            }
        }

        Ok(())
    }

    async fn remove_home(&self) -> Result<()> {
        match fs::remove_dir_all(&self.home_dir).await {
            Ok(()) => {
                info!("removed {}", self.home_dir.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io("failed to remove home directory", e)),
        }
    }

    async fn wipe_home(&self) -> Result<()> {
        self.remove_home().await?;

        fs::create_dir_all(&self.home_dir)
            .await
            .map_err(|e| Error::Io("failed to create home directory", e))
    }
}

/// Host readiness is checked on; an unspecified bind address is reached via loopback.
fn ready_host(bind_address: &str) -> String {
    match bind_address.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) if ip.is_unspecified() => Ipv4Addr::LOCALHOST.to_string(),
        Ok(IpAddr::V6(ip)) if ip.is_unspecified() => Ipv6Addr::LOCALHOST.to_string(),
        _ => bind_address.to_string(),
    }
}
