//! CLI binary to provision and run a local node.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use localnet_config::{
    ConfigOverrides, Configuration, DEFAULT_CONFIG_FILE, load_config_file, resolve,
};
use localnet_lock_file::LockFile;
use localnet_node::{
    DEFAULT_BIND_ADDRESS, DEFAULT_BINARY, DEFAULT_HOME_DIR, NodeOrchestrator,
    NodeOrchestratorOptions, StartOptions,
};
use localnet_supervisor::SystemSupervisor;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Node binary could not be located
    #[error("could not find provenanced on PATH; pass --provenanced: {0}")]
    BinaryNotFound(#[from] which::Error),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] localnet_config::Error),

    /// Home directory could not be resolved
    #[error("failed to resolve home directory {0}: {1}")]
    Home(PathBuf, #[source] std::io::Error),

    /// Orchestrator error
    #[error(transparent)]
    Node(#[from] localnet_node::Error),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    start: StartArgs,

    /// Node home directory; the lock file lives inside it
    #[arg(long, global = true, default_value = DEFAULT_HOME_DIR, env = "LOCALNET_HOME")]
    home: PathBuf,

    /// Path to the node binary [default: searched on PATH]
    #[arg(long, global = true, env = "LOCALNET_PROVENANCED")]
    provenanced: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Build genesis if needed and start the node (default)
    Start(StartArgs),

    /// Stop the running node
    Stop,

    /// Remove all node data
    Reset,

    /// Stop the running node, then remove all node data
    StopAndReset,
}

#[derive(Clone, Debug, Default, clap::Args)]
struct StartArgs {
    /// Configuration file [default: localnet.json if present]
    #[arg(long, env = "LOCALNET_CONFIG")]
    config: Option<PathBuf>,

    /// Stop a running node and rebuild genesis from scratch
    #[arg(long)]
    force: bool,

    /// Run the node in the background
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true",
        action = ArgAction::Set,
        env = "LOCALNET_BACKGROUND"
    )]
    background: bool,

    /// Mnemonic to derive accounts from [default: generated]
    #[arg(long, env = "LOCALNET_MNEMONIC")]
    mnemonic: Option<String>,

    /// Number of funded accounts
    #[arg(long, env = "LOCALNET_ACCOUNTS")]
    accounts: Option<String>,

    /// Extra restricted root names, comma separated
    #[arg(long, value_delimiter = ',')]
    restricted_root_names: Vec<String>,

    /// Extra unrestricted root names, comma separated
    #[arg(long, value_delimiter = ',')]
    unrestricted_root_names: Vec<String>,

    /// Total supply of the native token
    #[arg(long, env = "LOCALNET_HASH_SUPPLY")]
    hash_supply: Option<String>,

    /// Chain id
    #[arg(long, env = "LOCALNET_CHAIN_ID")]
    chain_id: Option<String>,

    /// RPC port
    #[arg(long, env = "LOCALNET_RPC_PORT")]
    rpc_port: Option<String>,

    /// gRPC port
    #[arg(long, env = "LOCALNET_GRPC_PORT")]
    grpc_port: Option<String>,

    /// Interface the node listens on
    #[arg(long, default_value = DEFAULT_BIND_ADDRESS, env = "LOCALNET_BIND_ADDRESS")]
    bind_address: String,
}

impl StartArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            mnemonic: self.mnemonic.clone(),
            accounts: self.accounts.clone(),
            chain_id: self.chain_id.clone(),
            rpc_port: self.rpc_port.clone(),
            grpc_port: self.grpc_port.clone(),
            hash_supply: self.hash_supply.clone(),
            restricted_root_names: self.restricted_root_names.clone(),
            unrestricted_root_names: self.unrestricted_root_names.clone(),
        }
    }

    async fn configuration(&self) -> Result<Configuration, Error> {
        let (path, required) = self.config.as_ref().map_or_else(
            || (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            |path| (path.clone(), true),
        );

        let file = load_config_file(&path, required).await?;

        Ok(resolve(file, &self.overrides(), &Configuration::default())?)
    }
}

fn orchestrator(
    args: &Args,
    binary: PathBuf,
    bind_address: &str,
) -> Result<NodeOrchestrator<LockFile, SystemSupervisor>, Error> {
    // The lock file, the node's --home and process discovery share one absolute path.
    let home = std::path::absolute(&args.home).map_err(|e| Error::Home(args.home.clone(), e))?;

    let supervisor = SystemSupervisor::for_binary(&binary);
    let mut options = NodeOrchestratorOptions::new(LockFile::in_home(&home), supervisor, &home);
    options.binary = binary;
    options.bind_address = bind_address.to_string();

    Ok(NodeOrchestrator::new(options)?)
}

/// The configured binary, or the default one found on `PATH`.
fn find_binary(provenanced: Option<&Path>) -> Result<PathBuf, Error> {
    match provenanced {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(which::which(DEFAULT_BINARY)?),
    }
}

async fn start(args: &Args, start: &StartArgs) -> Result<(), Error> {
    let binary = find_binary(args.provenanced.as_deref())?;
    debug!("using node binary {}", binary.display());

    let config = start.configuration().await?;
    let orchestrator = orchestrator(args, binary, &start.bind_address)?;

    let (config, report) = orchestrator.prepare(config, start.force).await?;

    println!("{report}");
    println!();

    match orchestrator.launch(&config, start.background).await? {
        Some(pid) => info!("node is running in the background (pid {})", pid),
        None => info!("node exited"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Only start needs the binary itself; the others just match it by name.
    let lookup_binary = || {
        args.provenanced
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY))
    };

    match &args.command {
        None => start(&args, &args.start).await,
        Some(Command::Start(start_args)) => start(&args, start_args).await,
        Some(Command::Stop) => {
            orchestrator(&args, lookup_binary(), DEFAULT_BIND_ADDRESS)?
                .stop()
                .await?;
            info!("node stopped");
            Ok(())
        }
        Some(Command::Reset) => {
            orchestrator(&args, lookup_binary(), DEFAULT_BIND_ADDRESS)?
                .reset()
                .await?;
            info!("node data removed");
            Ok(())
        }
        Some(Command::StopAndReset) => {
            orchestrator(&args, lookup_binary(), DEFAULT_BIND_ADDRESS)?
                .stop_and_reset()
                .await?;
            info!("node stopped and data removed");
            Ok(())
        }
    }
}
