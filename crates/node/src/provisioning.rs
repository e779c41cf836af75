//! The ordered command pipeline that builds genesis data in a home directory.

use std::path::PathBuf;

use localnet_config::{Configuration, MarkerAccess};
use localnet_genesis::{GenesisPlan, TokenAmount};
use localnet_keys::HdPath;
use localnet_supervisor::NodeCommand;

use crate::error::Result;

/// Denomination of the native token.
pub const HASH_DENOM: &str = "nhash";

/// Key name of the validator in the node's keyring.
pub const VALIDATOR_KEY: &str = "validator";

/// Moniker passed to `init`.
const MONIKER: &str = "localnet";

const P2P_PORT: u16 = 26656;
const API_PORT: u16 = 1317;

const KEYRING_BACKEND: [&str; 2] = ["--keyring-backend", "test"];

/// Builds node invocations against a single home directory.
#[derive(Clone, Debug)]
pub struct CommandBuilder {
    binary: PathBuf,
    home_dir: PathBuf,
}

impl CommandBuilder {
    /// Creates a builder for `binary` operating on `home_dir`.
    pub fn new(binary: impl Into<PathBuf>, home_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            home_dir: home_dir.into(),
        }
    }

    fn command<A: Into<String>>(&self, args: impl IntoIterator<Item = A>) -> NodeCommand {
        NodeCommand::new(
            &self.binary,
            ["-t".to_string(), "--home".to_string(), self.home_dir.display().to_string()],
        )
        .with_args(args)
    }

    /// `start`
    #[must_use]
    pub fn start(&self) -> NodeCommand {
        self.command(["start"])
    }

    fn init(&self, chain_id: &str) -> NodeCommand {
        self.command(["init".to_string(), format!("--chain-id={chain_id}"), MONIKER.to_string()])
    }

    fn add_key(&self, name: &str) -> NodeCommand {
        self.command(["keys", "add", name]).with_args(KEYRING_BACKEND)
    }

    fn recover_key(&self, name: &str, mnemonic: &str, hd_path: &HdPath) -> NodeCommand {
        self.command(["keys", "add", name, "--recover"])
            .with_args(KEYRING_BACKEND)
            .with_args(["--hd-path".to_string(), hd_path.to_string()])
            .with_stdin(mnemonic)
    }

    fn add_genesis_account(&self, name: &str, amount: &TokenAmount) -> NodeCommand {
        self.command([
            "add-genesis-account".to_string(),
            name.to_string(),
            format!("{amount}{HASH_DENOM}"),
        ])
        .with_args(KEYRING_BACKEND)
    }

    fn add_genesis_root_name(&self, owner: &str, name: &str, restrict: bool) -> NodeCommand {
        let restrict = if restrict { "--restrict" } else { "--restrict=false" };

        self.command(["add-genesis-root-name", owner, name, restrict])
            .with_args(KEYRING_BACKEND)
    }

    fn add_genesis_marker(
        &self,
        coin: String,
        manager: &str,
        access: &[MarkerAccess],
    ) -> NodeCommand {
        let access = access
            .iter()
            .map(MarkerAccess::as_str)
            .collect::<Vec<_>>()
            .join(",");

        self.command([
            "add-genesis-marker".to_string(),
            coin,
            "--manager".to_string(),
            manager.to_string(),
            "--access".to_string(),
            access,
            "--activate".to_string(),
        ])
        .with_args(KEYRING_BACKEND)
    }

    fn gentx(&self, amount: &TokenAmount, chain_id: &str) -> NodeCommand {
        self.command([
            "gentx".to_string(),
            VALIDATOR_KEY.to_string(),
            format!("{amount}{HASH_DENOM}"),
        ])
        .with_args(KEYRING_BACKEND)
        .with_args([format!("--chain-id={chain_id}")])
    }

    fn collect_gentxs(&self) -> NodeCommand {
        self.command(["collect-gentxs"])
    }

    fn config_set(&self, name: &str, value: impl Into<String>) -> NodeCommand {
        self.command(["config".to_string(), "set".to_string(), name.to_string(), value.into()])
    }

    /// Every command needed to build genesis for `config`, in execution order.
    ///
    /// `mnemonic` is the phrase the funded accounts are recovered from and
    /// `bind_address` is the interface the node's listeners are configured on.
    ///
    /// # Errors
    ///
    /// Returns an error if the total supply or a marker supply is not an integer
    /// or an account index cannot be expressed as a derivation path.
    pub fn genesis(
        &self,
        config: &Configuration,
        plan: &GenesisPlan,
        mnemonic: &str,
        bind_address: &str,
    ) -> Result<Vec<NodeCommand>> {
        let total_supply = config.total_supply()?;
        let mut commands = vec![
            self.init(&config.chain_id),
            self.add_key(VALIDATOR_KEY),
            self.add_genesis_account(VALIDATOR_KEY, &plan.validator_stake),
        ];

        for account in 0..config.accounts {
            let name = format!("account{account}");
            let hd_path = HdPath::new(0, account)?;

            commands.push(self.recover_key(&name, mnemonic, &hd_path));
            commands.push(self.add_genesis_account(&name, &plan.per_account_balance));
        }

        for root_name in &config.root_names {
            commands.push(self.add_genesis_root_name(
                VALIDATOR_KEY,
                &root_name.name,
                root_name.restrict,
            ));
        }

        commands.push(self.add_genesis_marker(
            format!("{total_supply}{HASH_DENOM}"),
            VALIDATOR_KEY,
            &MarkerAccess::ALL,
        ));

        for marker in &config.markers {
            let supply = marker.supply()?;
            commands.push(self.add_genesis_marker(
                format!("{supply}{}", marker.denom),
                &marker.manager,
                &marker.access,
            ));
        }

        commands.push(self.gentx(&plan.validator_delegation, &config.chain_id));
        commands.push(self.collect_gentxs());

        commands.extend([
            self.config_set("rpc.laddr", format!("tcp://{bind_address}:{}", config.ports.rpc)),
            self.config_set("p2p.laddr", format!("tcp://{bind_address}:{P2P_PORT}")),
            self.config_set("grpc.address", format!("{bind_address}:{}", config.ports.grpc)),
            self.config_set("grpc-web.enable", "false"),
            self.config_set("api.enable", "true"),
            self.config_set("api.address", format!("tcp://{bind_address}:{API_PORT}")),
            self.config_set("api.swagger", "true"),
        ]);

        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use localnet_config::{MarkerConfig, RootName};

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn args(command: &NodeCommand) -> Vec<&str> {
        command.args[3..].iter().map(String::as_str).collect()
    }

    fn config() -> Configuration {
        Configuration {
            accounts: 2,
            root_names: vec![RootName::new("pio", true), RootName::new("pb", false)],
            markers: vec![MarkerConfig {
                denom: "usd".to_string(),
                total_supply: "1000".to_string(),
                manager: "account0".to_string(),
                access: vec![MarkerAccess::Mint, MarkerAccess::Burn],
            }],
            ..Configuration::default()
        }
    }

    #[test]
    fn test_genesis_pipeline() {
        let config = config();
        let plan = GenesisPlan::new(&config.total_supply().unwrap(), config.accounts).unwrap();
        let builder = CommandBuilder::new("/usr/bin/provenanced", "/tmp/home");

        let commands = builder
            .genesis(&config, &plan, PHRASE, "127.0.0.1")
            .unwrap();

        for command in &commands {
            assert_eq!(command.executable, PathBuf::from("/usr/bin/provenanced"));
            assert_eq!(command.args[..3], ["-t", "--home", "/tmp/home"]);
        }

        let rendered: Vec<Vec<&str>> = commands.iter().map(args).collect();
        assert_eq!(
            rendered,
            vec![
                vec!["init", "--chain-id=chain-local", "localnet"],
                vec!["keys", "add", "validator", "--keyring-backend", "test"],
                vec![
                    "add-genesis-account",
                    "validator",
                    "20000000000000000000nhash",
                    "--keyring-backend",
                    "test"
                ],
                vec![
                    "keys",
                    "add",
                    "account0",
                    "--recover",
                    "--keyring-backend",
                    "test",
                    "--hd-path",
                    "m/44'/1'/0'/0'/0'"
                ],
                vec![
                    "add-genesis-account",
                    "account0",
                    "40000000000000000000nhash",
                    "--keyring-backend",
                    "test"
                ],
                vec![
                    "keys",
                    "add",
                    "account1",
                    "--recover",
                    "--keyring-backend",
                    "test",
                    "--hd-path",
                    "m/44'/1'/0'/0'/1'"
                ],
                vec![
                    "add-genesis-account",
                    "account1",
                    "40000000000000000000nhash",
                    "--keyring-backend",
                    "test"
                ],
                vec![
                    "add-genesis-root-name",
                    "validator",
                    "pio",
                    "--restrict",
                    "--keyring-backend",
                    "test"
                ],
                vec![
                    "add-genesis-root-name",
                    "validator",
                    "pb",
                    "--restrict=false",
                    "--keyring-backend",
                    "test"
                ],
                vec![
                    "add-genesis-marker",
                    "100000000000000000000nhash",
                    "--manager",
                    "validator",
                    "--access",
                    "admin,burn,deposit,mint,withdraw",
                    "--activate",
                    "--keyring-backend",
                    "test"
                ],
                vec![
                    "add-genesis-marker",
                    "1000usd",
                    "--manager",
                    "account0",
                    "--access",
                    "mint,burn",
                    "--activate",
                    "--keyring-backend",
                    "test"
                ],
                vec![
                    "gentx",
                    "validator",
                    "2000000000000000000nhash",
                    "--keyring-backend",
                    "test",
                    "--chain-id=chain-local"
                ],
                vec!["collect-gentxs"],
                vec!["config", "set", "rpc.laddr", "tcp://127.0.0.1:26657"],
                vec!["config", "set", "p2p.laddr", "tcp://127.0.0.1:26656"],
                vec!["config", "set", "grpc.address", "127.0.0.1:9090"],
                vec!["config", "set", "grpc-web.enable", "false"],
                vec!["config", "set", "api.enable", "true"],
                vec!["config", "set", "api.address", "tcp://127.0.0.1:1317"],
                vec!["config", "set", "api.swagger", "true"],
            ]
        );
    }

    #[test]
    fn test_only_recovered_keys_receive_the_mnemonic() {
        let config = config();
        let plan = GenesisPlan::new(&config.total_supply().unwrap(), config.accounts).unwrap();
        let builder = CommandBuilder::new("provenanced", "/tmp/home");

        let commands = builder
            .genesis(&config, &plan, PHRASE, "0.0.0.0")
            .unwrap();

        let with_stdin: Vec<_> = commands.iter().filter(|c| c.stdin.is_some()).collect();
        assert_eq!(with_stdin.len(), 2);
        assert!(with_stdin.iter().all(|c| c.stdin.as_deref() == Some(PHRASE)));
        assert!(with_stdin.iter().all(|c| c.args.contains(&"--recover".to_string())));
    }

    #[test]
    fn test_start_command() {
        let builder = CommandBuilder::new("provenanced", "/tmp/home");

        assert_eq!(builder.start().to_string(), "provenanced -t --home /tmp/home start");
    }

    #[test]
    fn test_marker_supply_is_normalized() {
        let mut config = config();
        config.markers[0].total_supply = "007".to_string();
        let plan = GenesisPlan::new(&config.total_supply().unwrap(), config.accounts).unwrap();
        let builder = CommandBuilder::new("provenanced", "/tmp/home");

        let commands = builder
            .genesis(&config, &plan, PHRASE, "127.0.0.1")
            .unwrap();

        let markers: Vec<&str> = commands
            .iter()
            .filter(|c| c.args[3] == "add-genesis-marker")
            .map(|c| c.args[4].as_str())
            .collect();
        assert_eq!(markers, ["100000000000000000000nhash", "7usd"]);
    }

    #[test]
    fn test_invalid_marker_supply_is_rejected() {
        let mut config = config();
        config.markers[0].total_supply = "1e6".to_string();
        let plan = GenesisPlan::new(&config.total_supply().unwrap(), config.accounts).unwrap();
        let builder = CommandBuilder::new("provenanced", "/tmp/home");

        assert!(matches!(
            builder.genesis(&config, &plan, PHRASE, "127.0.0.1"),
            Err(crate::Error::Config(_))
        ));
    }
}
