//! Configuration for a local network: data model, defaults, and resolution of
//! file contents and command-line overrides into one validated configuration.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod file;
mod resolve;

pub use error::{Error, Result};
pub use file::{DEFAULT_CONFIG_FILE, load_config_file};
pub use resolve::{ConfigOverrides, PartialConfiguration, PartialPortConfig, resolve};

use std::fmt;

use localnet_genesis::TokenAmount;
use serde::{Deserialize, Serialize};

/// Number of accounts funded at genesis when not configured.
pub const DEFAULT_ACCOUNTS: u32 = 10;

/// Chain id used when not configured.
pub const DEFAULT_CHAIN_ID: &str = "chain-local";

/// Default gRPC port.
pub const DEFAULT_GRPC_PORT: u16 = 9090;

/// Default total supply of the native token, in its base denomination.
pub const DEFAULT_HASH_SUPPLY: &str = "100000000000000000000";

/// Default RPC port.
pub const DEFAULT_RPC_PORT: u16 = 26657;

/// Capabilities that can be granted on a marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerAccess {
    /// Administer the marker.
    Admin,
    /// Burn supply.
    Burn,
    /// Deposit into the marker account.
    Deposit,
    /// Mint supply.
    Mint,
    /// Withdraw from the marker account.
    Withdraw,
}

impl MarkerAccess {
    /// Every capability, in the order they are passed to the node.
    pub const ALL: [Self; 5] = [
        Self::Admin,
        Self::Burn,
        Self::Deposit,
        Self::Mint,
        Self::Withdraw,
    ];

    /// Returns the access name as understood by the node binary.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Burn => "burn",
            Self::Deposit => "deposit",
            Self::Mint => "mint",
            Self::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for MarkerAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A root name registered at genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootName {
    /// The name.
    pub name: String,

    /// Whether child names require the owner's signature.
    pub restrict: bool,
}

impl RootName {
    /// Creates a root name entry.
    pub fn new(name: impl Into<String>, restrict: bool) -> Self {
        Self {
            name: name.into(),
            restrict,
        }
    }
}

/// A marker (access-controlled denomination) created at genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerConfig {
    /// Denomination name.
    pub denom: String,

    /// Total supply as a decimal integer string.
    pub total_supply: String,

    /// Key name of the marker manager.
    pub manager: String,

    /// Granted capabilities.
    pub access: Vec<MarkerAccess>,
}

impl MarkerConfig {
    /// Total supply parsed as an exact integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNumber`] if the supply is not a decimal integer.
    pub fn supply(&self) -> Result<TokenAmount> {
        parse_amount("markers.totalSupply", &self.total_supply)
    }
}

/// Ports the node listens on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Tendermint RPC port.
    pub rpc: u16,

    /// gRPC port; used for readiness checks.
    pub grpc: u16,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            rpc: DEFAULT_RPC_PORT,
            grpc: DEFAULT_GRPC_PORT,
        }
    }
}

/// Complete configuration genesis is built from.
///
/// Two configurations are interchangeable only if they compare equal; the
/// orchestrator refuses to start existing chain data with a different one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Mnemonic all account keys derive from. Generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,

    /// Number of funded accounts.
    pub accounts: u32,

    /// Chain id.
    pub chain_id: String,

    /// Listen ports.
    pub ports: PortConfig,

    /// Total supply of the native token as a decimal integer string.
    pub hash_supply: String,

    /// Root names, in registration order.
    pub root_names: Vec<RootName>,

    /// Additional markers, in creation order.
    pub markers: Vec<MarkerConfig>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            mnemonic: None,
            accounts: DEFAULT_ACCOUNTS,
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            ports: PortConfig::default(),
            hash_supply: DEFAULT_HASH_SUPPLY.to_string(),
            root_names: default_root_names(),
            markers: Vec::new(),
        }
    }
}

impl Configuration {
    /// Total supply parsed as an exact integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNumber`] if the supply is not a decimal integer.
    pub fn total_supply(&self) -> Result<TokenAmount> {
        parse_amount("hashSupply", &self.hash_supply)
    }

    /// Checks the invariants every resolved configuration must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroAccounts`] or [`Error::InvalidNumber`].
    pub fn validate(&self) -> Result<()> {
        if self.accounts == 0 {
            return Err(Error::ZeroAccounts);
        }

        self.total_supply()?;

        for marker in &self.markers {
            marker.supply()?;
        }

        Ok(())
    }
}

/// Root names registered when none are configured.
#[must_use]
pub fn default_root_names() -> Vec<RootName> {
    vec![
        RootName::new("pio", true),
        RootName::new("pb", false),
        RootName::new("io", true),
        RootName::new("provenance", true),
    ]
}

fn parse_amount(field: &'static str, value: &str) -> Result<TokenAmount> {
    value.parse().map_err(|_| Error::InvalidNumber {
        field,
        value: value.to_string(),
    })
}
