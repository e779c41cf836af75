use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::{Configuration, MarkerConfig, PortConfig, RootName};

/// Configuration as read from a file: every field may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialConfiguration {
    /// Mnemonic phrase.
    pub mnemonic: Option<String>,

    /// Number of funded accounts.
    pub accounts: Option<u32>,

    /// Chain id.
    pub chain_id: Option<String>,

    /// Listen ports.
    pub ports: Option<PartialPortConfig>,

    /// Total supply as a decimal integer string.
    pub hash_supply: Option<String>,

    /// Root names.
    pub root_names: Option<Vec<RootName>>,

    /// Markers.
    pub markers: Option<Vec<MarkerConfig>>,
}

/// Ports as read from a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialPortConfig {
    /// RPC port.
    pub rpc: Option<u16>,

    /// gRPC port.
    pub grpc: Option<u16>,
}

/// Overrides supplied on the command line, still unparsed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Mnemonic phrase.
    pub mnemonic: Option<String>,

    /// Number of funded accounts.
    pub accounts: Option<String>,

    /// Chain id.
    pub chain_id: Option<String>,

    /// RPC port.
    pub rpc_port: Option<String>,

    /// gRPC port.
    pub grpc_port: Option<String>,

    /// Total supply.
    pub hash_supply: Option<String>,

    /// Root names to add as restricted.
    pub restricted_root_names: Vec<String>,

    /// Root names to add as unrestricted.
    pub unrestricted_root_names: Vec<String>,
}

/// Merges file contents, overrides and defaults into a validated configuration.
///
/// Overrides win over the file, the file wins over `defaults`, field by field.
/// Root-name overrides are added to the file's (or default) list; asking for a
/// name with the opposite restriction of an existing entry is an error.
///
/// # Errors
///
/// Returns [`Error::InvalidNumber`] for non-integer numeric overrides,
/// [`Error::NameRestrictionConflict`] for conflicting root names, and
/// [`Error::ZeroAccounts`] if the resulting account count is zero.
pub fn resolve(
    file: PartialConfiguration,
    overrides: &ConfigOverrides,
    defaults: &Configuration,
) -> Result<Configuration> {
    let file_ports = file.ports.unwrap_or_default();

    let accounts = match &overrides.accounts {
        Some(value) => parse_number("accounts", value)?,
        None => file.accounts.unwrap_or(defaults.accounts),
    };

    let ports = PortConfig {
        rpc: match &overrides.rpc_port {
            Some(value) => parse_number("rpcPort", value)?,
            None => file_ports.rpc.unwrap_or(defaults.ports.rpc),
        },
        grpc: match &overrides.grpc_port {
            Some(value) => parse_number("grpcPort", value)?,
            None => file_ports.grpc.unwrap_or(defaults.ports.grpc),
        },
    };

    let mut root_names = file
        .root_names
        .unwrap_or_else(|| defaults.root_names.clone());
    add_root_names(&mut root_names, &overrides.restricted_root_names, true)?;
    add_root_names(&mut root_names, &overrides.unrestricted_root_names, false)?;

    let config = Configuration {
        mnemonic: overrides
            .mnemonic
            .clone()
            .or(file.mnemonic)
            .or_else(|| defaults.mnemonic.clone()),
        accounts,
        chain_id: overrides
            .chain_id
            .clone()
            .or(file.chain_id)
            .unwrap_or_else(|| defaults.chain_id.clone()),
        ports,
        hash_supply: overrides
            .hash_supply
            .clone()
            .or(file.hash_supply)
            .unwrap_or_else(|| defaults.hash_supply.clone()),
        root_names,
        markers: file.markers.unwrap_or_else(|| defaults.markers.clone()),
    };

    config.validate()?;

    Ok(config)
}

fn add_root_names(root_names: &mut Vec<RootName>, names: &[String], restrict: bool) -> Result<()> {
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        match root_names.iter().find(|existing| existing.name == name) {
            Some(existing) if existing.restrict != restrict => {
                return Err(Error::NameRestrictionConflict {
                    name: name.to_string(),
                    existing: existing.restrict,
                });
            }
            Some(_) => {}
            None => root_names.push(RootName::new(name, restrict)),
        }
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_ACCOUNTS, default_root_names};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = resolve(
            PartialConfiguration::default(),
            &ConfigOverrides::default(),
            &Configuration::default(),
        )
        .unwrap();

        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn test_override_precedence() {
        let file = PartialConfiguration {
            accounts: Some(4),
            chain_id: Some("from-file".to_string()),
            ports: Some(PartialPortConfig {
                rpc: Some(1000),
                grpc: None,
            }),
            ..PartialConfiguration::default()
        };
        let overrides = ConfigOverrides {
            chain_id: Some("from-cli".to_string()),
            grpc_port: Some("2000".to_string()),
            ..ConfigOverrides::default()
        };

        let config = resolve(file, &overrides, &Configuration::default()).unwrap();

        assert_eq!(config.accounts, 4);
        assert_eq!(config.chain_id, "from-cli");
        assert_eq!(config.ports, PortConfig { rpc: 1000, grpc: 2000 });
    }

    #[test]
    fn test_invalid_number_override() {
        let overrides = ConfigOverrides {
            accounts: Some("ten".to_string()),
            ..ConfigOverrides::default()
        };

        let result = resolve(
            PartialConfiguration::default(),
            &overrides,
            &Configuration::default(),
        );

        assert!(matches!(
            result,
            Err(Error::InvalidNumber { field: "accounts", .. })
        ));

        let overrides = ConfigOverrides {
            hash_supply: Some("1e20".to_string()),
            ..ConfigOverrides::default()
        };

        assert!(matches!(
            resolve(
                PartialConfiguration::default(),
                &overrides,
                &Configuration::default()
            ),
            Err(Error::InvalidNumber { field: "hashSupply", .. })
        ));
    }

    #[test]
    fn test_zero_accounts_rejected() {
        let overrides = ConfigOverrides {
            accounts: Some("0".to_string()),
            ..ConfigOverrides::default()
        };

        assert!(matches!(
            resolve(
                PartialConfiguration::default(),
                &overrides,
                &Configuration::default()
            ),
            Err(Error::ZeroAccounts)
        ));
    }

    #[test]
    fn test_root_names_are_additive() {
        let overrides = ConfigOverrides {
            restricted_root_names: names(&["alpha", "pio"]),
            unrestricted_root_names: names(&["beta", " "]),
            ..ConfigOverrides::default()
        };

        let config = resolve(
            PartialConfiguration::default(),
            &overrides,
            &Configuration::default(),
        )
        .unwrap();

        let mut expected = default_root_names();
        expected.push(RootName::new("alpha", true));
        expected.push(RootName::new("beta", false));
        assert_eq!(config.root_names, expected);
        assert_eq!(config.accounts, DEFAULT_ACCOUNTS);
    }

    #[test]
    fn test_restricted_name_conflict() {
        let file = PartialConfiguration {
            root_names: Some(vec![RootName::new("shared", false)]),
            ..PartialConfiguration::default()
        };
        let original = file.clone();
        let overrides = ConfigOverrides {
            restricted_root_names: names(&["shared"]),
            ..ConfigOverrides::default()
        };

        let result = resolve(file.clone(), &overrides, &Configuration::default());

        assert!(matches!(
            result,
            Err(Error::NameRestrictionConflict { ref name, existing: false }) if name == "shared"
        ));
        assert_eq!(file, original);
    }

    #[test]
    fn test_unrestricted_name_conflict() {
        let overrides = ConfigOverrides {
            unrestricted_root_names: names(&["pio"]),
            ..ConfigOverrides::default()
        };

        assert!(matches!(
            resolve(
                PartialConfiguration::default(),
                &overrides,
                &Configuration::default()
            ),
            Err(Error::NameRestrictionConflict { existing: true, .. })
        ));
    }

    #[test]
    fn test_same_name_in_both_lists_conflicts() {
        let overrides = ConfigOverrides {
            restricted_root_names: names(&["twice"]),
            unrestricted_root_names: names(&["twice"]),
            ..ConfigOverrides::default()
        };

        assert!(matches!(
            resolve(
                PartialConfiguration::default(),
                &overrides,
                &Configuration::default()
            ),
            Err(Error::NameRestrictionConflict { existing: true, .. })
        ));
    }

    #[test]
    fn test_duplicate_override_is_kept_once() {
        let file = PartialConfiguration {
            root_names: Some(vec![RootName::new("shared", true)]),
            ..PartialConfiguration::default()
        };
        let overrides = ConfigOverrides {
            restricted_root_names: names(&["shared", "fresh", "fresh"]),
            ..ConfigOverrides::default()
        };

        let config = resolve(file, &overrides, &Configuration::default()).unwrap();

        assert_eq!(
            config.root_names,
            vec![RootName::new("shared", true), RootName::new("fresh", true)]
        );
    }
}
