use std::fmt;

use localnet_genesis::{GenesisPlan, TokenAmount};

use crate::provisioning::HASH_DENOM;

/// A funded account as reported to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountReport {
    /// Account index along the derivation path.
    pub index: u32,

    /// Bech32 address.
    pub address: String,

    /// Genesis balance in the base denomination.
    pub balance: TokenAmount,
}

/// Outcome of preparing or starting the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartReport {
    /// Mnemonic every account derives from.
    pub mnemonic: String,

    /// Derivation path with the account index left as a placeholder.
    pub base_hd_path: String,

    /// Token allocation genesis was built with.
    pub plan: GenesisPlan,

    /// Every funded account, by index.
    pub accounts: Vec<AccountReport>,

    /// Whether genesis was built by this call rather than reused.
    pub genesis_created: bool,

    /// Pid of the node when started in the background.
    pub pid: Option<u32>,
}

impl fmt::Display for StartReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.accounts.len() / 10 + 4;

        writeln!(f, "Available Accounts")?;
        writeln!(f, "==================")?;
        for account in &self.accounts {
            let index = format!("({})", account.index);
            writeln!(
                f,
                "{index:<width$}{} ({} {HASH_DENOM})",
                account.address, account.balance
            )?;
        }
        writeln!(f)?;
        writeln!(f, "HD Wallet")?;
        writeln!(f, "==================")?;
        writeln!(f, "Mnemonic:      {}", self.mnemonic)?;
        write!(f, "Base HD Path:  {}", self.base_hd_path)
    }
}
