//! Deterministic account identities derived from a mnemonic.
//!
//! Keys follow BIP39 (mnemonic to seed) and BIP32 over secp256k1 along the
//! hardened path `m/44'/1'/0'/{keyring}'/{account}'`. Addresses are the bech32
//! encoding of `RIPEMD160(SHA256(compressed public key))`.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod address;
mod error;
mod extended_key;
mod hd_path;
mod mnemonic;

pub use address::bech32_address;
pub use error::{Error, Result};
pub use extended_key::{ExtendedPrivateKey, HARDENED_OFFSET};
pub use hd_path::HdPath;
pub use mnemonic::{generate_mnemonic, mnemonic_to_seed};

/// Address prefix used by test networks.
pub const DEFAULT_ADDRESS_PREFIX: &str = "tp";

/// Public identity of one derived account. Recomputable at any time; never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyIdentity {
    /// Bech32 address.
    pub address: String,

    /// Path the key was derived along.
    pub hd_path: HdPath,

    /// SEC1 compressed public key.
    pub public_key: [u8; 33],
}

impl KeyIdentity {
    /// Account index the identity was derived at.
    #[must_use]
    pub const fn derivation_index(&self) -> u32 {
        self.hd_path.account()
    }
}

/// Derives account identities from a single mnemonic.
///
/// The seed and master key are computed once, so deriving many accounts is cheap.
#[derive(Clone)]
pub struct KeyDeriver {
    master: ExtendedPrivateKey,
    prefix: String,
}

impl KeyDeriver {
    /// Creates a deriver for `mnemonic` producing addresses with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mnemonic or the prefix is invalid.
    pub fn from_mnemonic(mnemonic: &str, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        address::parse_prefix(&prefix)?;

        let seed = mnemonic_to_seed(mnemonic)?;
        let master = ExtendedPrivateKey::from_seed(&seed)?;

        Ok(Self { master, prefix })
    }

    /// Derives the identity at `m/44'/1'/0'/{keyring}'/{account}'`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if either index is outside `0..2^31`.
    pub fn derive(&self, keyring: u32, account: u32) -> Result<KeyIdentity> {
        let hd_path = HdPath::new(keyring, account)?;
        let key = self.master.derive_path(&hd_path.components())?;
        let public_key = key.public_key();
        let address = bech32_address(&self.prefix, &public_key)?;

        Ok(KeyIdentity {
            address,
            hd_path,
            public_key,
        })
    }
}

/// One-shot derivation of a single identity.
///
/// # Errors
///
/// See [`KeyDeriver::from_mnemonic`] and [`KeyDeriver::derive`].
pub fn derive_address(
    mnemonic: &str,
    keyring: u32,
    account: u32,
    prefix: &str,
) -> Result<KeyIdentity> {
    KeyDeriver::from_mnemonic(mnemonic, prefix)?.derive(keyring, account)
}
