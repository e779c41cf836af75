use thiserror::Error;

/// Result type for key derivation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while deriving keys.
#[derive(Debug, Error)]
pub enum Error {
    /// Child derivation produced an invalid key (probability below 2^-127).
    #[error("key derivation failed at index {0}")]
    DerivationFailed(u32),

    /// Derivation index outside the hardened range or not an integer.
    #[error("invalid derivation index '{0}'")]
    InvalidIndex(String),

    /// Mnemonic phrase is not valid BIP39.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(#[from] bip39::Error),

    /// Human-readable address prefix rejected by bech32.
    #[error("invalid address prefix '{0}'")]
    InvalidPrefix(String),
}
