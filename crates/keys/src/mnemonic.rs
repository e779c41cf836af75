//! BIP39 mnemonic generation and seed derivation.

use bip39::Mnemonic;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Generates a fresh 24-word mnemonic.
///
/// 32 bytes of OS entropy are hashed with SHA-256 and the digest is encoded as
/// the mnemonic entropy.
///
/// # Errors
///
/// Returns an error if the entropy cannot be encoded, which does not happen for
/// 32-byte input.
pub fn generate_mnemonic() -> Result<String> {
    let mut entropy = [0u8; 32];
    OsRng.fill_bytes(&mut entropy);

    let digest = Sha256::digest(entropy);
    let mnemonic = Mnemonic::from_entropy(&digest)?;

    Ok(mnemonic.to_string())
}

/// Converts a mnemonic phrase into its 64-byte seed, with an empty passphrase.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidMnemonic`] if the phrase is not valid BIP39.
pub fn mnemonic_to_seed(phrase: &str) -> Result<[u8; 64]> {
    let mnemonic = Mnemonic::parse_normalized(phrase.trim())?;

    Ok(mnemonic.to_seed_normalized(""))
}
