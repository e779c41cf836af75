use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Bech32 address of a compressed public key: `bech32(hrp, RIPEMD160(SHA256(pk)))`.
///
/// # Errors
///
/// Returns [`Error::InvalidPrefix`] if `prefix` is not a valid human-readable part.
pub fn bech32_address(prefix: &str, public_key: &[u8]) -> Result<String> {
    let hrp = parse_prefix(prefix)?;
    let hash = Ripemd160::digest(Sha256::digest(public_key));

    bech32::encode::<Bech32>(hrp, &hash).map_err(|_| Error::InvalidPrefix(prefix.to_string()))
}

pub(crate) fn parse_prefix(prefix: &str) -> Result<Hrp> {
    Hrp::parse(prefix).map_err(|_| Error::InvalidPrefix(prefix.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_prefix() {
        assert!(matches!(
            bech32_address("", &[2u8; 33]),
            Err(Error::InvalidPrefix(_))
        ));
        assert!(matches!(
            bech32_address("t p", &[2u8; 33]),
            Err(Error::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_prefix_is_used() {
        let address = bech32_address("pb", &[2u8; 33]).unwrap();

        assert!(address.starts_with("pb1"));
        // 20-byte hash: 32 data characters plus 6 checksum characters.
        assert_eq!(address.len(), "pb1".len() + 32 + 6);
    }
}
