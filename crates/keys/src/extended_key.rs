//! BIP32 hierarchical derivation over secp256k1 (hardened children only).

use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::secp256k1::{All, PublicKey, Secp256k1};
use bitcoin::Network;

use crate::error::{Error, Result};

/// Offset added to an index to request hardened derivation.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// A private key together with its chain code.
#[derive(Clone)]
pub struct ExtendedPrivateKey {
    secp: Secp256k1<All>,
    xpriv: Xpriv,
}

impl ExtendedPrivateKey {
    /// Master key for `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DerivationFailed`] if the seed does not yield a valid key.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        // The network only affects xpub/xprv serialization, which is never used.
        let xpriv = Xpriv::new_master(Network::Bitcoin, seed).map_err(|_| Error::DerivationFailed(0))?;

        Ok(Self {
            secp: Secp256k1::new(),
            xpriv,
        })
    }

    /// Derives the hardened child `index'`.
    ///
    /// `index` is the unhardened value; the hardened offset is applied here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if `index` is already in the hardened range,
    /// or [`Error::DerivationFailed`] for an invalid child.
    pub fn derive_hardened(&self, index: u32) -> Result<Self> {
        self.derive_path(&[index])
    }

    /// Derives each hardened index in turn.
    ///
    /// # Errors
    ///
    /// See [`Self::derive_hardened`].
    pub fn derive_path(&self, indices: &[u32]) -> Result<Self> {
        let path = indices
            .iter()
            .map(|&index| {
                ChildNumber::from_hardened_idx(index)
                    .map_err(|_| Error::InvalidIndex(index.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let xpriv = self
            .xpriv
            .derive_priv(&self.secp, &DerivationPath::from(path))
            .map_err(|_| Error::DerivationFailed(indices.last().copied().unwrap_or_default()))?;

        Ok(Self {
            secp: self.secp.clone(),
            xpriv,
        })
    }

    /// SEC1 compressed public key (33 bytes).
    #[must_use]
    pub fn public_key(&self) -> [u8; 33] {
        PublicKey::from_secret_key(&self.secp, &self.xpriv.private_key).serialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // BIP32 test vector 1.
    const SEED: &str = "000102030405060708090a0b0c0d0e0f";

    #[test]
    fn test_master_public_key_vector() {
        let master = ExtendedPrivateKey::from_seed(&hex::decode(SEED).unwrap()).unwrap();

        assert_eq!(
            hex::encode(master.public_key()),
            "0339a36013301597daef41fbe593a02cc513d0b55527ec2df1050e2e8ff49c85c2"
        );
    }

    #[test]
    fn test_hardened_child_vector() {
        let master = ExtendedPrivateKey::from_seed(&hex::decode(SEED).unwrap()).unwrap();
        let child = master.derive_hardened(0).unwrap();

        assert_eq!(
            hex::encode(child.public_key()),
            "035a784662a4a20a65bf6aab9ae98a6c068a81c52e4b032c0fb5400c706cfccc56"
        );
    }

    #[test]
    fn test_path_matches_stepwise_derivation() {
        let master = ExtendedPrivateKey::from_seed(&hex::decode(SEED).unwrap()).unwrap();

        let stepwise = master.derive_hardened(44).unwrap().derive_hardened(1).unwrap();
        let direct = master.derive_path(&[44, 1]).unwrap();

        assert_eq!(stepwise.public_key(), direct.public_key());
    }

    #[test]
    fn test_hardened_range_index_rejected() {
        let master = ExtendedPrivateKey::from_seed(&hex::decode(SEED).unwrap()).unwrap();

        assert!(matches!(
            master.derive_hardened(HARDENED_OFFSET),
            Err(Error::InvalidIndex(_))
        ));
    }
}
