use std::fmt;

use crate::error::{Error, Result};
use crate::extended_key::HARDENED_OFFSET;

const PURPOSE: u32 = 44;
const COIN_TYPE: u32 = 1;
const ACCOUNT: u32 = 0;

/// Derivation path `m/44'/1'/0'/{keyring}'/{account}'`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HdPath {
    keyring: u32,
    account: u32,
}

impl HdPath {
    /// Creates the path for the given keyring and account index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if either index is outside `0..2^31`.
    pub fn new(keyring: u32, account: u32) -> Result<Self> {
        for index in [keyring, account] {
            if index >= HARDENED_OFFSET {
                return Err(Error::InvalidIndex(index.to_string()));
            }
        }

        Ok(Self { keyring, account })
    }

    /// The keyring (fourth) component.
    #[must_use]
    pub const fn keyring(&self) -> u32 {
        self.keyring
    }

    /// The account (fifth) component.
    #[must_use]
    pub const fn account(&self) -> u32 {
        self.account
    }

    /// Path components, all derived hardened.
    #[must_use]
    pub const fn components(&self) -> [u32; 5] {
        [PURPOSE, COIN_TYPE, ACCOUNT, self.keyring, self.account]
    }

    /// Path template with the account index left as a placeholder, for display.
    #[must_use]
    pub fn base_display(keyring: u32) -> String {
        format!("m/{PURPOSE}'/{COIN_TYPE}'/{ACCOUNT}'/{keyring}'/{{account_index}}'")
    }
}

impl fmt::Display for HdPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m/{PURPOSE}'/{COIN_TYPE}'/{ACCOUNT}'/{}'/{}'",
            self.keyring, self.account
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(HdPath::new(0, 7).unwrap().to_string(), "m/44'/1'/0'/0'/7'");
        assert_eq!(HdPath::new(3, 12).unwrap().to_string(), "m/44'/1'/0'/3'/12'");
    }

    #[test]
    fn test_base_display() {
        assert_eq!(HdPath::base_display(0), "m/44'/1'/0'/0'/{account_index}'");
    }

    #[test]
    fn test_out_of_range_index() {
        assert!(matches!(
            HdPath::new(0, HARDENED_OFFSET),
            Err(Error::InvalidIndex(_))
        ));
        assert!(matches!(
            HdPath::new(u32::MAX, 0),
            Err(Error::InvalidIndex(_))
        ));
    }
}
