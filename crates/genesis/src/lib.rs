//! Exact-integer allocation of the genesis token supply.
//!
//! The total supply is split between the validator and the funded accounts using
//! truncating integer arithmetic only. Whatever truncation leaves over is not
//! assigned to anyone.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::{Error, Result};

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::Zero;

/// Validator stake is `2/10` of the total supply.
const VALIDATOR_STAKE_RATIO: (u32, u32) = (2, 10);

/// Validator self-delegation is `1/10` of the validator stake.
const VALIDATOR_DELEGATION_RATIO: (u32, u32) = (1, 10);

/// An arbitrary-precision, non-negative amount of the base token denomination.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(BigUint);

impl TokenAmount {
    /// Wraps a raw integer amount.
    #[must_use]
    pub const fn new(amount: BigUint) -> Self {
        Self(amount)
    }

    /// Returns the raw integer amount.
    #[must_use]
    pub const fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Returns `true` if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Floor of `self * numerator / denominator`.
    fn scale((numerator, denominator): (u32, u32), amount: &BigUint) -> BigUint {
        amount * numerator / denominator
    }
}

impl FromStr for TokenAmount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // BigUint would also accept '+' and '_' separators.
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAmount(s.to_string()));
        }

        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| Error::InvalidAmount(s.to_string()))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TokenAmount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

/// Token allocation computed once from the configuration before genesis is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenesisPlan {
    /// Balance credited to the validator account.
    pub validator_stake: TokenAmount,

    /// Amount the validator self-delegates in its genesis transaction.
    pub validator_delegation: TokenAmount,

    /// Balance credited to each generated account.
    pub per_account_balance: TokenAmount,
}

impl GenesisPlan {
    /// Computes the allocation for `account_count` accounts out of `total_supply`.
    ///
    /// 1. `validator_stake = floor(total_supply * 0.2)`
    /// 2. `validator_delegation = floor(validator_stake * 0.1)`
    /// 3. `per_account_balance = floor((total_supply - validator_stake) / account_count)`
    ///
    /// The delegation is not subtracted from the stake, and the remainder of the
    /// division in step 3 is left unallocated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroAccounts`] if `account_count` is zero.
    pub fn new(total_supply: &TokenAmount, account_count: u32) -> Result<Self> {
        if account_count == 0 {
            return Err(Error::ZeroAccounts);
        }

        let supply = total_supply.as_biguint();
        let validator_stake = TokenAmount::scale(VALIDATOR_STAKE_RATIO, supply);
        let validator_delegation = TokenAmount::scale(VALIDATOR_DELEGATION_RATIO, &validator_stake);
        let remaining = supply - &validator_stake;
        let per_account_balance = remaining / account_count;

        Ok(Self {
            validator_stake: TokenAmount(validator_stake),
            validator_delegation: TokenAmount(validator_delegation),
            per_account_balance: TokenAmount(per_account_balance),
        })
    }

    /// Tokens left over after the validator stake and every account balance.
    #[must_use]
    pub fn unallocated(&self, total_supply: &TokenAmount, account_count: u32) -> TokenAmount {
        let allocated = &self.validator_stake.0 + &self.per_account_balance.0 * account_count;
        TokenAmount(total_supply.as_biguint() - allocated)
    }
}
