use thiserror::Error;

/// Result type for genesis planning.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning genesis allocations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Token amount is not a non-negative decimal integer.
    #[error("invalid token amount '{0}': expected a non-negative decimal integer")]
    InvalidAmount(String),

    /// Cannot split a supply across zero accounts.
    #[error("account count must be greater than zero")]
    ZeroAccounts,
}
