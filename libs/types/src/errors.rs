//! Error types for identifier validation and unit conversion

use thiserror::Error;

/// Errors raised while validating or parsing addresses
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Both sides of a pair are the same asset
    #[error("Tokens should have different addresses")]
    IdenticalAddresses,

    /// One side of a pair is the null address
    #[error("Tokens should have non-zero addresses")]
    ZeroAddress,

    /// Input is not a 20-byte hex string
    #[error("Invalid address '{input}': expected 20 hex-encoded bytes")]
    InvalidHex { input: String },
}

/// Errors raised while converting between decimal strings and raw amounts
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitsError {
    /// Input is not a decimal number
    #[error("Invalid decimal string: '{input}' - expected numeric format")]
    InvalidDecimal { input: String },

    /// Amounts are unsigned
    #[error("Negative amount not allowed: '{input}'")]
    Negative { input: String },

    /// More fractional digits than the token supports
    #[error("Precision loss: '{input}' has more than {decimals} fractional digits")]
    PrecisionLoss { input: String, decimals: u32 },

    /// Value does not fit the target representation
    #[error("Overflow converting '{input}'")]
    Overflow { input: String },
}
