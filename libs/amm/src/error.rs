//! AMM error taxonomy
//!
//! Every fallible operation in the crate returns [`AmmError`]. Errors are
//! reported to the caller and never swallowed: a failed operation has had no
//! effect on reserves, claim balances or token custody.

use thiserror::Error;
use types::{Address, AddressError};

pub type Result<T> = std::result::Result<T, AmmError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmmError {
    #[error("Tokens should have different addresses")]
    IdenticalAssets,

    #[error("Tokens should have non-zero addresses")]
    ZeroAsset,

    #[error("Pair already exists for these tokens")]
    PairExists,

    #[error("No pair exists for {0:?} and {1:?}")]
    PairNotFound(Address, Address),

    #[error("Asset {0:?} is not registered with the token directory")]
    UnknownAsset(Address),

    #[error("Insufficient amount")]
    InsufficientAmount,

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    #[error("Insufficient liquidity burned")]
    InsufficientLiquidityBurned,

    #[error("Invalid path: at least two assets required")]
    InvalidPath,

    /// Fee-adjusted constant product would decrease
    #[error("K decreased")]
    InvariantViolation,

    #[error("Requested output exceeds reserve")]
    OutputExceedsReserve,

    #[error("Both output amounts are zero")]
    ZeroOutputAmounts,

    #[error("Insufficient A amount")]
    InsufficientAAmount,

    #[error("Insufficient B amount")]
    InsufficientBAmount,

    #[error("Insufficient output amount")]
    InsufficientOutputAmount,

    #[error("Excessive input amount")]
    ExcessiveInputAmount,

    #[error("Recipient {0:?} is one of the pool's own tokens")]
    InvalidRecipient(Address),

    #[error("Token transfer failed: {token:?} {from:?} -> {to:?}")]
    TransferFailed {
        token: Address,
        from: Address,
        to: Address,
    },

    #[error("Insufficient claim balance")]
    InsufficientClaimBalance,

    #[error("Arithmetic overflow")]
    Overflow,
}

impl From<AddressError> for AmmError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::IdenticalAddresses => AmmError::IdenticalAssets,
            AddressError::ZeroAddress | AddressError::InvalidHex { .. } => AmmError::ZeroAsset,
        }
    }
}
