//! # Pairswap AMM - Constant-Product Exchange Core
//!
//! ## Purpose
//!
//! In-process implementation of a two-asset constant-product market maker:
//! per-pair pool ledgers that mint and burn proportional claims and enforce
//! the fee-adjusted `x * y = k` invariant, a registry that owns one pool per
//! unordered token pair, exact integer quoting math, and a router that turns
//! user intent (deposit, withdraw, multi-hop trade) into checked pool calls.
//!
//! ## Integration Points
//!
//! - **Token ledger**: any implementation of [`Token`]; [`MockToken`] is the
//!   in-memory ledger used by tests and the scenario simulator
//! - **Registry**: [`PairFactory`] resolves token pairs to [`Pair`] handles
//! - **Entry point**: [`Router`] is the only component end users call
//! - **Quoting**: [`V2Math`] is pure and safe to call from any thread
//!
//! ## Architecture Role
//!
//! ```text
//! caller ──► Router ──► PairFactory ──► Pair (RwLock<PairState>)
//!              │                          │
//!              └──► V2Math                └──► Token (custody balances)
//! ```
//!
//! ## Performance Profile
//!
//! - **Arithmetic**: 256-bit integers with checked multiplication; reserves
//!   are capped at 2^112 - 1 so every invariant product fits
//! - **Contention**: one lock per pool, lock-free registry lookups
//! - **Allocation**: none on the quote path beyond the returned amounts vector

pub mod error;
pub mod factory;
pub mod math;
pub mod pair;
pub mod pool_traits;
pub mod router;
pub mod token;
pub mod v2_math;

pub use error::{AmmError, Result};
pub use factory::PairFactory;
pub use pair::{
    BurnOutcome, MintOutcome, Pair, PairGuard, PairSnapshot, PairState, Reserves, SwapOutcome,
    MAX_RESERVE, MINIMUM_LIQUIDITY,
};
pub use pool_traits::AmmPool;
pub use router::{
    AddLiquidityParams, LiquidityAdded, LiquidityRemoved, RemovalQuote, RemoveLiquidityParams,
    Router, SwapExactInParams, SwapExactOutParams,
};
pub use token::{safe_transfer, safe_transfer_from, MockToken, Token, TokenDirectory};
pub use v2_math::{V2Math, V2PoolState, DEFAULT_FEE_BPS};

/// Common types for AMM calculations
pub use types::{Address, Amount, PoolId, TokenPair};
