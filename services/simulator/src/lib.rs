//! # Pairswap Scenario Simulator
//!
//! Replays TOML scenarios (faucets, approvals, liquidity and swaps by named
//! accounts) against an in-memory engine and reports the resulting pools and
//! balances. Used to exercise the router end to end without a chain.

pub mod report;
pub mod runner;
pub mod scenario;

pub use report::{PoolReport, RunReport, StepRecord, StepStatus};
pub use runner::{error_kind, Simulator};
pub use scenario::{account_address, token_address, Scenario, Step, StepEntry, TokenSpec};
