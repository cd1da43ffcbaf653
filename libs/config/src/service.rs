//! Service defaults
//!
//! Named constants used when a setting is absent from every configuration
//! source.

/// Logging defaults
pub mod logging {
    /// Level used when neither the config file nor `RUST_LOG` sets one
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

/// Engine identity defaults
pub mod engine {
    /// Seed hashed into the default factory address
    pub const FACTORY_SEED: &[u8] = b"pairswap/factory";

    /// Seed hashed into the default router (spender) address
    pub const ROUTER_SEED: &[u8] = b"pairswap/router";
}

/// Scenario simulator defaults
pub mod simulator {
    /// Slippage tolerance applied to derived minimums (0.5%)
    pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

    /// Upper bound for any slippage tolerance
    pub const MAX_SLIPPAGE_BPS: u32 = 10_000;

    /// Whole tokens handed out per faucet request
    pub const FAUCET_AMOUNT: &str = "1000";
}
