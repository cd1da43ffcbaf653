//! # Pairswap Configuration
//!
//! Centralized configuration loading and named defaults for Pairswap
//! binaries.
//!
//! ## Features
//!
//! - **Layered loading**: defaults, optional TOML file, `PAIRSWAP_` environment
//! - **Service defaults**: slippage tolerance, faucet size, engine identities
//! - **Validation**: settings no binary can run with are rejected at load time
//!
//! ## Usage
//!
//! ```no_run
//! use pairswap_config::{load_config, service};
//!
//! let config = load_config(None).unwrap();
//! assert!(config.simulator.default_slippage_bps <= service::simulator::MAX_SLIPPAGE_BPS);
//! ```

pub mod service;
pub mod service_config;

// Re-export commonly used types
pub use service_config::{
    load_config, EngineConfig, GlobalConfig, LogFormat, ServiceConfig, SimulatorConfig,
};
