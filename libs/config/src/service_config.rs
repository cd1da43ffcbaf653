//! Service Configuration Module
//!
//! Provides configuration loading for Pairswap binaries. Values are layered:
//! built-in defaults, then an optional TOML file, then `PAIRSWAP_` environment
//! variables (`__` separates nested keys, e.g. `PAIRSWAP_GLOBAL__LOG_LEVEL`).

use crate::service;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use types::{derive_address, Address};

/// Main service configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Global settings
    pub global: GlobalConfig,

    /// Engine identities
    pub engine: EngineConfig,

    /// Scenario simulator settings
    pub simulator: SimulatorConfig,
}

/// Log output format
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Global configuration settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Addresses the engine acts under
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Hashed into every pool's custody address
    pub factory_address: Address,

    /// Spender callers approve before adding liquidity or swapping
    pub router_address: Address,
}

/// Scenario simulator settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    pub default_slippage_bps: u32,

    /// Whole tokens minted per faucet step without an explicit amount
    pub faucet_amount: String,

    /// Where the final pool report is written; stdout when unset
    pub output: Option<PathBuf>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: service::logging::DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            factory_address: derive_address(&[service::engine::FACTORY_SEED]),
            router_address: derive_address(&[service::engine::ROUTER_SEED]),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            default_slippage_bps: service::simulator::DEFAULT_SLIPPAGE_BPS,
            faucet_amount: service::simulator::FAUCET_AMOUNT.to_string(),
            output: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`ServiceConfig::load`] with an explicit variable map standing in
    /// for the process environment
    pub fn load_with_env(path: Option<&Path>, vars: Option<HashMap<String, String>>) -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .context("Failed to serialize default configuration")?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            info!("Loading config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (PAIRSWAP_ prefix)
        builder = builder.add_source(
            Environment::with_prefix("PAIRSWAP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(vars),
        );

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// Reject settings no binary can run with
    pub fn validate(&self) -> Result<()> {
        if self.global.log_level.trim().is_empty() {
            bail!("global.log_level must not be empty");
        }
        if self.engine.factory_address.is_zero() || self.engine.router_address.is_zero() {
            bail!("engine addresses must be non-zero");
        }
        if self.engine.factory_address == self.engine.router_address {
            bail!("engine.factory_address and engine.router_address must differ");
        }
        if self.simulator.default_slippage_bps > service::simulator::MAX_SLIPPAGE_BPS {
            bail!(
                "simulator.default_slippage_bps {} exceeds {}",
                self.simulator.default_slippage_bps,
                service::simulator::MAX_SLIPPAGE_BPS
            );
        }
        Ok(())
    }

    /// Expand environment variables in path values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        if let Some(output) = &self.simulator.output {
            let raw = output.to_string_lossy();
            let expanded = shellexpand::full(&raw).context("Failed to expand output path")?;
            self.simulator.output = Some(PathBuf::from(expanded.as_ref()));
        }
        Ok(())
    }

    /// Render as TOML, e.g. to print the effective configuration
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Convenience function to load configuration with defaults
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let mut config = ServiceConfig::load(path)?;
    config.expand_env_vars()?;
    Ok(config)
}
