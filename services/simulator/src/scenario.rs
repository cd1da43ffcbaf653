//! Scenario file format
//!
//! A scenario is a TOML document listing tokens, named accounts and an ordered
//! list of `[[step]]` tables. Amounts are decimal strings in whole-token units
//! ("1.5" of an 18-decimal token is 1.5e18 base units).
//!
//! ```toml
//! name = "two pools"
//! accounts = ["alice", "bob"]
//!
//! [[token]]
//! symbol = "WETH"
//!
//! [[step]]
//! action = "faucet"
//! account = "alice"
//! token = "WETH"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use types::{derive_address, Address};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, rename = "token")]
    pub tokens: Vec<TokenSpec>,

    #[serde(default)]
    pub accounts: Vec<String>,

    #[serde(default, rename = "step")]
    pub steps: Vec<StepEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TokenSpec {
    pub symbol: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_decimals")]
    pub decimals: u32,

    /// Explicit `0x` address; derived from the symbol when absent
    #[serde(default)]
    pub address: Option<String>,
}

fn default_decimals() -> u32 {
    types::WAD_DECIMALS
}

/// One step plus an optional expected failure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StepEntry {
    #[serde(flatten)]
    pub step: Step,

    /// Error variant the step must fail with, e.g. "InsufficientOutputAmount"
    #[serde(default)]
    pub expect_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Mint test tokens; `amount` defaults to the configured faucet size
    Faucet {
        account: String,
        token: String,
        #[serde(default)]
        amount: Option<String>,
    },
    /// Approve the router; unlimited when `amount` is absent
    Approve {
        account: String,
        token: String,
        #[serde(default)]
        amount: Option<String>,
    },
    CreatePair {
        token_a: String,
        token_b: String,
    },
    AddLiquidity {
        account: String,
        token_a: String,
        token_b: String,
        amount_a: String,
        amount_b: String,
        #[serde(default)]
        min_a: Option<String>,
        #[serde(default)]
        min_b: Option<String>,
        #[serde(default)]
        slippage_bps: Option<u32>,
        #[serde(default)]
        to: Option<String>,
    },
    /// Redeem either an explicit claim amount or a percentage of the position
    RemoveLiquidity {
        account: String,
        token_a: String,
        token_b: String,
        #[serde(default)]
        liquidity: Option<String>,
        #[serde(default)]
        percent: Option<u8>,
        #[serde(default)]
        min_a: Option<String>,
        #[serde(default)]
        min_b: Option<String>,
        #[serde(default)]
        slippage_bps: Option<u32>,
        #[serde(default)]
        to: Option<String>,
    },
    SwapExactIn {
        account: String,
        path: Vec<String>,
        amount_in: String,
        #[serde(default)]
        min_out: Option<String>,
        #[serde(default)]
        slippage_bps: Option<u32>,
        #[serde(default)]
        to: Option<String>,
    },
    SwapExactOut {
        account: String,
        path: Vec<String>,
        amount_out: String,
        #[serde(default)]
        max_in: Option<String>,
        #[serde(default)]
        slippage_bps: Option<u32>,
        #[serde(default)]
        to: Option<String>,
    },
}

impl Step {
    /// Action name as written in the scenario file
    pub fn action(&self) -> &'static str {
        match self {
            Step::Faucet { .. } => "faucet",
            Step::Approve { .. } => "approve",
            Step::CreatePair { .. } => "create_pair",
            Step::AddLiquidity { .. } => "add_liquidity",
            Step::RemoveLiquidity { .. } => "remove_liquidity",
            Step::SwapExactIn { .. } => "swap_exact_in",
            Step::SwapExactOut { .. } => "swap_exact_out",
        }
    }
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid scenario {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse scenario TOML")
    }
}

/// Stable address for a named account
pub fn account_address(name: &str) -> Address {
    derive_address(&[b"pairswap/account/", name.as_bytes()])
}

/// Stable address for a token symbol without an explicit address
pub fn token_address(symbol: &str) -> Address {
    derive_address(&[b"pairswap/token/", symbol.as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps_with_expectations() {
        let scenario = Scenario::parse(
            r#"
name = "parse"
accounts = ["alice"]

[[token]]
symbol = "AAA"

[[token]]
symbol = "USDC"
decimals = 6
address = "0x00000000000000000000000000000000000000aa"

[[step]]
action = "faucet"
account = "alice"
token = "AAA"

[[step]]
action = "swap_exact_in"
account = "alice"
path = ["AAA", "USDC"]
amount_in = "1.5"
min_out = "1000"
expect_error = "InsufficientOutputAmount"
"#,
        )
        .unwrap();

        assert_eq!(scenario.tokens.len(), 2);
        assert_eq!(scenario.tokens[0].decimals, 18);
        assert_eq!(scenario.tokens[1].decimals, 6);
        assert_eq!(scenario.steps.len(), 2);
        assert_eq!(
            scenario.steps[0].step,
            Step::Faucet {
                account: "alice".to_string(),
                token: "AAA".to_string(),
                amount: None,
            }
        );
        assert_eq!(scenario.steps[1].step.action(), "swap_exact_in");
        assert_eq!(
            scenario.steps[1].expect_error.as_deref(),
            Some("InsufficientOutputAmount")
        );
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let err = Scenario::parse(
            r#"
name = "bad"

[[step]]
action = "flash_loan"
"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_derived_addresses_are_distinct() {
        assert_eq!(account_address("alice"), account_address("alice"));
        assert_ne!(account_address("alice"), account_address("bob"));
        assert_ne!(account_address("WETH"), token_address("WETH"));
    }
}
