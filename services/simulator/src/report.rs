//! JSON run report
//!
//! Amounts are rendered in whole-token units as [`Decimal`] values.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use types::{Address, PoolId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub scenario: String,
    pub steps: Vec<StepRecord>,
    pub pools: Vec<PoolReport>,
    /// Non-zero balances per account, keyed by token symbol
    pub balances: BTreeMap<String, BTreeMap<String, Decimal>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub action: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    /// Failed with the error the scenario expected
    Rejected,
}

impl StepRecord {
    pub fn ok(index: usize, action: &str, detail: serde_json::Value) -> Self {
        Self {
            index,
            action: action.to_string(),
            status: StepStatus::Ok,
            error: None,
            detail,
        }
    }

    pub fn rejected(index: usize, action: &str, error: String) -> Self {
        Self {
            index,
            action: action.to_string(),
            status: StepStatus::Rejected,
            error: Some(error),
            detail: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolReport {
    pub id: PoolId,
    pub address: Address,
    pub token0: String,
    pub token1: String,
    pub reserve0: Decimal,
    pub reserve1: Decimal,
    pub total_claims: Decimal,
    /// token1 paid for one whole token0; absent while the pool is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price0: Option<Decimal>,
}

impl RunReport {
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn pool(&self, token0: &str, token1: &str) -> Option<&PoolReport> {
        self.pools.iter().find(|pool| {
            (pool.token0 == token0 && pool.token1 == token1)
                || (pool.token0 == token1 && pool.token1 == token0)
        })
    }
}
