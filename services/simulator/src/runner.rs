//! Executes scenarios against an in-memory engine
//!
//! Every step goes through the public [`Router`] surface as the named account,
//! exactly as an end user would call it. Token balances live in
//! [`MockToken`] ledgers that the runner creates from the scenario's token
//! list.

use crate::report::{PoolReport, RunReport, StepRecord};
use crate::scenario::{account_address, token_address, Scenario, Step, StepEntry};
use anyhow::{anyhow, bail, Context, Result};
use pairswap_amm::{
    AddLiquidityParams, AmmError, MockToken, PairFactory, RemovalQuote, RemoveLiquidityParams,
    Router, SwapExactInParams, SwapExactOutParams, Token, TokenDirectory, V2Math,
};
use pairswap_config::ServiceConfig;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::{
    format_units, parse_address, parse_units, to_decimal, Address, Amount, UnitsError, MAX_DECIMALS,
    WAD_DECIMALS,
};

/// Failure of a single step, separating engine rejections from scenario mistakes
#[derive(Debug)]
enum StepError {
    Engine(AmmError),
    Scenario(anyhow::Error),
}

impl From<AmmError> for StepError {
    fn from(err: AmmError) -> Self {
        StepError::Engine(err)
    }
}

impl From<anyhow::Error> for StepError {
    fn from(err: anyhow::Error) -> Self {
        StepError::Scenario(err)
    }
}

impl From<UnitsError> for StepError {
    fn from(err: UnitsError) -> Self {
        StepError::Scenario(err.into())
    }
}

type StepResult = std::result::Result<serde_json::Value, StepError>;

/// Variant name of an engine error, e.g. `PairNotFound`
pub fn error_kind(err: &AmmError) -> String {
    format!("{:?}", err)
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect()
}

pub struct Simulator {
    router: Router,
    tokens: BTreeMap<String, Arc<MockToken>>,
    accounts: BTreeMap<String, Address>,
    default_slippage_bps: u32,
    faucet_amount: String,
}

impl Simulator {
    pub fn new(config: &ServiceConfig) -> Self {
        let directory = Arc::new(TokenDirectory::new());
        let factory = Arc::new(PairFactory::new(config.engine.factory_address, directory));
        Self {
            router: Router::new(factory, config.engine.router_address),
            tokens: BTreeMap::new(),
            accounts: BTreeMap::new(),
            default_slippage_bps: config.simulator.default_slippage_bps,
            faucet_amount: config.simulator.faucet_amount.clone(),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Register the scenario's tokens and accounts
    pub fn load(&mut self, scenario: &Scenario) -> Result<()> {
        for declared in &scenario.tokens {
            if self.tokens.contains_key(&declared.symbol) {
                bail!("Token {} declared twice", declared.symbol);
            }
            if declared.decimals > MAX_DECIMALS {
                bail!(
                    "Token {} declares {} decimals, at most {} are supported",
                    declared.symbol,
                    declared.decimals,
                    MAX_DECIMALS
                );
            }
            let address = match &declared.address {
                Some(raw) => parse_address(raw)
                    .with_context(|| format!("Invalid address for token {}", declared.symbol))?,
                None => token_address(&declared.symbol),
            };
            let name = declared.name.clone().unwrap_or_else(|| declared.symbol.clone());
            let token = Arc::new(MockToken::with_decimals(
                address,
                name,
                declared.symbol.clone(),
                declared.decimals,
            ));
            self.router.factory().register_token(token.clone());
            self.tokens.insert(declared.symbol.clone(), token);
        }
        for name in &scenario.accounts {
            self.accounts.insert(name.clone(), account_address(name));
        }
        info!(
            "📋 Loaded scenario '{}': {} tokens, {} accounts, {} steps",
            scenario.name,
            self.tokens.len(),
            self.accounts.len(),
            scenario.steps.len()
        );
        Ok(())
    }

    /// Load and execute every step, failing on the first unexpected outcome
    pub fn run(&mut self, scenario: &Scenario) -> Result<RunReport> {
        self.load(scenario)?;

        let mut records = Vec::with_capacity(scenario.steps.len());
        for (index, entry) in scenario.steps.iter().enumerate() {
            let record = self
                .run_step(index, entry)
                .with_context(|| format!("Step {} ({}) failed", index, entry.step.action()))?;
            records.push(record);
        }

        let report = RunReport {
            scenario: scenario.name.clone(),
            steps: records,
            pools: self.pool_reports()?,
            balances: self.balances()?,
        };
        info!("✅ Scenario '{}' completed", scenario.name);
        Ok(report)
    }

    fn run_step(&self, index: usize, entry: &StepEntry) -> Result<StepRecord> {
        let action = entry.step.action();
        match (self.execute(&entry.step), &entry.expect_error) {
            (Ok(detail), None) => {
                info!("Step {} {}: ok", index, action);
                Ok(StepRecord::ok(index, action, detail))
            }
            (Ok(_), Some(expected)) => {
                bail!("expected {} but the step succeeded", expected)
            }
            (Err(StepError::Engine(err)), Some(expected)) if error_kind(&err) == *expected => {
                info!("Step {} {}: rejected as expected ({})", index, action, err);
                Ok(StepRecord::rejected(index, action, error_kind(&err)))
            }
            (Err(StepError::Engine(err)), expected) => {
                warn!("Step {} {}: {}", index, action, err);
                match expected {
                    Some(expected) => bail!("expected {} but got {}", expected, error_kind(&err)),
                    None => Err(anyhow!(err)),
                }
            }
            (Err(StepError::Scenario(err)), _) => Err(err),
        }
    }

    fn execute(&self, step: &Step) -> StepResult {
        match step {
            Step::Faucet {
                account,
                token,
                amount,
            } => {
                let holder = self.account(account)?;
                let token = self.token(token)?;
                let raw = amount.as_deref().unwrap_or(&self.faucet_amount);
                let amount = self.amount(token, raw)?;
                token.mint(amount, holder)?;
                debug!("Faucet {} {} to {}", raw, token.symbol(), account);
                Ok(json!({ "minted": raw }))
            }
            Step::Approve {
                account,
                token,
                amount,
            } => {
                let owner = self.account(account)?;
                let token = self.token(token)?;
                let allowance = match amount {
                    Some(raw) => self.amount(token, raw)?,
                    None => Amount::MAX,
                };
                if !token.approve(owner, self.router.address(), allowance) {
                    return Err(StepError::Scenario(anyhow!(
                        "approve rejected for {}",
                        token.symbol()
                    )));
                }
                Ok(json!({ "unlimited": amount.is_none() }))
            }
            Step::CreatePair { token_a, token_b } => {
                let id = self
                    .router
                    .create_pair(self.token(token_a)?.address(), self.token(token_b)?.address())?;
                Ok(json!({ "pool": id }))
            }
            Step::AddLiquidity {
                account,
                token_a,
                token_b,
                amount_a,
                amount_b,
                min_a,
                min_b,
                slippage_bps,
                to,
            } => {
                let caller = self.account(account)?;
                let (ta, tb) = (self.token(token_a)?, self.token(token_b)?);
                let desired_a = self.amount(ta, amount_a)?;
                let desired_b = self.amount(tb, amount_b)?;
                let bps = slippage_bps.unwrap_or(self.default_slippage_bps);
                let params = AddLiquidityParams {
                    asset_a: ta.address(),
                    asset_b: tb.address(),
                    amount_a_desired: desired_a,
                    amount_b_desired: desired_b,
                    amount_a_min: self.bound(ta, min_a, || V2Math::apply_slippage(desired_a, bps))?,
                    amount_b_min: self.bound(tb, min_b, || V2Math::apply_slippage(desired_b, bps))?,
                    to: self.recipient(to, caller)?,
                };
                let added = self.router.add_liquidity(caller, &params)?;
                Ok(json!({
                    "amount_a": format_units(added.amount_a, ta.decimals())?,
                    "amount_b": format_units(added.amount_b, tb.decimals())?,
                    "liquidity": format_units(added.liquidity, WAD_DECIMALS)?,
                }))
            }
            Step::RemoveLiquidity {
                account,
                token_a,
                token_b,
                liquidity,
                percent,
                min_a,
                min_b,
                slippage_bps,
                to,
            } => {
                let caller = self.account(account)?;
                let (ta, tb) = (self.token(token_a)?, self.token(token_b)?);
                let quote = match (liquidity, percent) {
                    (Some(raw), None) => {
                        let liquidity = parse_units(raw, WAD_DECIMALS)
                            .with_context(|| format!("Invalid liquidity '{}'", raw))?;
                        let pair = self.router.factory().pair_for(ta.address(), tb.address())?;
                        let preview = pair.preview_burn(caller, liquidity)?;
                        let (amount_a, amount_b) = if ta.address() == pair.token0() {
                            (preview.amount0, preview.amount1)
                        } else {
                            (preview.amount1, preview.amount0)
                        };
                        RemovalQuote {
                            liquidity,
                            amount_a,
                            amount_b,
                        }
                    }
                    (None, Some(percent)) => self.router.quote_remove_liquidity(
                        ta.address(),
                        tb.address(),
                        caller,
                        *percent,
                    )?,
                    _ => {
                        return Err(StepError::Scenario(anyhow!(
                            "remove_liquidity needs exactly one of liquidity or percent"
                        )))
                    }
                };
                let bps = slippage_bps.unwrap_or(self.default_slippage_bps);
                let params = RemoveLiquidityParams {
                    asset_a: ta.address(),
                    asset_b: tb.address(),
                    liquidity: quote.liquidity,
                    amount_a_min: self.bound(ta, min_a, || V2Math::apply_slippage(quote.amount_a, bps))?,
                    amount_b_min: self.bound(tb, min_b, || V2Math::apply_slippage(quote.amount_b, bps))?,
                    to: self.recipient(to, caller)?,
                };
                let removed = self.router.remove_liquidity(caller, &params)?;
                Ok(json!({
                    "liquidity": format_units(quote.liquidity, WAD_DECIMALS)?,
                    "amount_a": format_units(removed.amount_a, ta.decimals())?,
                    "amount_b": format_units(removed.amount_b, tb.decimals())?,
                }))
            }
            Step::SwapExactIn {
                account,
                path,
                amount_in,
                min_out,
                slippage_bps,
                to,
            } => {
                let caller = self.account(account)?;
                let (route, first, last) = self.route(path)?;
                let amount_in = self.amount(first, amount_in)?;
                let amount_out_min = match min_out {
                    Some(raw) => self.amount(last, raw)?,
                    None => {
                        let quoted = self.router.get_amounts_out(amount_in, &route)?;
                        let expected = quoted.last().copied().unwrap_or_default();
                        V2Math::apply_slippage(
                            expected,
                            slippage_bps.unwrap_or(self.default_slippage_bps),
                        )
                    }
                };
                let params = SwapExactInParams {
                    amount_in,
                    amount_out_min,
                    path: route,
                    to: self.recipient(to, caller)?,
                };
                let amounts = self.router.swap_exact_tokens_for_tokens(caller, &params)?;
                Ok(self.describe_amounts(path, &amounts)?)
            }
            Step::SwapExactOut {
                account,
                path,
                amount_out,
                max_in,
                slippage_bps,
                to,
            } => {
                let caller = self.account(account)?;
                let (route, first, last) = self.route(path)?;
                let amount_out = self.amount(last, amount_out)?;
                let amount_in_max = match max_in {
                    Some(raw) => self.amount(first, raw)?,
                    None => {
                        let quoted = self.router.get_amounts_in(amount_out, &route)?;
                        let expected = quoted.first().copied().unwrap_or_default();
                        let bps = slippage_bps.unwrap_or(self.default_slippage_bps);
                        let tolerance = expected - V2Math::apply_slippage(expected, bps);
                        expected.saturating_add(tolerance)
                    }
                };
                let params = SwapExactOutParams {
                    amount_out,
                    amount_in_max,
                    path: route,
                    to: self.recipient(to, caller)?,
                };
                let amounts = self.router.swap_tokens_for_exact_tokens(caller, &params)?;
                Ok(self.describe_amounts(path, &amounts)?)
            }
        }
    }

    /// Quote a path in whole-token units against the current pool state
    pub fn quote(&self, path: &[String], amount: &str, exact_out: bool) -> Result<Vec<String>> {
        let (route, first, last) = self.route(path)?;
        let amounts = if exact_out {
            self.router.get_amounts_in(self.amount(last, amount)?, &route)?
        } else {
            self.router.get_amounts_out(self.amount(first, amount)?, &route)?
        };
        path.iter()
            .zip(amounts)
            .map(|(symbol, amount)| Ok(format_units(amount, self.token(symbol)?.decimals())?))
            .collect()
    }

    pub fn pool_reports(&self) -> Result<Vec<PoolReport>> {
        let symbols: HashMap<Address, &Arc<MockToken>> = self
            .tokens
            .values()
            .map(|token| (token.address(), token))
            .collect();

        self.router
            .factory()
            .snapshots()
            .into_iter()
            .map(|snapshot| {
                let token0 = symbols
                    .get(&snapshot.token0)
                    .ok_or_else(|| anyhow!("Pool {} holds an unknown token", snapshot.id))?;
                let token1 = symbols
                    .get(&snapshot.token1)
                    .ok_or_else(|| anyhow!("Pool {} holds an unknown token", snapshot.id))?;
                let one = parse_units("1", token0.decimals())?;
                let price = V2Math::quote(one, snapshot.reserve0, snapshot.reserve1)
                    .ok()
                    .map(|price| to_decimal(price, token1.decimals()))
                    .transpose()?;
                Ok(PoolReport {
                    id: snapshot.id,
                    address: snapshot.address,
                    token0: token0.symbol().to_string(),
                    token1: token1.symbol().to_string(),
                    reserve0: to_decimal(snapshot.reserve0, token0.decimals())?,
                    reserve1: to_decimal(snapshot.reserve1, token1.decimals())?,
                    total_claims: to_decimal(snapshot.total_claims, WAD_DECIMALS)?,
                    price0: price,
                })
            })
            .collect()
    }

    /// Whole-token balances per account and symbol
    pub fn balances(&self) -> Result<BTreeMap<String, BTreeMap<String, rust_decimal::Decimal>>> {
        let mut out = BTreeMap::new();
        for (name, address) in &self.accounts {
            let mut held = BTreeMap::new();
            for (symbol, token) in &self.tokens {
                let balance = token.balance_of(*address);
                if !balance.is_zero() {
                    held.insert(symbol.clone(), to_decimal(balance, token.decimals())?);
                }
            }
            out.insert(name.clone(), held);
        }
        Ok(out)
    }

    pub fn account(&self, name: &str) -> Result<Address> {
        self.accounts
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("Unknown account '{}'", name))
    }

    pub fn token(&self, symbol: &str) -> Result<&Arc<MockToken>> {
        self.tokens
            .get(symbol)
            .ok_or_else(|| anyhow!("Unknown token '{}'", symbol))
    }

    fn amount(&self, token: &MockToken, raw: &str) -> Result<Amount> {
        parse_units(raw, token.decimals())
            .with_context(|| format!("Invalid {} amount '{}'", token.symbol(), raw))
    }

    fn bound(
        &self,
        token: &MockToken,
        explicit: &Option<String>,
        derived: impl FnOnce() -> Amount,
    ) -> Result<Amount> {
        match explicit {
            Some(raw) => self.amount(token, raw),
            None => Ok(derived()),
        }
    }

    /// Recipient may be an account name or a raw address; defaults to the caller
    fn recipient(&self, to: &Option<String>, caller: Address) -> Result<Address> {
        match to {
            None => Ok(caller),
            Some(name) => match self.accounts.get(name) {
                Some(address) => Ok(*address),
                None => parse_address(name).with_context(|| format!("Unknown recipient '{}'", name)),
            },
        }
    }

    fn route(&self, path: &[String]) -> Result<(Vec<Address>, &Arc<MockToken>, &Arc<MockToken>)> {
        let tokens = path
            .iter()
            .map(|symbol| self.token(symbol))
            .collect::<Result<Vec<_>>>()?;
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            bail!("Swap path is empty");
        };
        Ok((
            tokens.iter().map(|token| token.address()).collect(),
            *first,
            *last,
        ))
    }

    fn describe_amounts(&self, path: &[String], amounts: &[Amount]) -> Result<serde_json::Value> {
        let rendered = path
            .iter()
            .zip(amounts)
            .map(|(symbol, amount)| {
                let decimals = self.token(symbol)?.decimals();
                Ok(json!({ "token": symbol, "amount": format_units(*amount, decimals)? }))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({ "amounts": rendered }))
    }
}
