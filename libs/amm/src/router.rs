//! User-facing router
//!
//! ## Purpose
//!
//! Composes the registry, the pool ledgers and the quoting math into the
//! operations end users call: add/remove liquidity with slippage bounds and
//! exact-input/exact-output multi-hop swaps. The caller identity is always an
//! explicit argument; the router itself is the approved spender that pulls
//! tokens with `transfer_from`.
//!
//! ## Locking
//!
//! Every operation holds the write lock of each pool it touches from the
//! moment it reads reserves until its last effect. Multi-hop swaps lock the
//! distinct pools of a path in ascending [`PoolId`] order, recompute amounts
//! from the locked reserves and simulate every hop on projected balances
//! before the first token moves. A token that refuses a transfer midway
//! unwinds the movements already made and restores the locked pool state.

use crate::error::{AmmError, Result};
use crate::factory::PairFactory;
use crate::pair::{Pair, PairGuard, PairState};
use crate::token::{safe_transfer, safe_transfer_from, Token};
use crate::v2_math::{V2Math, V2PoolState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::{Address, Amount, PoolId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityParams {
    pub asset_a: Address,
    pub asset_b: Address,
    pub amount_a_desired: Amount,
    pub amount_b_desired: Amount,
    pub amount_a_min: Amount,
    pub amount_b_min: Amount,
    pub to: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidityParams {
    pub asset_a: Address,
    pub asset_b: Address,
    pub liquidity: Amount,
    pub amount_a_min: Amount,
    pub amount_b_min: Amount,
    pub to: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapExactInParams {
    pub amount_in: Amount,
    pub amount_out_min: Amount,
    pub path: Vec<Address>,
    pub to: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapExactOutParams {
    pub amount_out: Amount,
    pub amount_in_max: Amount,
    pub path: Vec<Address>,
    pub to: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityAdded {
    pub amount_a: Amount,
    pub amount_b: Amount,
    pub liquidity: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityRemoved {
    pub amount_a: Amount,
    pub amount_b: Amount,
}

/// Claims matching a share of a position and what they would redeem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalQuote {
    pub liquidity: Amount,
    pub amount_a: Amount,
    pub amount_b: Amount,
}

pub struct Router {
    address: Address,
    factory: Arc<PairFactory>,
}

impl Router {
    pub fn new(factory: Arc<PairFactory>, address: Address) -> Self {
        Self { address, factory }
    }

    /// Spender identity callers approve
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn factory(&self) -> &Arc<PairFactory> {
        &self.factory
    }

    pub fn create_pair(&self, asset_a: Address, asset_b: Address) -> Result<PoolId> {
        self.factory.create_pair(asset_a, asset_b)
    }

    pub fn get_reserves(&self, asset_a: Address, asset_b: Address) -> Result<(Amount, Amount)> {
        V2Math::get_reserves(&self.factory, asset_a, asset_b)
    }

    pub fn quote(&self, amount_a: Amount, reserve_a: Amount, reserve_b: Amount) -> Result<Amount> {
        V2Math::quote(amount_a, reserve_a, reserve_b)
    }

    pub fn get_amounts_out(&self, amount_in: Amount, path: &[Address]) -> Result<Vec<Amount>> {
        V2Math::get_amounts_out(&self.factory, amount_in, path)
    }

    pub fn get_amounts_in(&self, amount_out: Amount, path: &[Address]) -> Result<Vec<Amount>> {
        V2Math::get_amounts_in(&self.factory, amount_out, path)
    }

    /// Amount of `asset_a` worth one whole unit of `asset_b`
    pub fn price(&self, asset_a: Address, asset_b: Address) -> Result<Amount> {
        V2Math::price(&self.factory, asset_a, asset_b)
    }

    /// Deposit both assets at the pool ratio and mint claims to `params.to`
    ///
    /// The pool is created on first use and stays registered even if the
    /// deposit itself is rejected.
    pub fn add_liquidity(&self, caller: Address, params: &AddLiquidityParams) -> Result<LiquidityAdded> {
        let pair = self.resolve_or_create(params.asset_a, params.asset_b)?;
        let mut guard = pair.lock();

        let (reserve_a, reserve_b) = guard.reserves_for(params.asset_a)?;
        let (amount_a, amount_b) = Self::optimal_amounts(params, reserve_a, reserve_b)?;

        let token_a = pair.token(params.asset_a)?;
        let token_b = pair.token(params.asset_b)?;
        self.ensure_pullable(token_a.as_ref(), caller, amount_a)?;
        self.ensure_pullable(token_b.as_ref(), caller, amount_b)?;

        // Reject deposits that would mint nothing before any token moves
        let (amount0, amount1) = if params.asset_a == pair.token0() {
            (amount_a, amount_b)
        } else {
            (amount_b, amount_a)
        };
        let (balance0, balance1) = pair.balances();
        guard.state().preview_mint(
            balance0.checked_add(amount0).ok_or(AmmError::Overflow)?,
            balance1.checked_add(amount1).ok_or(AmmError::Overflow)?,
        )?;

        let mut moved = Movements::default();
        let minted = moved
            .pull(token_a, self.address, caller, pair.address(), amount_a)
            .and_then(|_| moved.pull(token_b, self.address, caller, pair.address(), amount_b))
            .and_then(|_| guard.mint(params.to));
        let minted = match minted {
            Ok(minted) => minted,
            Err(err) => {
                moved.unwind();
                return Err(err);
            }
        };

        info!(
            "💧 Added liquidity to {}: {} {} + {} {} -> {} claims",
            pair.id(),
            amount_a,
            token_a.symbol(),
            amount_b,
            token_b.symbol(),
            minted.claims
        );
        Ok(LiquidityAdded {
            amount_a,
            amount_b,
            liquidity: minted.claims,
        })
    }

    /// Redeem `params.liquidity` claims held by `caller`
    pub fn remove_liquidity(
        &self,
        caller: Address,
        params: &RemoveLiquidityParams,
    ) -> Result<LiquidityRemoved> {
        let pair = self.factory.pair_for(params.asset_a, params.asset_b)?;
        let mut guard = pair.lock();

        let preview = guard.state().preview_burn(caller, params.liquidity)?;
        let (amount_a, amount_b) = if params.asset_a == pair.token0() {
            (preview.amount0, preview.amount1)
        } else {
            (preview.amount1, preview.amount0)
        };
        if amount_a < params.amount_a_min {
            return Err(AmmError::InsufficientAAmount);
        }
        if amount_b < params.amount_b_min {
            return Err(AmmError::InsufficientBAmount);
        }

        guard.burn(caller, params.liquidity, params.to)?;
        info!(
            "🔥 Removed {} claims from {}: {} + {}",
            params.liquidity,
            pair.id(),
            amount_a,
            amount_b
        );
        Ok(LiquidityRemoved { amount_a, amount_b })
    }

    /// Claims for `percent` of `holder`'s position and the tokens they redeem
    pub fn quote_remove_liquidity(
        &self,
        asset_a: Address,
        asset_b: Address,
        holder: Address,
        percent: u8,
    ) -> Result<RemovalQuote> {
        if percent == 0 || percent > 100 {
            return Err(AmmError::InsufficientAmount);
        }
        let pair = self.factory.pair_for(asset_a, asset_b)?;
        let liquidity = pair.claim_balance_of(holder) * u64::from(percent) / 100u64;
        let preview = pair.preview_burn(holder, liquidity)?;
        let (amount_a, amount_b) = if asset_a == pair.token0() {
            (preview.amount0, preview.amount1)
        } else {
            (preview.amount1, preview.amount0)
        };
        Ok(RemovalQuote {
            liquidity,
            amount_a,
            amount_b,
        })
    }

    /// Sell exactly `amount_in` of `path[0]` for as much of the last asset as possible
    pub fn swap_exact_tokens_for_tokens(
        &self,
        caller: Address,
        params: &SwapExactInParams,
    ) -> Result<Vec<Amount>> {
        let hops = self.resolve_path(&params.path)?;
        let mut locked = LockedPath::acquire(&hops);

        let amounts = V2Math::amounts_out(params.amount_in, &locked.states(&params.path)?)?;
        let amount_out = amounts.last().copied().unwrap_or_default();
        if amount_out < params.amount_out_min {
            return Err(AmmError::InsufficientOutputAmount);
        }

        self.execute_path(caller, &params.path, &amounts, &mut locked, params.to)?;
        info!(
            "🔄 Swapped exact {} in for {} out over {} hop(s)",
            params.amount_in,
            amount_out,
            hops.len()
        );
        Ok(amounts)
    }

    /// Buy exactly `amount_out` of the last asset for as little of `path[0]` as possible
    pub fn swap_tokens_for_exact_tokens(
        &self,
        caller: Address,
        params: &SwapExactOutParams,
    ) -> Result<Vec<Amount>> {
        let hops = self.resolve_path(&params.path)?;
        let mut locked = LockedPath::acquire(&hops);

        let amounts = V2Math::amounts_in(params.amount_out, &locked.states(&params.path)?)?;
        let amount_in = amounts.first().copied().unwrap_or_default();
        if amount_in > params.amount_in_max {
            return Err(AmmError::ExcessiveInputAmount);
        }

        self.execute_path(caller, &params.path, &amounts, &mut locked, params.to)?;
        info!(
            "🔄 Swapped {} in for exact {} out over {} hop(s)",
            amount_in,
            params.amount_out,
            hops.len()
        );
        Ok(amounts)
    }

    fn resolve_or_create(&self, asset_a: Address, asset_b: Address) -> Result<Arc<Pair>> {
        if let Some(id) = self.factory.get_pair(asset_a, asset_b) {
            return self.pair(id, asset_a, asset_b);
        }
        match self.factory.create_pair(asset_a, asset_b) {
            Ok(id) => self.pair(id, asset_a, asset_b),
            // Lost a creation race, use the winner's pool
            Err(AmmError::PairExists) => self.factory.pair_for(asset_a, asset_b),
            Err(err) => Err(err),
        }
    }

    fn pair(&self, id: PoolId, asset_a: Address, asset_b: Address) -> Result<Arc<Pair>> {
        self.factory
            .pair(id)
            .ok_or(AmmError::PairNotFound(asset_a, asset_b))
    }

    fn resolve_path(&self, path: &[Address]) -> Result<Vec<Arc<Pair>>> {
        if path.len() < 2 {
            return Err(AmmError::InvalidPath);
        }
        path.windows(2)
            .map(|hop| self.factory.pair_for(hop[0], hop[1]))
            .collect()
    }

    fn optimal_amounts(
        params: &AddLiquidityParams,
        reserve_a: Amount,
        reserve_b: Amount,
    ) -> Result<(Amount, Amount)> {
        if reserve_a.is_zero() && reserve_b.is_zero() {
            return Ok((params.amount_a_desired, params.amount_b_desired));
        }

        let amount_b_optimal = V2Math::quote(params.amount_a_desired, reserve_a, reserve_b)?;
        if amount_b_optimal <= params.amount_b_desired {
            if amount_b_optimal < params.amount_b_min {
                return Err(AmmError::InsufficientBAmount);
            }
            return Ok((params.amount_a_desired, amount_b_optimal));
        }

        let amount_a_optimal = V2Math::quote(params.amount_b_desired, reserve_b, reserve_a)?;
        if amount_a_optimal < params.amount_a_min {
            return Err(AmmError::InsufficientAAmount);
        }
        Ok((amount_a_optimal, params.amount_b_desired))
    }

    fn ensure_pullable(&self, token: &dyn Token, owner: Address, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        if token.balance_of(owner) < amount || token.allowance(owner, self.address) < amount {
            return Err(AmmError::TransferFailed {
                token: token.address(),
                from: owner,
                to: self.address,
            });
        }
        Ok(())
    }

    /// Simulate every hop on projected balances, then move tokens for real
    fn execute_path(
        &self,
        caller: Address,
        path: &[Address],
        amounts: &[Amount],
        locked: &mut LockedPath<'_>,
        to: Address,
    ) -> Result<()> {
        let plan = locked.plan(path, amounts, to)?;
        let saved = locked.saved_states();

        let hops = locked.hops;
        let first = &hops[0];
        let token_in = first.token(path[0])?;
        self.ensure_pullable(token_in.as_ref(), caller, amounts[0])?;

        let mut moved = Movements::default();
        let executed = moved
            .pull(token_in, self.address, caller, first.address(), amounts[0])
            .and_then(|_| Self::run_hops(path, &plan, &mut *locked, &mut moved));
        if let Err(err) = executed {
            moved.unwind();
            locked.restore(saved);
            return Err(err);
        }
        debug!("Executed {} hop(s) for {:?}", plan.len(), caller);
        Ok(())
    }

    fn run_hops(
        path: &[Address],
        plan: &[HopStep],
        locked: &mut LockedPath<'_>,
        moved: &mut Movements,
    ) -> Result<()> {
        let hops = locked.hops;
        for (i, (step, pair)) in plan.iter().zip(hops).enumerate() {
            locked
                .guard_mut(step.pool)?
                .swap(step.amount0_out, step.amount1_out, step.recipient)?;
            let amount_out = step.amount0_out.max(step.amount1_out);
            moved.record(pair.token(path[i + 1])?, pair.address(), step.recipient, amount_out);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("address", &self.address)
            .field("factory", &self.factory)
            .finish()
    }
}

/// Token movements made by one operation, undone in reverse on failure
#[derive(Default)]
struct Movements {
    done: Vec<(Arc<dyn Token>, Address, Address, Amount)>,
}

impl Movements {
    /// `transfer_from` with `spender` as the approved party, recorded on success
    fn pull(
        &mut self,
        token: &Arc<dyn Token>,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        safe_transfer_from(token.as_ref(), spender, from, to, amount)?;
        self.record(token, from, to, amount);
        Ok(())
    }

    fn record(&mut self, token: &Arc<dyn Token>, from: Address, to: Address, amount: Amount) {
        if !amount.is_zero() && from != to {
            self.done.push((Arc::clone(token), from, to, amount));
        }
    }

    fn unwind(self) {
        for (token, from, to, amount) in self.done.into_iter().rev() {
            if let Err(err) = safe_transfer(token.as_ref(), to, from, amount) {
                warn!(
                    "Could not return {} {} from {:?} to {:?}: {}",
                    amount,
                    token.symbol(),
                    to,
                    from,
                    err
                );
            }
        }
    }
}

/// One validated swap call of a path
#[derive(Debug, Clone, Copy)]
struct HopStep {
    pool: PoolId,
    amount0_out: Amount,
    amount1_out: Amount,
    recipient: Address,
}

/// Projected pool state while a path is simulated
struct Projection {
    state: PairState,
    balances: (Amount, Amount),
}

/// Write locks over every distinct pool of a path
struct LockedPath<'a> {
    hops: &'a [Arc<Pair>],
    guards: BTreeMap<PoolId, PairGuard<'a>>,
}

impl<'a> LockedPath<'a> {
    /// Lock in ascending pool id order so opposite paths cannot deadlock
    fn acquire(hops: &'a [Arc<Pair>]) -> Self {
        let mut ordered: Vec<&'a Arc<Pair>> = hops.iter().collect();
        ordered.sort_by_key(|pair| pair.id());
        ordered.dedup_by_key(|pair| pair.id());

        let mut guards = BTreeMap::new();
        for pair in ordered {
            guards.insert(pair.id(), pair.lock());
        }
        Self { hops, guards }
    }

    fn saved_states(&self) -> BTreeMap<PoolId, PairState> {
        self.guards
            .iter()
            .map(|(id, guard)| (*id, guard.state().clone()))
            .collect()
    }

    fn restore(&mut self, saved: BTreeMap<PoolId, PairState>) {
        for (id, state) in saved {
            if let Some(guard) = self.guards.get_mut(&id) {
                guard.restore(state);
            }
        }
    }

    fn guard(&self, id: PoolId) -> Result<&PairGuard<'a>> {
        self.guards.get(&id).ok_or(AmmError::InvalidPath)
    }

    fn guard_mut(&mut self, id: PoolId) -> Result<&mut PairGuard<'a>> {
        self.guards.get_mut(&id).ok_or(AmmError::InvalidPath)
    }

    /// Oriented reserves per hop, as seen under the locks
    fn states(&self, path: &[Address]) -> Result<Vec<V2PoolState>> {
        self.hops
            .iter()
            .zip(path.iter())
            .map(|(pair, asset_in)| {
                let (reserve_in, reserve_out) = self.guard(pair.id())?.reserves_for(*asset_in)?;
                Ok(V2PoolState::new(reserve_in, reserve_out))
            })
            .collect()
    }

    /// Validate the whole path against projected custody balances
    ///
    /// A pool visited twice sees the effect of its earlier hop.
    fn plan(&self, path: &[Address], amounts: &[Amount], to: Address) -> Result<Vec<HopStep>> {
        let mut projections: BTreeMap<PoolId, Projection> = BTreeMap::new();
        for (id, guard) in &self.guards {
            projections.insert(
                *id,
                Projection {
                    state: guard.state().clone(),
                    balances: guard.pair().balances(),
                },
            );
        }

        Self::credit(&mut projections, &self.hops[0], path[0], amounts[0])?;

        let mut steps = Vec::with_capacity(self.hops.len());
        for (i, pair) in self.hops.iter().enumerate() {
            let amount_out = amounts[i + 1];
            let (amount0_out, amount1_out) = if path[i] == pair.token0() {
                (Amount::zero(), amount_out)
            } else {
                (amount_out, Amount::zero())
            };
            let next = self.hops.get(i + 1);
            let recipient = next.map(|pair| pair.address()).unwrap_or(to);

            let projection = projections.get_mut(&pair.id()).ok_or(AmmError::InvalidPath)?;
            let outcome = pair.plan_swap(
                &projection.state,
                projection.balances,
                amount0_out,
                amount1_out,
                recipient,
            )?;
            projection.state.commit_reserves(outcome.reserves);
            projection.balances = (outcome.reserves.reserve0, outcome.reserves.reserve1);

            if let Some(next) = next {
                if next.id() != pair.id() {
                    Self::credit(&mut projections, next, path[i + 1], amount_out)?;
                }
            }
            steps.push(HopStep {
                pool: pair.id(),
                amount0_out,
                amount1_out,
                recipient,
            });
        }
        Ok(steps)
    }

    fn credit(
        projections: &mut BTreeMap<PoolId, Projection>,
        pair: &Pair,
        asset: Address,
        amount: Amount,
    ) -> Result<()> {
        let projection = projections.get_mut(&pair.id()).ok_or(AmmError::InvalidPath)?;
        let (balance0, balance1) = projection.balances;
        projection.balances = if asset == pair.token0() {
            (balance0.checked_add(amount).ok_or(AmmError::Overflow)?, balance1)
        } else {
            (balance0, balance1.checked_add(amount).ok_or(AmmError::Overflow)?)
        };
        Ok(())
    }
}
