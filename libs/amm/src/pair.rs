//! Pool ledger for a single token pair
//!
//! ## Purpose
//!
//! Owns one pool's reserves and its claim-token book, and enforces the
//! constant-product invariant on every swap. Deposits are detected rather than
//! declared: callers move tokens into the pool's custody address first, then
//! call [`PairGuard::mint`] or [`PairGuard::swap`], which read `balance - reserve`
//! per token.
//!
//! ## Integration Points
//!
//! - **Registry**: [`crate::factory::PairFactory`] creates [`Pair`] handles and
//!   hands them out as `Arc<Pair>`
//! - **Router**: holds [`PairGuard`]s (write locks) for the duration of a
//!   multi-step operation and uses [`Pair::plan_swap`] to simulate hops
//! - **Token ledger**: custody balances are read through the [`Token`] trait
//!
//! ## Atomicity
//!
//! Every operation validates against projected balances before the first
//! token moves, so a rejected call leaves reserves, claims and custody
//! untouched. State is committed only after all transfers were verified.

use crate::error::{AmmError, Result};
use crate::math;
use crate::token::{safe_transfer, Token};
use parking_lot::{RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use types::{Address, Amount, PoolId, TokenPair, U256};

/// Claims minted on the first deposit that no holder owns
///
/// They count towards the total supply only, so the pool can never be
/// redeemed back to empty.
pub const MINIMUM_LIQUIDITY: u64 = 1000;

/// Upper bound for either reserve (2^112 - 1)
pub const MAX_RESERVE: Amount = U256([u64::MAX, 0x0000_FFFF_FFFF_FFFF, 0, 0]);

const FEE_SCALE: u64 = 1000;
const FEE_UNITS: u64 = 3;

/// Tracked balances of token0 and token1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub reserve0: Amount,
    pub reserve1: Amount,
}

impl Reserves {
    pub fn new(reserve0: Amount, reserve1: Amount) -> Self {
        Self { reserve0, reserve1 }
    }

    pub fn is_empty(&self) -> bool {
        self.reserve0.is_zero() && self.reserve1.is_zero()
    }

    /// Constant product `reserve0 * reserve1`
    pub fn k(&self) -> Amount {
        // Both sides are bounded by MAX_RESERVE
        self.reserve0.saturating_mul(self.reserve1)
    }

    fn ensure_bounded(balance0: Amount, balance1: Amount) -> Result<()> {
        if balance0 > MAX_RESERVE || balance1 > MAX_RESERVE {
            return Err(AmmError::Overflow);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOutcome {
    pub claims: Amount,
    pub amount0: Amount,
    pub amount1: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnOutcome {
    pub amount0: Amount,
    pub amount1: Amount,
}

/// Result of a validated swap, including the reserves it commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOutcome {
    pub amount0_in: Amount,
    pub amount1_in: Amount,
    pub amount0_out: Amount,
    pub amount1_out: Amount,
    pub reserves: Reserves,
}

/// Consistent point-in-time view of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSnapshot {
    pub id: PoolId,
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: Amount,
    pub reserve1: Amount,
    pub total_claims: Amount,
}

/// Mutable part of a pool, guarded by the pair's lock
#[derive(Debug, Clone, Default)]
pub struct PairState {
    reserves: Reserves,
    total_claims: Amount,
    claims: HashMap<Address, Amount>,
}

impl PairState {
    pub fn reserves(&self) -> Reserves {
        self.reserves
    }

    pub fn total_claims(&self) -> Amount {
        self.total_claims
    }

    pub fn claim_balance_of(&self, holder: Address) -> Amount {
        self.claims.get(&holder).copied().unwrap_or_default()
    }

    /// Claims that a deposit bringing custody to `balance0`/`balance1` would mint
    pub fn preview_mint(&self, balance0: Amount, balance1: Amount) -> Result<MintOutcome> {
        let Reserves { reserve0, reserve1 } = self.reserves;
        let amount0 = balance0
            .checked_sub(reserve0)
            .ok_or(AmmError::InsufficientLiquidityMinted)?;
        let amount1 = balance1
            .checked_sub(reserve1)
            .ok_or(AmmError::InsufficientLiquidityMinted)?;
        Reserves::ensure_bounded(balance0, balance1)?;

        let claims = if self.total_claims.is_zero() {
            let root = math::sqrt(math::mul(amount0, amount1)?);
            let locked = Amount::from(MINIMUM_LIQUIDITY);
            if root <= locked {
                return Err(AmmError::InsufficientLiquidityMinted);
            }
            root - locked
        } else {
            let by0 = math::div(math::mul(amount0, self.total_claims)?, reserve0)?;
            let by1 = math::div(math::mul(amount1, self.total_claims)?, reserve1)?;
            by0.min(by1)
        };

        if claims.is_zero() {
            return Err(AmmError::InsufficientLiquidityMinted);
        }
        Ok(MintOutcome {
            claims,
            amount0,
            amount1,
        })
    }

    /// Token amounts `owner` would receive for redeeming `claims`
    pub fn preview_burn(&self, owner: Address, claims: Amount) -> Result<BurnOutcome> {
        if claims.is_zero() || self.total_claims.is_zero() {
            return Err(AmmError::InsufficientLiquidityBurned);
        }
        if claims > self.claim_balance_of(owner) {
            return Err(AmmError::InsufficientLiquidityBurned);
        }
        let amount0 = math::mul(claims, self.reserves.reserve0)? / self.total_claims;
        let amount1 = math::mul(claims, self.reserves.reserve1)? / self.total_claims;
        if amount0.is_zero() || amount1.is_zero() {
            return Err(AmmError::InsufficientLiquidityBurned);
        }
        Ok(BurnOutcome { amount0, amount1 })
    }

    /// Fee-adjusted invariant check on post-release balances
    ///
    /// `balance0`/`balance1` are what custody will hold once the outputs have
    /// left. No state is touched; callers commit `outcome.reserves` themselves.
    pub fn preview_swap(
        &self,
        balance0: Amount,
        balance1: Amount,
        amount0_out: Amount,
        amount1_out: Amount,
    ) -> Result<SwapOutcome> {
        if amount0_out.is_zero() && amount1_out.is_zero() {
            return Err(AmmError::ZeroOutputAmounts);
        }
        let Reserves { reserve0, reserve1 } = self.reserves;
        if amount0_out >= reserve0 || amount1_out >= reserve1 {
            return Err(AmmError::OutputExceedsReserve);
        }
        Reserves::ensure_bounded(balance0, balance1)?;

        let floor0 = reserve0 - amount0_out;
        let floor1 = reserve1 - amount1_out;
        let amount0_in = balance0.saturating_sub(floor0);
        let amount1_in = balance1.saturating_sub(floor1);

        let scale = Amount::from(FEE_SCALE);
        let fee = Amount::from(FEE_UNITS);
        // balance * 1000 >= amount_in * 3 because amount_in <= balance
        let adjusted0 = balance0 * scale - amount0_in * fee;
        let adjusted1 = balance1 * scale - amount1_in * fee;
        let after = math::mul(adjusted0, adjusted1)?;
        let before = math::mul(math::mul(reserve0, reserve1)?, scale * scale)?;
        if after < before {
            return Err(AmmError::InvariantViolation);
        }

        Ok(SwapOutcome {
            amount0_in,
            amount1_in,
            amount0_out,
            amount1_out,
            reserves: Reserves::new(balance0, balance1),
        })
    }

    pub fn transfer_claims(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        let balance = self.claim_balance_of(from);
        if balance < amount {
            return Err(AmmError::InsufficientClaimBalance);
        }
        if from == to || amount.is_zero() {
            return Ok(());
        }
        self.debit(from, amount);
        self.credit(to, amount);
        Ok(())
    }

    pub(crate) fn commit_reserves(&mut self, reserves: Reserves) {
        self.reserves = reserves;
    }

    fn credit(&mut self, holder: Address, amount: Amount) {
        let entry = self.claims.entry(holder).or_default();
        // total_claims bounds every holder balance
        *entry = entry.saturating_add(amount);
    }

    fn debit(&mut self, holder: Address, amount: Amount) {
        if let Some(balance) = self.claims.get_mut(&holder) {
            *balance = balance.saturating_sub(amount);
            if balance.is_zero() {
                self.claims.remove(&holder);
            }
        }
    }
}

/// Shared handle to one pool
///
/// Identity (id, custody address, tokens) is immutable; everything else lives
/// behind the lock.
pub struct Pair {
    id: PoolId,
    address: Address,
    tokens: TokenPair,
    token0: Arc<dyn Token>,
    token1: Arc<dyn Token>,
    state: RwLock<PairState>,
}

impl std::fmt::Debug for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pair")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("tokens", &self.tokens)
            .finish()
    }
}

impl Pair {
    /// `token0`/`token1` must be the handles for `tokens.token0()`/`tokens.token1()`
    pub fn new(
        id: PoolId,
        address: Address,
        tokens: TokenPair,
        token0: Arc<dyn Token>,
        token1: Arc<dyn Token>,
    ) -> Self {
        debug_assert_eq!(token0.address(), tokens.token0());
        debug_assert_eq!(token1.address(), tokens.token1());
        Self {
            id,
            address,
            tokens,
            token0,
            token1,
            state: RwLock::new(PairState::default()),
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Custody address holding the pool's token balances
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn tokens(&self) -> TokenPair {
        self.tokens
    }

    pub fn token0(&self) -> Address {
        self.tokens.token0()
    }

    pub fn token1(&self) -> Address {
        self.tokens.token1()
    }

    /// Token handle for one of the pool's assets
    pub fn token(&self, asset: Address) -> Result<&Arc<dyn Token>> {
        if asset == self.tokens.token0() {
            Ok(&self.token0)
        } else if asset == self.tokens.token1() {
            Ok(&self.token1)
        } else {
            Err(AmmError::UnknownAsset(asset))
        }
    }

    /// Custody balances as reported by the token ledger
    pub fn balances(&self) -> (Amount, Amount) {
        (
            self.token0.balance_of(self.address),
            self.token1.balance_of(self.address),
        )
    }

    pub fn reserves(&self) -> Reserves {
        self.state.read().reserves
    }

    pub fn total_claims(&self) -> Amount {
        self.state.read().total_claims
    }

    pub fn claim_balance_of(&self, holder: Address) -> Amount {
        self.state.read().claim_balance_of(holder)
    }

    pub fn snapshot(&self) -> PairSnapshot {
        let state = self.state.read();
        PairSnapshot {
            id: self.id,
            address: self.address,
            token0: self.tokens.token0(),
            token1: self.tokens.token1(),
            reserve0: state.reserves.reserve0,
            reserve1: state.reserves.reserve1,
            total_claims: state.total_claims,
        }
    }

    pub fn preview_burn(&self, owner: Address, claims: Amount) -> Result<BurnOutcome> {
        self.state.read().preview_burn(owner, claims)
    }

    /// Exclusive access for a multi-step operation
    pub fn lock(&self) -> PairGuard<'_> {
        PairGuard {
            pair: self,
            state: self.state.write(),
        }
    }

    pub fn mint(&self, to: Address) -> Result<MintOutcome> {
        self.lock().mint(to)
    }

    pub fn burn(&self, owner: Address, claims: Amount, to: Address) -> Result<BurnOutcome> {
        self.lock().burn(owner, claims, to)
    }

    pub fn swap(&self, amount0_out: Amount, amount1_out: Amount, to: Address) -> Result<SwapOutcome> {
        self.lock().swap(amount0_out, amount1_out, to)
    }

    pub fn sync(&self) -> Result<Reserves> {
        self.lock().sync()
    }

    pub fn skim(&self, to: Address) -> Result<(Amount, Amount)> {
        self.lock().skim(to)
    }

    pub fn transfer_claims(&self, from: Address, to: Address, amount: Amount) -> Result<()> {
        self.state.write().transfer_claims(from, to, amount)
    }

    /// Validate a swap against `reserves` and custody `balances` taken before
    /// the outputs leave
    ///
    /// Custody does not shrink when the pool pays itself, which lets a path
    /// revisit the same pool.
    pub fn plan_swap(
        &self,
        state: &PairState,
        balances: (Amount, Amount),
        amount0_out: Amount,
        amount1_out: Amount,
        to: Address,
    ) -> Result<SwapOutcome> {
        if to == self.tokens.token0() || to == self.tokens.token1() {
            return Err(AmmError::InvalidRecipient(to));
        }
        let (balance0, balance1) = balances;
        let (post0, post1) = if to == self.address {
            (balance0, balance1)
        } else {
            (
                balance0
                    .checked_sub(amount0_out)
                    .ok_or(AmmError::OutputExceedsReserve)?,
                balance1
                    .checked_sub(amount1_out)
                    .ok_or(AmmError::OutputExceedsReserve)?,
            )
        };
        state.preview_swap(post0, post1, amount0_out, amount1_out)
    }

    /// Pull back an output already released to `holder` after a later
    /// transfer of the same operation failed
    fn reclaim(&self, token: &Arc<dyn Token>, holder: Address, amount: Amount) {
        if let Err(err) = safe_transfer(token.as_ref(), holder, self.address, amount) {
            warn!(
                "Pair {:?} could not reclaim {} {} from {:?}: {}",
                self.address,
                amount,
                token.symbol(),
                holder,
                err
            );
        }
    }

    fn transfer_failed(&self, token: &Arc<dyn Token>, to: Address) -> AmmError {
        AmmError::TransferFailed {
            token: token.address(),
            from: self.address,
            to,
        }
    }
}

/// Write-locked pool; released on drop
pub struct PairGuard<'a> {
    pair: &'a Pair,
    state: RwLockWriteGuard<'a, PairState>,
}

impl<'a> PairGuard<'a> {
    pub fn pair(&self) -> &'a Pair {
        self.pair
    }

    pub fn state(&self) -> &PairState {
        &self.state
    }

    pub fn reserves(&self) -> Reserves {
        self.state.reserves
    }

    /// Reserves ordered as (`asset`, other)
    pub fn reserves_for(&self, asset: Address) -> Result<(Amount, Amount)> {
        let Reserves { reserve0, reserve1 } = self.state.reserves;
        if asset == self.pair.token0() {
            Ok((reserve0, reserve1))
        } else if asset == self.pair.token1() {
            Ok((reserve1, reserve0))
        } else {
            Err(AmmError::UnknownAsset(asset))
        }
    }

    /// Mint claims for whatever custody holds above the reserves
    pub fn mint(&mut self, to: Address) -> Result<MintOutcome> {
        let (balance0, balance1) = self.pair.balances();
        let outcome = self.state.preview_mint(balance0, balance1)?;

        if self.state.total_claims.is_zero() {
            self.state.total_claims = Amount::from(MINIMUM_LIQUIDITY);
        }
        self.state.total_claims = self.state.total_claims.saturating_add(outcome.claims);
        self.state.credit(to, outcome.claims);
        self.state.reserves = Reserves::new(balance0, balance1);

        debug!(
            "Mint on pair {:?}: {} token0 + {} token1 -> {} claims for {:?}",
            self.pair.address, outcome.amount0, outcome.amount1, outcome.claims, to
        );
        Ok(outcome)
    }

    /// Redeem `claims` held by `owner`, releasing the tokens to `to`
    pub fn burn(&mut self, owner: Address, claims: Amount, to: Address) -> Result<BurnOutcome> {
        let outcome = self.state.preview_burn(owner, claims)?;
        let (balance0, balance1) = self.pair.balances();
        if balance0 < outcome.amount0 || balance1 < outcome.amount1 {
            return Err(AmmError::InsufficientLiquidity);
        }

        let pair = self.pair;
        safe_transfer(pair.token0.as_ref(), pair.address, to, outcome.amount0)?;
        if let Err(err) = safe_transfer(pair.token1.as_ref(), pair.address, to, outcome.amount1) {
            pair.reclaim(&pair.token0, to, outcome.amount0);
            return Err(err);
        }

        self.state.debit(owner, claims);
        self.state.total_claims = self.state.total_claims.saturating_sub(claims);
        let Reserves { reserve0, reserve1 } = self.state.reserves;
        self.state.reserves = Reserves::new(reserve0 - outcome.amount0, reserve1 - outcome.amount1);

        debug!(
            "Burn on pair {:?}: {} claims of {:?} -> {} token0 + {} token1 to {:?}",
            pair.address, claims, owner, outcome.amount0, outcome.amount1, to
        );
        Ok(outcome)
    }

    /// Release the requested outputs to `to`, charging whatever custody holds
    /// above the reserves as input
    pub fn swap(&mut self, amount0_out: Amount, amount1_out: Amount, to: Address) -> Result<SwapOutcome> {
        let pair = self.pair;
        let balances = pair.balances();
        let outcome = pair.plan_swap(&self.state, balances, amount0_out, amount1_out, to)?;

        safe_transfer(pair.token0.as_ref(), pair.address, to, amount0_out)?;
        if let Err(err) = safe_transfer(pair.token1.as_ref(), pair.address, to, amount1_out) {
            pair.reclaim(&pair.token0, to, amount0_out);
            return Err(err);
        }
        let (after0, after1) = pair.balances();
        if after0 != outcome.reserves.reserve0 || after1 != outcome.reserves.reserve1 {
            pair.reclaim(&pair.token0, to, amount0_out);
            pair.reclaim(&pair.token1, to, amount1_out);
            let token = if after0 != outcome.reserves.reserve0 {
                &pair.token0
            } else {
                &pair.token1
            };
            return Err(pair.transfer_failed(token, to));
        }

        self.state.reserves = outcome.reserves;
        debug!(
            "Swap on pair {:?}: in ({}, {}) out ({}, {}) to {:?}",
            pair.address,
            outcome.amount0_in,
            outcome.amount1_in,
            outcome.amount0_out,
            outcome.amount1_out,
            to
        );
        Ok(outcome)
    }

    /// Force reserves to match custody balances
    pub fn sync(&mut self) -> Result<Reserves> {
        let (balance0, balance1) = self.pair.balances();
        Reserves::ensure_bounded(balance0, balance1)?;
        self.state.reserves = Reserves::new(balance0, balance1);
        debug!(
            "Sync on pair {:?}: reserves ({}, {})",
            self.pair.address, balance0, balance1
        );
        Ok(self.state.reserves)
    }

    /// Send custody balances above the reserves to `to`
    pub fn skim(&mut self, to: Address) -> Result<(Amount, Amount)> {
        let pair = self.pair;
        let (balance0, balance1) = pair.balances();
        let excess0 = balance0.saturating_sub(self.state.reserves.reserve0);
        let excess1 = balance1.saturating_sub(self.state.reserves.reserve1);
        safe_transfer(pair.token0.as_ref(), pair.address, to, excess0)?;
        safe_transfer(pair.token1.as_ref(), pair.address, to, excess1)?;
        Ok((excess0, excess1))
    }

    pub fn transfer_claims(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        self.state.transfer_claims(from, to, amount)
    }

    /// Put back state captured earlier under this same lock
    pub(crate) fn restore(&mut self, state: PairState) {
        *self.state = state;
    }
}
