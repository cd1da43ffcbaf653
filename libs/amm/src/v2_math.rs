//! Constant-product quoting math with exact integer arithmetic
//!
//! Everything here floors exactly like the on-ledger checks in
//! [`crate::pair`], so a quote taken under a pool's lock is always accepted
//! by that pool's swap.

use crate::error::{AmmError, Result};
use crate::factory::PairFactory;
use crate::math;
use crate::pool_traits::AmmPool;
use serde::{Deserialize, Serialize};
use types::{Address, Amount, ETHER};

/// Swap fee charged on the input side (30 = 0.3%)
pub const DEFAULT_FEE_BPS: u32 = 30;

/// Basis-point denominator
pub const BPS_SCALE: u64 = 10_000;

/// Pool reserves and fee structure, oriented along a trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct V2PoolState {
    pub reserve_in: Amount,
    pub reserve_out: Amount,
    pub fee_bps: u32, // Fee in basis points (30 = 0.3%)
}

impl V2PoolState {
    pub fn new(reserve_in: Amount, reserve_out: Amount) -> Self {
        Self {
            reserve_in,
            reserve_out,
            fee_bps: DEFAULT_FEE_BPS,
        }
    }
}

/// V2 AMM math functions
pub struct V2Math;

impl V2Math {
    /// Equivalent amount of the other asset at the current ratio, without fee
    pub fn quote(amount_a: Amount, reserve_a: Amount, reserve_b: Amount) -> Result<Amount> {
        if amount_a.is_zero() {
            return Err(AmmError::InsufficientAmount);
        }
        if reserve_a.is_zero() || reserve_b.is_zero() {
            return Err(AmmError::InsufficientLiquidity);
        }
        Ok(math::mul(amount_a, reserve_b)? / reserve_a)
    }

    /// Output for an exact input at the default 0.3% fee
    pub fn get_amount_out(amount_in: Amount, reserve_in: Amount, reserve_out: Amount) -> Result<Amount> {
        Self::calculate_output_amount(amount_in, reserve_in, reserve_out, DEFAULT_FEE_BPS)
    }

    /// Input required for an exact output at the default 0.3% fee
    pub fn get_amount_in(amount_out: Amount, reserve_in: Amount, reserve_out: Amount) -> Result<Amount> {
        Self::calculate_input_amount(amount_out, reserve_in, reserve_out, DEFAULT_FEE_BPS)
    }

    /// Exact output amount using the x*y=k formula
    ///
    /// # Arguments
    /// * `amount_in` - Input token amount (smallest unit)
    /// * `reserve_in` - Input token reserve
    /// * `reserve_out` - Output token reserve
    /// * `fee_bps` - Fee in basis points (30 = 0.3%)
    ///
    /// # Returns
    /// Output amount after fees, rounded down
    pub fn calculate_output_amount(
        amount_in: Amount,
        reserve_in: Amount,
        reserve_out: Amount,
        fee_bps: u32,
    ) -> Result<Amount> {
        if amount_in.is_zero() {
            return Err(AmmError::InsufficientAmount);
        }
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(AmmError::InsufficientLiquidity);
        }

        // output = in_after_fee * reserve_out / (reserve_in + in_after_fee)
        let amount_in_with_fee = math::mul(amount_in, Self::fee_multiplier(fee_bps))?;
        let numerator = math::mul(amount_in_with_fee, reserve_out)?;
        let denominator = math::add(
            math::mul(reserve_in, Amount::from(BPS_SCALE))?,
            amount_in_with_fee,
        )?;
        Ok(numerator / denominator)
    }

    /// Required input amount for a desired output (reverse calculation)
    pub fn calculate_input_amount(
        amount_out: Amount,
        reserve_in: Amount,
        reserve_out: Amount,
        fee_bps: u32,
    ) -> Result<Amount> {
        if amount_out.is_zero() {
            return Err(AmmError::InsufficientAmount);
        }
        if reserve_in.is_zero() || reserve_out.is_zero() || amount_out >= reserve_out {
            return Err(AmmError::InsufficientLiquidity);
        }

        let numerator = math::mul(math::mul(reserve_in, amount_out)?, Amount::from(BPS_SCALE))?;
        let denominator = math::mul(reserve_out - amount_out, Self::fee_multiplier(fee_bps))?;

        // Add 1 to round up (ensures sufficient input)
        math::add(math::div(numerator, denominator)?, Amount::one())
    }

    /// Walk `hops` forward from an exact input; `amounts[0] == amount_in`
    pub fn amounts_out<P: AmmPool>(amount_in: Amount, hops: &[P]) -> Result<Vec<Amount>> {
        if hops.is_empty() {
            return Err(AmmError::InvalidPath);
        }
        let mut amounts = Vec::with_capacity(hops.len() + 1);
        amounts.push(amount_in);
        let mut current = amount_in;
        for hop in hops {
            current = hop.get_amount_out(current)?;
            amounts.push(current);
        }
        Ok(amounts)
    }

    /// Walk `hops` backward from an exact output; `amounts.last() == amount_out`
    pub fn amounts_in<P: AmmPool>(amount_out: Amount, hops: &[P]) -> Result<Vec<Amount>> {
        if hops.is_empty() {
            return Err(AmmError::InvalidPath);
        }
        let mut amounts = vec![Amount::zero(); hops.len() + 1];
        amounts[hops.len()] = amount_out;
        for (i, hop) in hops.iter().enumerate().rev() {
            amounts[i] = hop.get_amount_in(amounts[i + 1])?;
        }
        Ok(amounts)
    }

    /// Reserves of the `(asset_a, asset_b)` pool ordered as requested
    pub fn get_reserves(
        factory: &PairFactory,
        asset_a: Address,
        asset_b: Address,
    ) -> Result<(Amount, Amount)> {
        let pair = factory.pair_for(asset_a, asset_b)?;
        let reserves = pair.reserves();
        if asset_a == pair.token0() {
            Ok((reserves.reserve0, reserves.reserve1))
        } else {
            Ok((reserves.reserve1, reserves.reserve0))
        }
    }

    /// Oriented pool states for every hop of `path`, read from the registry
    pub fn path_states(factory: &PairFactory, path: &[Address]) -> Result<Vec<V2PoolState>> {
        if path.len() < 2 {
            return Err(AmmError::InvalidPath);
        }
        path.windows(2)
            .map(|hop| {
                let (reserve_in, reserve_out) = Self::get_reserves(factory, hop[0], hop[1])?;
                Ok(V2PoolState::new(reserve_in, reserve_out))
            })
            .collect()
    }

    pub fn get_amounts_out(
        factory: &PairFactory,
        amount_in: Amount,
        path: &[Address],
    ) -> Result<Vec<Amount>> {
        let hops = Self::path_states(factory, path)?;
        Self::amounts_out(amount_in, &hops)
    }

    pub fn get_amounts_in(
        factory: &PairFactory,
        amount_out: Amount,
        path: &[Address],
    ) -> Result<Vec<Amount>> {
        let hops = Self::path_states(factory, path)?;
        Self::amounts_in(amount_out, &hops)
    }

    /// Amount of `asset_a` worth one whole unit (1e18) of `asset_b`
    pub fn price(factory: &PairFactory, asset_a: Address, asset_b: Address) -> Result<Amount> {
        let (reserve_a, reserve_b) = Self::get_reserves(factory, asset_a, asset_b)?;
        Self::quote(ETHER, reserve_b, reserve_a)
    }

    /// Minimum acceptable amount after `slippage_bps` of tolerance, rounded down
    pub fn apply_slippage(amount: Amount, slippage_bps: u32) -> Amount {
        let scale = Amount::from(BPS_SCALE);
        let keep = Amount::from(BPS_SCALE.saturating_sub(u64::from(slippage_bps)));
        // Split to keep amount * keep from overflowing
        (amount / scale) * keep + (amount % scale) * keep / scale
    }

    fn fee_multiplier(fee_bps: u32) -> Amount {
        Amount::from(BPS_SCALE.saturating_sub(u64::from(fee_bps)))
    }
}
