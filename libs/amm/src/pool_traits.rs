//! Pool trait definitions for a unified quoting interface

use crate::error::Result;
use crate::v2_math::{V2Math, V2PoolState};
use types::Amount;

/// Direction-aware pool interface used when walking a trade path
pub trait AmmPool {
    /// Calculate output amount for given input
    fn get_amount_out(&self, amount_in: Amount) -> Result<Amount>;

    /// Calculate required input for desired output
    fn get_amount_in(&self, amount_out: Amount) -> Result<Amount>;
}

impl AmmPool for V2PoolState {
    fn get_amount_out(&self, amount_in: Amount) -> Result<Amount> {
        V2Math::calculate_output_amount(amount_in, self.reserve_in, self.reserve_out, self.fee_bps)
    }

    fn get_amount_in(&self, amount_out: Amount) -> Result<Amount> {
        V2Math::calculate_input_amount(amount_out, self.reserve_in, self.reserve_out, self.fee_bps)
    }
}
