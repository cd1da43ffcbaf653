//! Checked 256-bit helpers shared by the ledger and the quoting math

use crate::error::{AmmError, Result};
use types::Amount;

/// Checked multiplication, [`AmmError::Overflow`] on wrap
#[inline]
pub fn mul(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_mul(b).ok_or(AmmError::Overflow)
}

/// Checked addition, [`AmmError::Overflow`] on wrap
#[inline]
pub fn add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b).ok_or(AmmError::Overflow)
}

/// Floor division; a zero divisor means there is no liquidity to price against
#[inline]
pub fn div(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_div(b).ok_or(AmmError::InsufficientLiquidity)
}

/// Floor of the square root (Babylonian method)
pub fn sqrt(y: Amount) -> Amount {
    if y > Amount::from(3u8) {
        let mut z = y;
        let mut x = y / 2u64 + 1u64;
        while x < z {
            z = x;
            x = (y / x + x) / 2u64;
        }
        z
    } else if !y.is_zero() {
        Amount::one()
    } else {
        Amount::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqrt_floors() {
        assert_eq!(sqrt(Amount::zero()), Amount::zero());
        assert_eq!(sqrt(Amount::from(1u8)), Amount::one());
        assert_eq!(sqrt(Amount::from(3u8)), Amount::one());
        assert_eq!(sqrt(Amount::from(4u8)), Amount::from(2u8));
        assert_eq!(sqrt(Amount::from(99u8)), Amount::from(9u8));

        // sqrt(1e18 * 2e18) from the first-mint fixtures
        let product = Amount::from(2u8) * Amount::exp10(36);
        assert_eq!(sqrt(product), Amount::from(1_414_213_562_373_095_048u64));
    }

    #[test]
    fn test_sqrt_of_max_does_not_overflow() {
        let root = sqrt(Amount::MAX);
        assert_eq!(root, Amount::from(u128::MAX));
    }

    #[test]
    fn test_checked_ops() {
        assert_eq!(mul(Amount::MAX, Amount::from(2u8)), Err(AmmError::Overflow));
        assert_eq!(add(Amount::MAX, Amount::one()), Err(AmmError::Overflow));
        assert_eq!(
            div(Amount::one(), Amount::zero()),
            Err(AmmError::InsufficientLiquidity)
        );
        assert_eq!(div(Amount::from(7u8), Amount::from(2u8)), Ok(Amount::from(3u8)));
    }
}
