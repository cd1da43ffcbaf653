//! Token amounts and decimal unit conversion
//!
//! Amounts are raw integers in the asset's smallest unit. Decimal strings such
//! as `"1.1"` are only accepted at the edges (configuration, scenario files,
//! display) and are converted exactly: a string with more fractional digits
//! than the token supports is rejected instead of rounded.

use crate::errors::UnitsError;
use crate::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Raw token amount in the smallest unit
pub type Amount = U256;

/// Decimals of an 18-decimal ("wad") token
pub const WAD_DECIMALS: u32 = 18;

/// One whole 18-decimal token (10^18 smallest units)
pub const ETHER: Amount = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Largest precision whose unit (10^decimals) still fits in an [`Amount`]
pub const MAX_DECIMALS: u32 = 77;

/// 10^decimals, or `Overflow` naming `input` when that exceeds 256 bits
fn unit(decimals: u32, input: impl FnOnce() -> String) -> Result<Amount, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::Overflow { input: input() });
    }
    Ok(Amount::exp10(decimals as usize))
}

/// Parse a non-negative decimal string into raw units
///
/// # Examples
/// ```
/// use types::parse_units;
///
/// assert_eq!(parse_units("1.1", 18).unwrap().to_string(), "1100000000000000000");
/// assert_eq!(parse_units("1000", 0).unwrap().to_string(), "1000");
/// ```
pub fn parse_units(input: &str, decimals: u32) -> Result<Amount, UnitsError> {
    unit(decimals, || input.to_string())?;
    let decimal = Decimal::from_str(input.trim()).map_err(|_| UnitsError::InvalidDecimal {
        input: input.to_string(),
    })?;

    if decimal.is_sign_negative() && !decimal.is_zero() {
        return Err(UnitsError::Negative {
            input: input.to_string(),
        });
    }

    let decimal = decimal.normalize();
    let scale = decimal.scale();
    if scale > decimals {
        return Err(UnitsError::PrecisionLoss {
            input: input.to_string(),
            decimals,
        });
    }

    let mantissa = Amount::from(decimal.mantissa().unsigned_abs());
    let factor = unit(decimals - scale, || input.to_string())?;
    mantissa
        .checked_mul(factor)
        .ok_or_else(|| UnitsError::Overflow {
            input: input.to_string(),
        })
}

/// Render raw units as an exact decimal string, trimming trailing zeros
pub fn format_units(amount: Amount, decimals: u32) -> Result<String, UnitsError> {
    let base = unit(decimals, || amount.to_string())?;
    let whole = amount / base;
    let fraction = amount % base;
    if fraction.is_zero() {
        return Ok(whole.to_string());
    }

    let padded = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    Ok(format!("{}.{}", whole, padded.trim_end_matches('0')))
}

/// Convert raw units into a [`Decimal`] for display and JSON output
///
/// Fails with [`UnitsError::Overflow`] when the value exceeds the 96-bit
/// mantissa that `Decimal` can represent.
pub fn to_decimal(amount: Amount, decimals: u32) -> Result<Decimal, UnitsError> {
    let overflow = || UnitsError::Overflow {
        input: amount.to_string(),
    };
    if amount > Amount::from(i128::MAX as u128) {
        return Err(overflow());
    }
    let mantissa = i128::try_from(amount.as_u128()).map_err(|_| overflow())?;
    Decimal::try_from_i128_with_scale(mantissa, decimals)
        .map(|d| d.normalize())
        .map_err(|_| overflow())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_whole_and_fractional() {
        assert_eq!(parse_units("1", 18).unwrap(), ETHER);
        assert_eq!(
            parse_units("0.8", 18).unwrap(),
            Amount::from(800_000_000_000_000_000u64)
        );
        assert_eq!(parse_units("1.50", 6).unwrap(), Amount::from(1_500_000u64));
        assert_eq!(parse_units("0", 18).unwrap(), Amount::zero());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            parse_units("abc", 18),
            Err(UnitsError::InvalidDecimal { .. })
        ));
        assert!(matches!(
            parse_units("-1", 18),
            Err(UnitsError::Negative { .. })
        ));
        assert!(matches!(
            parse_units("0.0000001", 6),
            Err(UnitsError::PrecisionLoss { decimals: 6, .. })
        ));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(ETHER, 18).unwrap(), "1");
        assert_eq!(
            format_units(Amount::from(181_322_178_776_029_826u64), 18).unwrap(),
            "0.181322178776029826"
        );
        assert_eq!(
            format_units(Amount::from(1000u64), 18).unwrap(),
            "0.000000000000001"
        );
        assert_eq!(format_units(Amount::from(42u64), 0).unwrap(), "42");
    }

    #[test]
    fn test_precision_beyond_256_bits_is_an_error() {
        assert_eq!(parse_units("0", MAX_DECIMALS).unwrap(), Amount::zero());
        assert_eq!(format_units(Amount::exp10(76), MAX_DECIMALS).unwrap(), "0.1");

        assert!(matches!(
            parse_units("1", 78),
            Err(UnitsError::Overflow { .. })
        ));
        assert!(matches!(
            parse_units("0", u32::MAX),
            Err(UnitsError::Overflow { .. })
        ));
        assert!(matches!(
            format_units(Amount::one(), 78),
            Err(UnitsError::Overflow { .. })
        ));
        assert!(matches!(
            format_units(Amount::MAX, 255),
            Err(UnitsError::Overflow { .. })
        ));
    }

    #[test]
    fn test_to_decimal() {
        let amount = parse_units("1.5", 18).unwrap();
        assert_eq!(to_decimal(amount, 18).unwrap(), dec!(1.5));
        assert!(to_decimal(Amount::MAX, 18).is_err());
    }
}
