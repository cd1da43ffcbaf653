//! Asset addresses and the canonical pair ordering
//!
//! Every place that needs to decide which asset of a pair comes first (registry
//! keys, pool token0/token1, reserve ordering for reads) calls [`sort_tokens`].
//! The order is the unsigned big-endian comparison of the 20 address bytes,
//! i.e. the numeric order of the addresses read as 160-bit integers.

use crate::errors::AddressError;
use crate::Address;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::cmp::Ordering;
use std::fmt;

/// The null identifier; never a valid asset
pub const ZERO_ADDRESS: Address = ethereum_types::H160([0u8; 20]);

/// Compare two addresses in canonical order
fn canonical_cmp(a: &Address, b: &Address) -> Ordering {
    a.as_bytes().cmp(b.as_bytes())
}

/// Return the two addresses in canonical order (smaller first)
pub fn sort_tokens(a: Address, b: Address) -> (Address, Address) {
    match canonical_cmp(&a, &b) {
        Ordering::Greater => (b, a),
        _ => (a, b),
    }
}

/// Parse a hex address, with or without the `0x` prefix
pub fn parse_address(input: &str) -> Result<Address, AddressError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = hex::decode(digits).map_err(|_| AddressError::InvalidHex {
        input: input.to_string(),
    })?;
    if bytes.len() != 20 {
        return Err(AddressError::InvalidHex {
            input: input.to_string(),
        });
    }
    Ok(Address::from_slice(&bytes))
}

/// Deterministically derive an address from arbitrary byte segments
///
/// Keccak-256 over the concatenated segments, keeping the low 20 bytes. Used for
/// pool custody addresses (`factory ‖ token0 ‖ token1`) and for named accounts.
pub fn derive_address(segments: &[&[u8]]) -> Address {
    let mut hasher = Keccak256::new();
    for segment in segments {
        hasher.update(segment);
    }
    let digest = hasher.finalize();
    Address::from_slice(&digest[12..])
}

/// Unordered pair of distinct, non-null assets stored in canonical order
///
/// `TokenPair::new(a, b) == TokenPair::new(b, a)` for any valid `a`, `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenPair {
    token0: Address,
    token1: Address,
}

impl TokenPair {
    /// Validate and canonicalize two assets
    pub fn new(a: Address, b: Address) -> Result<Self, AddressError> {
        if a == b {
            return Err(AddressError::IdenticalAddresses);
        }
        if a.is_zero() || b.is_zero() {
            return Err(AddressError::ZeroAddress);
        }
        let (token0, token1) = sort_tokens(a, b);
        Ok(Self { token0, token1 })
    }

    /// Smaller asset in canonical order
    pub fn token0(&self) -> Address {
        self.token0
    }

    /// Larger asset in canonical order
    pub fn token1(&self) -> Address {
        self.token1
    }

    /// Whether `asset` is one side of this pair
    pub fn contains(&self, asset: Address) -> bool {
        self.token0 == asset || self.token1 == asset
    }

    /// Whether `asset` is token0 of this pair
    pub fn is_token0(&self, asset: Address) -> bool {
        self.token0 == asset
    }

    /// The counterpart of `asset`, if `asset` belongs to the pair
    pub fn other(&self, asset: Address) -> Option<Address> {
        if asset == self.token0 {
            Some(self.token1)
        } else if asset == self.token1 {
            Some(self.token0)
        } else {
            None
        }
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.token0, self.token1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    #[test]
    fn test_sort_tokens_orders_numerically() {
        assert_eq!(sort_tokens(addr(2), addr(1)), (addr(1), addr(2)));
        assert_eq!(sort_tokens(addr(1), addr(2)), (addr(1), addr(2)));

        // The high byte dominates: 0x01 00..00 > 0x00 ff..ff
        let mut high = [0u8; 20];
        high[0] = 1;
        let high = Address::from(high);
        let mut low = [0xffu8; 20];
        low[0] = 0;
        let low = Address::from(low);
        assert_eq!(sort_tokens(high, low), (low, high));
    }

    #[test]
    fn test_pair_is_order_independent() {
        let ab = TokenPair::new(addr(7), addr(3)).unwrap();
        let ba = TokenPair::new(addr(3), addr(7)).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.token0(), addr(3));
        assert_eq!(ab.other(addr(3)), Some(addr(7)));
        assert_eq!(ab.other(addr(9)), None);
    }

    #[test]
    fn test_pair_rejects_invalid_assets() {
        assert_eq!(
            TokenPair::new(addr(1), addr(1)),
            Err(AddressError::IdenticalAddresses)
        );
        assert_eq!(
            TokenPair::new(addr(1), ZERO_ADDRESS),
            Err(AddressError::ZeroAddress)
        );
    }

    #[test]
    fn test_parse_address() {
        let parsed = parse_address("0x0000000000000000000000000000000000000001").unwrap();
        assert_eq!(parsed, addr(1));
        let no_prefix = parse_address("0000000000000000000000000000000000000001").unwrap();
        assert_eq!(no_prefix, addr(1));
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("not hex").is_err());
    }

    #[test]
    fn test_derive_address_is_deterministic() {
        let a = derive_address(&[b"alice"]);
        let b = derive_address(&[b"alice"]);
        let c = derive_address(&[b"bob"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_zero());
    }
}
