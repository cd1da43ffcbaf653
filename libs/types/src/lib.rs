//! # Pairswap Shared Types
//!
//! Identifier and amount types shared by every Pairswap crate.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: all token amounts are 256-bit unsigned integers in
//!   the asset's smallest unit; floating point never touches an amount
//! - **One Canonical Order**: asset pairs are ordered exactly one way
//!   ([`sort_tokens`]) and every crate goes through that function
//! - **Type Safety**: pool identifiers are typed wrappers so they cannot be
//!   confused with indices or amounts
//! - **Clear Boundaries**: human-readable decimal strings are converted at the
//!   edges ([`parse_units`], [`format_units`], [`to_decimal`]) and nowhere else
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{parse_units, Address, TokenPair};
//!
//! let weth = Address::from_low_u64_be(2);
//! let usdc = Address::from_low_u64_be(1);
//!
//! // Either ordering resolves to the same canonical pair
//! let pair = TokenPair::new(weth, usdc).unwrap();
//! assert_eq!(pair.token0(), usdc);
//!
//! // "1.5" whole tokens with 18 decimals
//! let amount = parse_units("1.5", 18).unwrap();
//! assert_eq!(amount.to_string(), "1500000000000000000");
//! ```

pub mod address;
pub mod errors;
pub mod identifiers;
pub mod units;

pub use address::{derive_address, parse_address, sort_tokens, TokenPair, ZERO_ADDRESS};
pub use errors::{AddressError, UnitsError};
pub use identifiers::PoolId;
pub use units::{format_units, parse_units, to_decimal, Amount, ETHER, MAX_DECIMALS, WAD_DECIMALS};

/// Asset and account identifier (20-byte address)
pub use ethereum_types::H160 as Address;
/// 256-bit unsigned integer backing [`Amount`]
pub use ethereum_types::U256;
