//! Fungible token interface consumed by the AMM
//!
//! The token ledger itself is an external collaborator: the core only calls the
//! [`Token`] trait and never reimplements balance or allowance semantics. The
//! caller of every ledger operation is explicit (`from`, `owner`, `spender`)
//! instead of being an implicit session.
//!
//! Return values are not trusted on their own. [`safe_transfer`] and
//! [`safe_transfer_from`] re-read the recipient balance and fail with
//! [`AmmError::TransferFailed`] when a token reports success without moving
//! funds.
//!
//! [`MockToken`] is an in-memory ledger with a `mint` faucet used by tests and
//! by the scenario simulator.

use crate::error::{AmmError, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use types::{Address, Amount};

/// Token ledger operations the AMM relies on
pub trait Token: Send + Sync {
    /// Asset identifier of this token
    fn address(&self) -> Address;

    /// Ticker used in logs
    fn symbol(&self) -> &str;

    /// Decimal places of one whole unit
    fn decimals(&self) -> u32 {
        types::WAD_DECIMALS
    }

    fn balance_of(&self, holder: Address) -> Amount;

    fn allowance(&self, owner: Address, spender: Address) -> Amount;

    /// Move `amount` from `from` to `to`; `false` when the ledger refuses
    fn transfer(&self, from: Address, to: Address, amount: Amount) -> bool;

    /// Move `amount` from `from` to `to` on behalf of `spender`
    fn transfer_from(&self, spender: Address, from: Address, to: Address, amount: Amount) -> bool;

    fn approve(&self, owner: Address, spender: Address, amount: Amount) -> bool;
}

impl fmt::Debug for dyn Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("symbol", &self.symbol())
            .field("address", &self.address())
            .finish()
    }
}

/// Transfer and verify that the recipient balance moved by exactly `amount`
pub fn safe_transfer(token: &dyn Token, from: Address, to: Address, amount: Amount) -> Result<()> {
    if amount.is_zero() {
        return Ok(());
    }
    let failed = || AmmError::TransferFailed {
        token: token.address(),
        from,
        to,
    };

    let before = token.balance_of(to);
    if !token.transfer(from, to, amount) {
        return Err(failed());
    }
    if credited(token, from, to, before, amount) {
        Ok(())
    } else {
        Err(failed())
    }
}

/// `transferFrom` variant of [`safe_transfer`] with `spender` as the approved party
pub fn safe_transfer_from(
    token: &dyn Token,
    spender: Address,
    from: Address,
    to: Address,
    amount: Amount,
) -> Result<()> {
    if amount.is_zero() {
        return Ok(());
    }
    let failed = || AmmError::TransferFailed {
        token: token.address(),
        from,
        to,
    };

    let before = token.balance_of(to);
    if !token.transfer_from(spender, from, to, amount) {
        return Err(failed());
    }
    if credited(token, from, to, before, amount) {
        Ok(())
    } else {
        Err(failed())
    }
}

fn credited(token: &dyn Token, from: Address, to: Address, before: Amount, amount: Amount) -> bool {
    // A self-transfer leaves the balance unchanged
    let expected = if from == to {
        Some(before)
    } else {
        before.checked_add(amount)
    };
    let after = token.balance_of(to);
    if Some(after) == expected {
        return true;
    }
    warn!(
        "Token {} reported a successful transfer of {} to {:?} but balance moved {} -> {}",
        token.symbol(),
        amount,
        to,
        before,
        after
    );
    false
}

/// Resolves asset identifiers to token handles
#[derive(Default)]
pub struct TokenDirectory {
    tokens: DashMap<Address, Arc<dyn Token>>,
}

impl TokenDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token handle under its own address, replacing any previous one
    pub fn register(&self, token: Arc<dyn Token>) -> Address {
        let address = token.address();
        debug!("Registered token {} at {:?}", token.symbol(), address);
        self.tokens.insert(address, token);
        address
    }

    pub fn get(&self, asset: Address) -> Result<Arc<dyn Token>> {
        self.tokens
            .get(&asset)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(AmmError::UnknownAsset(asset))
    }

    pub fn contains(&self, asset: Address) -> bool {
        self.tokens.contains_key(&asset)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[derive(Debug, Default)]
struct Ledger {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl Ledger {
    fn balance(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    fn move_funds(&mut self, from: Address, to: Address, amount: Amount) -> bool {
        let from_balance = self.balance(&from);
        let Some(remaining) = from_balance.checked_sub(amount) else {
            return false;
        };
        if from == to {
            return true;
        }
        let Some(credited) = self.balance(&to).checked_add(amount) else {
            return false;
        };
        self.balances.insert(from, remaining);
        self.balances.insert(to, credited);
        true
    }
}

/// In-memory ERC-20 style token with a test faucet
///
/// An allowance of `Amount::MAX` is treated as unlimited and is not decremented.
/// A paused token refuses every transfer by returning `false`.
#[derive(Debug)]
pub struct MockToken {
    address: Address,
    name: String,
    symbol: String,
    decimals: u32,
    paused: AtomicBool,
    ledger: Mutex<Ledger>,
}

impl MockToken {
    pub fn new(address: Address, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::with_decimals(address, name, symbol, types::WAD_DECIMALS)
    }

    pub fn with_decimals(
        address: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u32,
    ) -> Self {
        Self {
            address,
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            paused: AtomicBool::new(false),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Faucet: create `amount` new units for `to`
    pub fn mint(&self, amount: Amount, to: Address) -> Result<()> {
        let mut ledger = self.ledger.lock();
        let supply = ledger
            .total_supply
            .checked_add(amount)
            .ok_or(AmmError::Overflow)?;
        let balance = ledger
            .balance(&to)
            .checked_add(amount)
            .ok_or(AmmError::Overflow)?;
        ledger.total_supply = supply;
        ledger.balances.insert(to, balance);
        Ok(())
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.lock().total_supply
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

impl Token for MockToken {
    fn address(&self) -> Address {
        self.address
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn decimals(&self) -> u32 {
        self.decimals
    }

    fn balance_of(&self, holder: Address) -> Amount {
        self.ledger.lock().balance(&holder)
    }

    fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.ledger
            .lock()
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    fn transfer(&self, from: Address, to: Address, amount: Amount) -> bool {
        if self.is_paused() {
            return false;
        }
        self.ledger.lock().move_funds(from, to, amount)
    }

    fn transfer_from(&self, spender: Address, from: Address, to: Address, amount: Amount) -> bool {
        if self.is_paused() {
            return false;
        }
        let mut ledger = self.ledger.lock();
        let allowed = ledger
            .allowances
            .get(&(from, spender))
            .copied()
            .unwrap_or_default();
        if allowed < amount {
            return false;
        }
        if !ledger.move_funds(from, to, amount) {
            return false;
        }
        if allowed != Amount::MAX {
            ledger.allowances.insert((from, spender), allowed - amount);
        }
        true
    }

    fn approve(&self, owner: Address, spender: Address, amount: Amount) -> bool {
        self.ledger.lock().allowances.insert((owner, spender), amount);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    /// Reports success but never moves funds
    struct SilentToken;

    impl Token for SilentToken {
        fn address(&self) -> Address {
            addr(99)
        }
        fn symbol(&self) -> &str {
            "SILENT"
        }
        fn balance_of(&self, _holder: Address) -> Amount {
            Amount::zero()
        }
        fn allowance(&self, _owner: Address, _spender: Address) -> Amount {
            Amount::MAX
        }
        fn transfer(&self, _from: Address, _to: Address, _amount: Amount) -> bool {
            true
        }
        fn transfer_from(&self, _: Address, _: Address, _: Address, _: Amount) -> bool {
            true
        }
        fn approve(&self, _: Address, _: Address, _: Amount) -> bool {
            true
        }
    }

    #[test]
    fn test_mock_token_transfer_and_allowance() {
        let token = MockToken::new(addr(1), "Token 0", "T0");
        token.mint(Amount::from(100u64), addr(10)).unwrap();
        assert_eq!(token.total_supply(), Amount::from(100u64));

        assert!(token.transfer(addr(10), addr(11), Amount::from(40u64)));
        assert!(!token.transfer(addr(10), addr(11), Amount::from(61u64)));
        assert_eq!(token.balance_of(addr(10)), Amount::from(60u64));
        assert_eq!(token.balance_of(addr(11)), Amount::from(40u64));

        // Spender needs an allowance
        assert!(!token.transfer_from(addr(20), addr(10), addr(12), Amount::from(5u64)));
        assert!(token.approve(addr(10), addr(20), Amount::from(10u64)));
        assert!(token.transfer_from(addr(20), addr(10), addr(12), Amount::from(5u64)));
        assert_eq!(token.allowance(addr(10), addr(20)), Amount::from(5u64));
        assert!(!token.transfer_from(addr(20), addr(10), addr(12), Amount::from(6u64)));
    }

    #[test]
    fn test_unlimited_allowance_is_not_decremented() {
        let token = MockToken::new(addr(1), "Token 0", "T0");
        token.mint(Amount::from(10u64), addr(10)).unwrap();
        token.approve(addr(10), addr(20), Amount::MAX);
        assert!(token.transfer_from(addr(20), addr(10), addr(12), Amount::from(3u64)));
        assert_eq!(token.allowance(addr(10), addr(20)), Amount::MAX);
    }

    #[test]
    fn test_paused_token_refuses_transfers() {
        let token = MockToken::new(addr(1), "Token 0", "T0");
        token.mint(Amount::from(10u64), addr(10)).unwrap();
        token.approve(addr(10), addr(20), Amount::MAX);

        token.set_paused(true);
        assert!(!token.transfer(addr(10), addr(11), Amount::from(1u64)));
        assert!(!token.transfer_from(addr(20), addr(10), addr(11), Amount::from(1u64)));
        assert!(matches!(
            safe_transfer(&token, addr(10), addr(11), Amount::from(1u64)),
            Err(AmmError::TransferFailed { .. })
        ));
        assert_eq!(token.balance_of(addr(10)), Amount::from(10u64));

        token.set_paused(false);
        assert!(token.transfer(addr(10), addr(11), Amount::from(1u64)));
    }

    #[test]
    fn test_safe_transfer_detects_silent_failure() {
        let token = SilentToken;
        let err = safe_transfer(&token, addr(1), addr(2), Amount::from(1u64)).unwrap_err();
        assert!(matches!(err, AmmError::TransferFailed { .. }));

        // Zero amounts never touch the ledger
        assert!(safe_transfer(&token, addr(1), addr(2), Amount::zero()).is_ok());
    }

    #[test]
    fn test_safe_transfer_from_moves_funds() {
        let token = MockToken::new(addr(1), "Token 0", "T0");
        token.mint(Amount::from(10u64), addr(10)).unwrap();
        token.approve(addr(10), addr(20), Amount::from(10u64));
        safe_transfer_from(&token, addr(20), addr(10), addr(30), Amount::from(7u64)).unwrap();
        assert_eq!(token.balance_of(addr(30)), Amount::from(7u64));

        let err =
            safe_transfer_from(&token, addr(20), addr(10), addr(30), Amount::from(7u64)).unwrap_err();
        assert!(matches!(err, AmmError::TransferFailed { .. }));
    }

    #[test]
    fn test_directory_resolves_registered_tokens() {
        let directory = TokenDirectory::new();
        assert!(directory.is_empty());
        let token: Arc<dyn Token> = Arc::new(MockToken::new(addr(1), "Token 0", "T0"));
        directory.register(token);
        assert!(directory.contains(addr(1)));
        assert_eq!(directory.get(addr(1)).unwrap().symbol(), "T0");
        assert_eq!(
            directory.get(addr(2)).unwrap_err(),
            AmmError::UnknownAsset(addr(2))
        );
    }
}
