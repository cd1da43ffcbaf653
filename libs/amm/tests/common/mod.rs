//! Shared engine fixture for the AMM integration tests

#![allow(dead_code)]

use pairswap_amm::{
    AddLiquidityParams, Address, Amount, LiquidityAdded, MockToken, PairFactory, Router, Token,
    TokenDirectory,
};
use std::sync::Arc;

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn eth(n: u64) -> Amount {
    Amount::from(n) * Amount::exp10(18)
}

/// Thousandths of a whole token
pub fn milli(n: u64) -> Amount {
    Amount::from(n) * Amount::exp10(15)
}

pub fn wei(n: u128) -> Amount {
    Amount::from(n)
}

pub struct Engine {
    pub router: Router,
    pub tokens: Vec<Arc<MockToken>>,
    pub wallet: Address,
}

/// Router over `count` tokens with ascending addresses; `wallet` holds 10k of
/// each and has approved the router without limit
pub fn engine(count: usize) -> Engine {
    let directory = Arc::new(TokenDirectory::new());
    let factory = Arc::new(PairFactory::new(addr(0xFAC), directory));
    let router = Router::new(factory.clone(), addr(0x707));

    let tokens: Vec<Arc<MockToken>> = (0..count)
        .map(|i| {
            let token = Arc::new(MockToken::new(
                addr(0x1000 + i as u64),
                format!("Token {i}"),
                format!("T{i}"),
            ));
            factory.register_token(token.clone());
            token
        })
        .collect();

    let engine = Engine {
        router,
        tokens,
        wallet: addr(0xA11CE),
    };
    engine.fund(engine.wallet, eth(10_000));
    engine
}

impl Engine {
    pub fn token(&self, index: usize) -> Address {
        self.tokens[index].address()
    }

    pub fn factory(&self) -> &Arc<PairFactory> {
        self.router.factory()
    }

    /// Faucet `amount` of every token to `account` and approve the router
    pub fn fund(&self, account: Address, amount: Amount) {
        for token in &self.tokens {
            token.mint(amount, account).unwrap();
            token.approve(account, self.router.address(), Amount::MAX);
        }
    }

    pub fn balance(&self, index: usize, holder: Address) -> Amount {
        self.tokens[index].balance_of(holder)
    }

    /// Deposit exactly `amount_a`/`amount_b` from the wallet
    pub fn seed(&self, a: usize, b: usize, amount_a: Amount, amount_b: Amount) -> LiquidityAdded {
        self.router
            .add_liquidity(
                self.wallet,
                &AddLiquidityParams {
                    asset_a: self.token(a),
                    asset_b: self.token(b),
                    amount_a_desired: amount_a,
                    amount_b_desired: amount_b,
                    amount_a_min: Amount::zero(),
                    amount_b_min: Amount::zero(),
                    to: self.wallet,
                },
            )
            .unwrap()
    }

    pub fn path(&self, indices: &[usize]) -> Vec<Address> {
        indices.iter().map(|&i| self.token(i)).collect()
    }
}
