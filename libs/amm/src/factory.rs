//! Pool registry
//!
//! Maps each canonical token pair to exactly one [`Pair`]. Pools live in a
//! creation-ordered arena and are addressed by [`PoolId`]; the pair index is a
//! `DashMap` so lookups never contend with each other and creation is atomic
//! through the entry API.

use crate::error::{AmmError, Result};
use crate::pair::{Pair, PairSnapshot};
use crate::token::{Token, TokenDirectory};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;
use types::{derive_address, Address, PoolId, TokenPair};

pub struct PairFactory {
    address: Address,
    tokens: Arc<TokenDirectory>,
    index: DashMap<TokenPair, PoolId>,
    pairs: RwLock<Vec<Arc<Pair>>>,
}

impl PairFactory {
    pub fn new(address: Address, tokens: Arc<TokenDirectory>) -> Self {
        Self {
            address,
            tokens,
            index: DashMap::new(),
            pairs: RwLock::new(Vec::new()),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn tokens(&self) -> &Arc<TokenDirectory> {
        &self.tokens
    }

    pub fn register_token(&self, token: Arc<dyn Token>) -> Address {
        self.tokens.register(token)
    }

    /// Create the pool for an unordered pair of registered tokens
    pub fn create_pair(&self, asset_x: Address, asset_y: Address) -> Result<PoolId> {
        let tokens = TokenPair::new(asset_x, asset_y)?;
        let token0 = self.tokens.get(tokens.token0())?;
        let token1 = self.tokens.get(tokens.token1())?;

        match self.index.entry(tokens) {
            Entry::Occupied(_) => Err(AmmError::PairExists),
            Entry::Vacant(slot) => {
                let address = self.pair_address(&tokens);
                let mut pairs = self.pairs.write();
                let id = PoolId::new(pairs.len() as u64);
                pairs.push(Arc::new(Pair::new(id, address, tokens, token0, token1)));
                slot.insert(id);

                info!(
                    "🆕 Created pair {} for {} at {:?} ({} total)",
                    id,
                    tokens,
                    address,
                    pairs.len()
                );
                Ok(id)
            }
        }
    }

    /// Pool id for either ordering of the two assets
    pub fn get_pair(&self, asset_x: Address, asset_y: Address) -> Option<PoolId> {
        let tokens = TokenPair::new(asset_x, asset_y).ok()?;
        self.index.get(&tokens).map(|entry| *entry.value())
    }

    pub fn pair(&self, id: PoolId) -> Option<Arc<Pair>> {
        self.pairs.read().get(id.index()).cloned()
    }

    /// Ledger handle for the pair, `PairNotFound` when it was never created
    pub fn pair_for(&self, asset_x: Address, asset_y: Address) -> Result<Arc<Pair>> {
        TokenPair::new(asset_x, asset_y)?;
        self.get_pair(asset_x, asset_y)
            .and_then(|id| self.pair(id))
            .ok_or(AmmError::PairNotFound(asset_x, asset_y))
    }

    pub fn all_pairs_length(&self) -> usize {
        self.pairs.read().len()
    }

    /// Pool id by creation index
    pub fn all_pairs(&self, index: usize) -> Option<PoolId> {
        self.pairs.read().get(index).map(|pair| pair.id())
    }

    pub fn snapshots(&self) -> Vec<PairSnapshot> {
        let pairs: Vec<Arc<Pair>> = self.pairs.read().clone();
        pairs.iter().map(|pair| pair.snapshot()).collect()
    }

    /// Custody address: low 20 bytes of keccak256(factory ‖ token0 ‖ token1)
    pub fn pair_address(&self, tokens: &TokenPair) -> Address {
        derive_address(&[
            self.address.as_bytes(),
            tokens.token0().as_bytes(),
            tokens.token1().as_bytes(),
        ])
    }
}

impl std::fmt::Debug for PairFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairFactory")
            .field("address", &self.address)
            .field("pairs", &self.all_pairs_length())
            .finish()
    }
}
