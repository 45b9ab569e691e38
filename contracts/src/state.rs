//! # Pool State
//!
//! Typed view over a pool's [`GlobalState`]. The raw store keeps short
//! keys so stored state stays compact:
//!
//! | Key   | Type  | Field                  |
//! |-------|-------|------------------------|
//! | `gov` | bytes | `governor`             |
//! | `p`   | uint  | `pool_token` (if set)  |
//! | `mp`  | uint  | `mint_price`           |
//! | `rp`  | uint  | `redeem_price`         |
//! | `ar`  | uint  | `redeem_enabled` (0/1) |
//! | `co`  | uint  | `committed_collateral` |
//!
//! `p` is absent until bootstrap. Every other key is written at creation,
//! so a missing one means the store is corrupt.

use ally_protocol::config::DEFAULT_PRICE;
use ally_protocol::identity::{Address, AssetId};
use ally_protocol::storage::{GlobalState, StateDelta};
use serde::{Deserialize, Serialize};

use crate::error::PoolError;

pub const KEY_GOVERNOR: &str = "gov";
pub const KEY_POOL_TOKEN: &str = "p";
pub const KEY_MINT_PRICE: &str = "mp";
pub const KEY_REDEEM_PRICE: &str = "rp";
pub const KEY_REDEEM_ENABLED: &str = "ar";
pub const KEY_COMMITTED: &str = "co";

/// A consistent snapshot of one pool's fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    /// Account allowed to run administrative actions.
    pub governor: Address,
    /// The wrapped token, once bootstrapped.
    pub pool_token: Option<AssetId>,
    /// Collateral units per `PRICE_SCALE` tokens when minting.
    pub mint_price: u64,
    /// Collateral units per `PRICE_SCALE` tokens when redeeming.
    pub redeem_price: u64,
    /// Gates the redeem action.
    pub redeem_enabled: bool,
    /// Collateral earmarked by governance votes.
    pub committed_collateral: u64,
}

impl PoolState {
    /// State written when `creator` deploys a pool.
    pub fn genesis(creator: Address) -> Self {
        Self {
            governor: creator,
            pool_token: None,
            mint_price: DEFAULT_PRICE,
            redeem_price: DEFAULT_PRICE,
            redeem_enabled: true,
            committed_collateral: 0,
        }
    }

    /// Reads every field out of `store`.
    pub fn load(store: &GlobalState) -> Result<Self, PoolError> {
        let governor = store
            .get_bytes(KEY_GOVERNOR)
            .and_then(|b| <[u8; 32]>::try_from(b).ok())
            .map(Address::from_bytes)
            .ok_or_else(|| corrupt(KEY_GOVERNOR))?;

        let pool_token = if store.exists(KEY_POOL_TOKEN) {
            Some(AssetId(uint(store, KEY_POOL_TOKEN)?))
        } else {
            None
        };

        Ok(Self {
            governor,
            pool_token,
            mint_price: uint(store, KEY_MINT_PRICE)?,
            redeem_price: uint(store, KEY_REDEEM_PRICE)?,
            redeem_enabled: uint(store, KEY_REDEEM_ENABLED)? != 0,
            committed_collateral: uint(store, KEY_COMMITTED)?,
        })
    }

    /// Full write set reproducing this snapshot in an empty store.
    pub fn to_delta(&self) -> StateDelta {
        let mut delta = PoolDelta::new()
            .governor(self.governor)
            .mint_price(self.mint_price)
            .redeem_price(self.redeem_price)
            .redeem_enabled(self.redeem_enabled)
            .committed_collateral(self.committed_collateral);
        if let Some(token) = self.pool_token {
            delta = delta.pool_token(token);
        }
        delta.into_inner()
    }
}

fn uint(store: &GlobalState, key: &str) -> Result<u64, PoolError> {
    store.get_uint(key).ok_or_else(|| corrupt(key))
}

fn corrupt(key: &str) -> PoolError {
    PoolError::CorruptState {
        key: key.to_string(),
    }
}

// ---------------------------------------------------------------------------
// PoolDelta
// ---------------------------------------------------------------------------

/// Typed builder for the writes an action makes.
#[derive(Debug, Default)]
pub struct PoolDelta(StateDelta);

impl PoolDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn governor(mut self, governor: Address) -> Self {
        self.0.set_bytes(KEY_GOVERNOR, governor.as_bytes().to_vec());
        self
    }

    pub fn pool_token(mut self, token: AssetId) -> Self {
        self.0.set_uint(KEY_POOL_TOKEN, token.0);
        self
    }

    pub fn mint_price(mut self, price: u64) -> Self {
        self.0.set_uint(KEY_MINT_PRICE, price);
        self
    }

    pub fn redeem_price(mut self, price: u64) -> Self {
        self.0.set_uint(KEY_REDEEM_PRICE, price);
        self
    }

    pub fn redeem_enabled(mut self, enabled: bool) -> Self {
        self.0.set_uint(KEY_REDEEM_ENABLED, u64::from(enabled));
        self
    }

    pub fn committed_collateral(mut self, amount: u64) -> Self {
        self.0.set_uint(KEY_COMMITTED, amount);
        self
    }

    pub fn into_inner(self) -> StateDelta {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ally_protocol::storage::StateValue;

    fn store_for(state: &PoolState) -> GlobalState {
        let mut store = GlobalState::new();
        store.apply(&state.to_delta());
        store
    }

    #[test]
    fn genesis_defaults() {
        let creator = Address::from_label("creator");
        let state = PoolState::genesis(creator);
        assert_eq!(state.governor, creator);
        assert_eq!(state.pool_token, None);
        assert_eq!(state.mint_price, DEFAULT_PRICE);
        assert_eq!(state.redeem_price, DEFAULT_PRICE);
        assert!(state.redeem_enabled);
        assert_eq!(state.committed_collateral, 0);
    }

    #[test]
    fn unset_pool_token_stays_absent_in_store() {
        let state = PoolState::genesis(Address::from_label("creator"));
        let store = store_for(&state);
        assert!(!store.exists(KEY_POOL_TOKEN));
        assert_eq!(PoolState::load(&store).unwrap(), state);
    }

    #[test]
    fn bootstrapped_state_loads_back() {
        let mut state = PoolState::genesis(Address::from_label("creator"));
        state.pool_token = Some(AssetId(1_000));
        state.redeem_enabled = false;
        state.committed_collateral = 12;
        assert_eq!(PoolState::load(&store_for(&state)).unwrap(), state);
    }

    #[test]
    fn wrong_types_are_corrupt() {
        let mut store = store_for(&PoolState::genesis(Address::from_label("creator")));
        store.put(KEY_MINT_PRICE, StateValue::Bytes(vec![1]));
        assert_eq!(
            PoolState::load(&store),
            Err(PoolError::CorruptState {
                key: KEY_MINT_PRICE.into()
            })
        );

        store.put(KEY_GOVERNOR, StateValue::Bytes(vec![0; 31]));
        assert!(matches!(
            PoolState::load(&store),
            Err(PoolError::CorruptState { key }) if key == KEY_GOVERNOR
        ));
    }
}
