//! # Inner-Transfer Issuer
//!
//! Queues the transfers a pool makes from its own account as the result of
//! an action. Each request is checked against the authoritative balance
//! view when it is queued, net of anything already queued by the same
//! invocation, so the runtime never has to apply a transfer the pool cannot
//! fund.
//!
//! The seed reserve is never spendable: a collateral payment may use at
//! most `balance - SEED_AMOUNT`.

use ally_protocol::config::{MAX_NOTE_LENGTH, SEED_AMOUNT};
use ally_protocol::identity::{Address, AssetId};
use ally_protocol::ledger::{AssetParams, BalanceView};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PoolError;

/// A transfer or asset creation the pool performs from its own account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InnerTxn {
    /// Collateral payment, optionally carrying a note.
    Pay {
        receiver: Address,
        amount: u64,
        note: Option<Vec<u8>>,
    },
    /// Issued-asset transfer.
    AssetTransfer {
        asset: AssetId,
        receiver: Address,
        amount: u64,
    },
    /// Asset creation. `expected_id` is the id the ledger is about to hand
    /// out; the pool records it before the creation is applied.
    CreateAsset {
        expected_id: AssetId,
        params: AssetParams,
    },
}

/// Builds the inner transactions for one invocation.
pub struct Issuer<'a, V: BalanceView> {
    pool: Address,
    view: &'a V,
    queued: BTreeMap<AssetId, u64>,
    txns: Vec<InnerTxn>,
}

impl<'a, V: BalanceView> Issuer<'a, V> {
    pub fn new(pool: Address, view: &'a V) -> Self {
        Self {
            pool,
            view,
            queued: BTreeMap::new(),
            txns: Vec::new(),
        }
    }

    /// What the pool may still send of `asset` in this invocation.
    pub fn available(&self, asset: AssetId) -> u64 {
        let balance = self.view.balance_of(&self.pool, asset);
        let spendable = if asset.is_collateral() {
            balance.saturating_sub(SEED_AMOUNT)
        } else {
            balance
        };
        spendable.saturating_sub(self.queued.get(&asset).copied().unwrap_or(0))
    }

    fn reserve(&mut self, asset: AssetId, amount: u64) -> Result<(), PoolError> {
        let available = self.available(asset);
        if amount > available {
            return Err(PoolError::InsufficientPoolBalance {
                asset,
                requested: amount,
                available,
            });
        }
        *self.queued.entry(asset).or_insert(0) += amount;
        Ok(())
    }

    /// Queues a collateral payment.
    pub fn pay(&mut self, receiver: Address, amount: u64) -> Result<(), PoolError> {
        self.pay_with_note(receiver, amount, None)
    }

    /// Queues a collateral payment carrying `note`.
    pub fn pay_with_note(
        &mut self,
        receiver: Address,
        amount: u64,
        note: Option<Vec<u8>>,
    ) -> Result<(), PoolError> {
        if let Some(note) = &note {
            if note.len() > MAX_NOTE_LENGTH {
                return Err(PoolError::invalid_argument(format!(
                    "note is {} bytes, max {MAX_NOTE_LENGTH}",
                    note.len()
                )));
            }
        }
        self.reserve(AssetId::COLLATERAL, amount)?;
        self.txns.push(InnerTxn::Pay {
            receiver,
            amount,
            note,
        });
        Ok(())
    }

    /// Queues an issued-asset transfer.
    pub fn transfer_asset(
        &mut self,
        receiver: Address,
        asset: AssetId,
        amount: u64,
    ) -> Result<(), PoolError> {
        self.reserve(asset, amount)?;
        self.txns.push(InnerTxn::AssetTransfer {
            asset,
            receiver,
            amount,
        });
        Ok(())
    }

    /// Queues creation of a new asset owned by the pool. Returns the id it
    /// will receive.
    pub fn create_asset(&mut self, params: AssetParams) -> AssetId {
        let expected_id = self.view.next_asset_id();
        self.txns.push(InnerTxn::CreateAsset {
            expected_id,
            params,
        });
        expected_id
    }

    pub fn finish(self) -> Vec<InnerTxn> {
        self.txns
    }
}
