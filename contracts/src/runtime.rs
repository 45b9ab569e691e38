//! # Group Runtime
//!
//! Executes atomic groups against the sandbox ledger and the deployed
//! pools. A group either commits in full or leaves nothing behind.
//!
//! ## Execution
//!
//! ```text
//! staged = clone(ledger, pools)
//! for (i, txn) in group:
//!     pay / axfer     -> move value on staged ledger
//!     call app 0      -> allocate id, create pool from program descriptor
//!     call app n      -> pool.evaluate(group, i, staged ledger)
//!                        apply inner txns from the pool account
//!                        apply state delta, lifecycle change
//! all ok  -> swap staged into place
//! any err -> drop staged
//! ```
//!
//! Members run strictly in order, so a call sees the effects of every
//! member before it and none after it. One group runs at a time; `submit`
//! takes `&mut self`.

use std::collections::BTreeMap;

use ally_protocol::identity::{Address, AppId, AssetId};
use ally_protocol::ledger::{Ledger, LedgerError};
use ally_protocol::storage::{AllyDb, DbError};
use ally_protocol::transaction::{Transaction, TransactionGroup, TxnKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::{Lifecycle, Pool};
use crate::error::PoolError;
use crate::group::Invocation;
use crate::issuer::InnerTxn;
use crate::pricing::PoolPolicy;
use crate::state::PoolState;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a group was not committed.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An application rejected its call.
    #[error("member {position}: application {app_id} rejected the call: {source}")]
    Rejected {
        /// Index of the failing member.
        position: usize,
        /// Invoked application (0 for creation).
        app_id: AppId,
        #[source]
        source: PoolError,
    },

    /// A value transfer could not be applied.
    #[error("member {position}: {source}")]
    Ledger {
        /// Index of the failing member.
        position: usize,
        #[source]
        source: LedgerError,
    },

    /// The ledger assigned a different id than the pool recorded.
    #[error("application {app_id} expected asset {expected}, ledger created {actual}")]
    AssetIdMismatch {
        app_id: AppId,
        expected: AssetId,
        actual: AssetId,
    },

    /// A member was sent from an application account. Applications move
    /// funds only through their own inner transactions.
    #[error("member {position}: sender is the account of application {app_id}")]
    ApplicationSender {
        /// Index of the offending member.
        position: usize,
        /// Application owning the sender address.
        app_id: AppId,
    },

    #[error("storage error: {0}")]
    Db(#[from] DbError),
}

impl RuntimeError {
    /// The pool error behind a rejection, if that is what this is.
    pub fn pool_error(&self) -> Option<&PoolError> {
        match self {
            RuntimeError::Rejected { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// GroupReceipt
// ---------------------------------------------------------------------------

/// What a committed group did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupReceipt {
    /// Hex group id.
    pub group_id: String,
    /// Application created by this group, if any.
    pub created_app: Option<AppId>,
    /// Applications deleted by this group.
    pub deleted_apps: Vec<AppId>,
    /// Inner transactions, tagged with the index of the member that issued
    /// them.
    pub inner: Vec<(usize, InnerTxn)>,
}

impl GroupReceipt {
    /// Assets created by inner transactions.
    pub fn created_assets(&self) -> Vec<AssetId> {
        self.inner
            .iter()
            .filter_map(|(_, txn)| match txn {
                InnerTxn::CreateAsset { expected_id, .. } => Some(*expected_id),
                _ => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// The ledger plus every deployed pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Runtime {
    ledger: Ledger,
    pools: BTreeMap<AppId, Pool>,
}

impl Runtime {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            pools: BTreeMap::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Direct ledger access for funding and clock updates outside groups.
    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn pool(&self, app_id: AppId) -> Option<&Pool> {
        self.pools.get(&app_id)
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    /// Current state of a deployed pool.
    pub fn pool_state(&self, app_id: AppId) -> Result<PoolState, PoolError> {
        self.pools
            .get(&app_id)
            .ok_or(PoolError::UnknownApplication(app_id))?
            .state()
    }

    /// Runs a lone transaction.
    pub fn submit_txn(&mut self, txn: Transaction) -> Result<GroupReceipt, RuntimeError> {
        self.submit(&TransactionGroup::single(txn))
    }

    /// Runs `group` atomically.
    pub fn submit(&mut self, group: &TransactionGroup) -> Result<GroupReceipt, RuntimeError> {
        let group_id = group.id();
        let mut ledger = self.ledger.clone();
        let mut pools = self.pools.clone();
        let mut receipt = GroupReceipt {
            group_id: group_id.clone(),
            ..Default::default()
        };

        match execute(group, &mut ledger, &mut pools, &mut receipt) {
            Ok(()) => {
                self.ledger = ledger;
                self.pools = pools;
                tracing::info!(
                    group = %&group_id[..12],
                    members = group.len(),
                    inner = receipt.inner.len(),
                    "group committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!(group = %&group_id[..12], error = %err, "group rejected");
                Err(err)
            }
        }
    }

    // -- Persistence --------------------------------------------------------

    /// Writes the ledger and every pool to `db`, dropping pools that no
    /// longer exist.
    pub fn save(&self, db: &AllyDb) -> Result<(), RuntimeError> {
        db.save_ledger(&self.ledger)?;
        for app_id in db.app_ids()? {
            if !self.pools.contains_key(&app_id) {
                db.remove_app(app_id)?;
            }
        }
        for (app_id, pool) in &self.pools {
            db.put_app(*app_id, pool)?;
        }
        db.flush()?;
        Ok(())
    }

    /// Reads a runtime back from `db`. An empty database yields an empty
    /// runtime.
    pub fn load(db: &AllyDb) -> Result<Self, RuntimeError> {
        let ledger = db.load_ledger()?.unwrap_or_default();
        let mut pools = BTreeMap::new();
        for app_id in db.app_ids()? {
            if let Some(pool) = db.get_app::<Pool>(app_id)? {
                pools.insert(app_id, pool);
            }
        }
        Ok(Self { ledger, pools })
    }
}

fn execute(
    group: &TransactionGroup,
    ledger: &mut Ledger,
    pools: &mut BTreeMap<AppId, Pool>,
    receipt: &mut GroupReceipt,
) -> Result<(), RuntimeError> {
    for (position, txn) in group.iter().enumerate() {
        if let Some(owner) = pools.values().find(|p| p.address() == txn.sender) {
            return Err(RuntimeError::ApplicationSender {
                position,
                app_id: owner.app_id,
            });
        }
        let ledger_err = |source| RuntimeError::Ledger { position, source };
        match &txn.kind {
            TxnKind::Payment(p) => ledger
                .pay(txn.sender, p.receiver, p.amount)
                .map_err(ledger_err)?,
            TxnKind::AssetTransfer(t) => ledger
                .transfer_asset(t.asset_id, txn.sender, t.receiver, t.amount)
                .map_err(ledger_err)?,
            TxnKind::ApplicationCall(call) if call.app_id.is_create() => {
                let policy = match &call.program {
                    Some(program) => {
                        PoolPolicy::from_program(program).map_err(|source| {
                            RuntimeError::Rejected {
                                position,
                                app_id: AppId::CREATE,
                                source,
                            }
                        })?
                    }
                    None => PoolPolicy::default(),
                };
                let app_id = ledger.allocate_app_id().map_err(ledger_err)?;
                pools.insert(app_id, Pool::create(app_id, txn.sender, policy));
                receipt.created_app = Some(app_id);
            }
            TxnKind::ApplicationCall(call) => {
                let app_id = call.app_id;
                let rejected = |source| RuntimeError::Rejected {
                    position,
                    app_id,
                    source,
                };
                let pool = pools
                    .get(&app_id)
                    .ok_or(PoolError::UnknownApplication(app_id))
                    .map_err(rejected)?;
                let outcome = pool
                    .evaluate(&Invocation::new(app_id, group, position), &*ledger)
                    .map_err(rejected)?;

                let pool_address = pool.address();
                for inner in &outcome.inner {
                    apply_inner(ledger, app_id, pool_address, inner).map_err(|e| match e {
                        InnerError::Ledger(source) => RuntimeError::Ledger { position, source },
                        InnerError::Runtime(err) => err,
                    })?;
                    receipt.inner.push((position, inner.clone()));
                }

                match outcome.lifecycle {
                    Lifecycle::Deleted => {
                        pools.remove(&app_id);
                        receipt.deleted_apps.push(app_id);
                        tracing::info!(app = %app_id, "pool deleted");
                    }
                    lifecycle => {
                        if let Some(pool) = pools.get_mut(&app_id) {
                            pool.apply(&outcome.delta);
                            if let Lifecycle::Updated(policy) = lifecycle {
                                pool.policy = policy;
                                tracing::info!(app = %app_id, ?policy, "pool policy updated");
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

enum InnerError {
    Ledger(LedgerError),
    Runtime(RuntimeError),
}

impl From<LedgerError> for InnerError {
    fn from(err: LedgerError) -> Self {
        InnerError::Ledger(err)
    }
}

fn apply_inner(
    ledger: &mut Ledger,
    app_id: AppId,
    pool: Address,
    inner: &InnerTxn,
) -> Result<(), InnerError> {
    match inner {
        InnerTxn::Pay {
            receiver, amount, ..
        } => ledger.pay(pool, *receiver, *amount)?,
        InnerTxn::AssetTransfer {
            asset,
            receiver,
            amount,
        } => ledger.transfer_asset(*asset, pool, *receiver, *amount)?,
        InnerTxn::CreateAsset {
            expected_id,
            params,
        } => {
            let actual = ledger.create_asset(pool, params.clone())?;
            if actual != *expected_id {
                return Err(InnerError::Runtime(RuntimeError::AssetIdMismatch {
                    app_id,
                    expected: *expected_id,
                    actual,
                }));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
