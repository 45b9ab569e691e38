//! # AllyDb: Persistent Storage Engine
//!
//! The persistence layer for the sandbox ledger and every application on
//! it, built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree       | Key                   | Value                   |
//! |------------|-----------------------|-------------------------|
//! | `accounts` | `address` (32B)       | `bincode(AccountState)` |
//! | `assets`   | `asset_id` (8B BE)    | `bincode(AssetInfo)`    |
//! | `apps`     | `app_id` (8B BE)      | `bincode(T)`            |
//! | `metadata` | key (UTF-8)           | value (bytes)           |
//!
//! Ids are stored as big-endian u64 so that sled's lexicographic ordering
//! matches numeric ordering.
//!
//! The `apps` tree is generic over its record type: the storage layer
//! knows nothing about what an application keeps, only how to file it.
//!
//! ## Atomicity
//!
//! `save_ledger` rewrites each tree with a single `Batch`, then flushes.
//! Callers persist only after a whole group has committed in memory, so a
//! crash loses at most the last group, never half of one.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Batch, Db, Tree};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::identity::{Address, AppId, AssetId};
use crate::ledger::{AccountState, AssetInfo, Ledger, LedgerCounters};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt key in tree {tree}: {len} bytes")]
    CorruptKey { tree: &'static str, len: usize },
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

/// Ledger id counters and clock.
const META_LEDGER_COUNTERS: &[u8] = b"ledger_counters";

// ---------------------------------------------------------------------------
// AllyDb
// ---------------------------------------------------------------------------

/// Persistent storage for the sandbox.
///
/// sled trees support lock-free concurrent reads, so `AllyDb` can be
/// shared via `Arc<AllyDb>` without external synchronization.
#[derive(Debug, Clone)]
pub struct AllyDb {
    db: Db,
    accounts: Tree,
    assets: Tree,
    apps: Tree,
    metadata: Tree,
}

impl AllyDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A database that lives in memory and disappears on drop. Tests only,
    /// mostly.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let accounts = db.open_tree("accounts")?;
        let assets = db.open_tree("assets")?;
        let apps = db.open_tree("apps")?;
        let metadata = db.open_tree("metadata")?;

        Ok(Self {
            db,
            accounts,
            assets,
            apps,
            metadata,
        })
    }

    // -- Ledger -------------------------------------------------------------

    /// Persists the full ledger, replacing whatever was stored before.
    pub fn save_ledger(&self, ledger: &Ledger) -> DbResult<()> {
        let mut account_batch = Batch::default();
        let mut live = BTreeSet::new();
        for (address, state) in ledger.accounts() {
            account_batch.insert(address.as_bytes().as_slice(), encode(state)?);
            live.insert(address.as_bytes().to_vec());
        }
        for key in self.accounts.iter().keys() {
            let key = key?;
            if !live.contains(key.as_ref()) {
                account_batch.remove(key);
            }
        }
        self.accounts.apply_batch(account_batch)?;

        let mut asset_batch = Batch::default();
        for info in ledger.assets() {
            asset_batch.insert(&info.id.0.to_be_bytes(), encode(info)?);
        }
        self.assets.apply_batch(asset_batch)?;

        self.metadata
            .insert(META_LEDGER_COUNTERS, encode(&ledger.counters())?)?;

        self.db.flush()?;
        tracing::debug!(
            accounts = self.accounts.len(),
            assets = self.assets.len(),
            "ledger saved"
        );
        Ok(())
    }

    /// Loads the ledger. `None` if nothing was ever saved.
    pub fn load_ledger(&self) -> DbResult<Option<Ledger>> {
        let counters: LedgerCounters = match self.metadata.get(META_LEDGER_COUNTERS)? {
            Some(bytes) => decode(&bytes)?,
            None => return Ok(None),
        };

        let mut accounts = BTreeMap::new();
        for entry in self.accounts.iter() {
            let (key, value) = entry?;
            let bytes: [u8; 32] = key.as_ref().try_into().map_err(|_| DbError::CorruptKey {
                tree: "accounts",
                len: key.len(),
            })?;
            let state: AccountState = decode(&value)?;
            accounts.insert(Address::from_bytes(bytes), state);
        }

        let mut assets = BTreeMap::new();
        for entry in self.assets.iter() {
            let (key, value) = entry?;
            let id = AssetId(be_u64(&key, "assets")?);
            let info: AssetInfo = decode(&value)?;
            assets.insert(id, info);
        }

        Ok(Some(Ledger::from_parts(accounts, assets, counters)))
    }

    // -- Applications -------------------------------------------------------

    /// Stores the record for `app`, replacing any previous one.
    pub fn put_app<T: Serialize>(&self, app: AppId, record: &T) -> DbResult<()> {
        self.apps.insert(app.0.to_be_bytes(), encode(record)?)?;
        Ok(())
    }

    /// The record for `app`, if present.
    pub fn get_app<T: DeserializeOwned>(&self, app: AppId) -> DbResult<Option<T>> {
        match self.apps.get(app.0.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Drops the record for `app`. Returns whether one existed.
    pub fn remove_app(&self, app: AppId) -> DbResult<bool> {
        Ok(self.apps.remove(app.0.to_be_bytes())?.is_some())
    }

    /// Every stored application id, ascending.
    pub fn app_ids(&self) -> DbResult<Vec<AppId>> {
        self.apps
            .iter()
            .keys()
            .map(|key| Ok(AppId(be_u64(&key?, "apps")?)))
            .collect()
    }

    // -- Utility operations -------------------------------------------------

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn app_count(&self) -> usize {
        self.apps.len()
    }

    /// Blocks until all pending writes are durable.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

fn be_u64(key: &[u8], tree: &'static str) -> DbResult<u64> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| DbError::CorruptKey {
        tree,
        len: key.len(),
    })?;
    Ok(u64::from_be_bytes(bytes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AssetParams;

    fn sample_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        let alice = Address::from_label("alice");
        ledger.fund(alice, 10_000).unwrap();
        ledger
            .create_asset(
                alice,
                AssetParams {
                    total: 77,
                    decimals: 0,
                    name: "T".into(),
                    unit_name: "T".into(),
                    url: None,
                    manager: Address::ZERO,
                    reserve: Address::ZERO,
                    freeze: Address::ZERO,
                    clawback: Address::ZERO,
                },
            )
            .unwrap();
        ledger.allocate_app_id().unwrap();
        ledger.set_timestamp(1_700_000_000);
        ledger
    }

    #[test]
    fn empty_database_has_no_ledger() {
        let db = AllyDb::open_temporary().expect("should create temp db");
        assert!(db.load_ledger().unwrap().is_none());
        assert_eq!(db.account_count(), 0);
        assert_eq!(db.app_count(), 0);
    }

    #[test]
    fn ledger_round_trips() {
        let db = AllyDb::open_temporary().unwrap();
        let ledger = sample_ledger();
        db.save_ledger(&ledger).unwrap();
        assert_eq!(db.load_ledger().unwrap(), Some(ledger));
    }

    #[test]
    fn save_drops_accounts_no_longer_present() {
        let db = AllyDb::open_temporary().unwrap();
        db.save_ledger(&sample_ledger()).unwrap();
        assert_eq!(db.account_count(), 1);

        db.save_ledger(&Ledger::new()).unwrap();
        assert_eq!(db.account_count(), 0);
    }

    #[test]
    fn app_records_crud() {
        let db = AllyDb::open_temporary().unwrap();
        db.put_app(AppId(2), &"second".to_string()).unwrap();
        db.put_app(AppId(1), &"first".to_string()).unwrap();

        assert_eq!(db.app_ids().unwrap(), vec![AppId(1), AppId(2)]);
        assert_eq!(
            db.get_app::<String>(AppId(1)).unwrap().as_deref(),
            Some("first")
        );

        assert!(db.remove_app(AppId(1)).unwrap());
        assert!(!db.remove_app(AppId(1)).unwrap());
        assert!(db.get_app::<String>(AppId(1)).unwrap().is_none());
    }

    #[test]
    fn persistent_database_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = sample_ledger();
        {
            let db = AllyDb::open(dir.path()).expect("should open db");
            db.save_ledger(&ledger).unwrap();
        }
        let db = AllyDb::open(dir.path()).expect("should reopen db");
        assert_eq!(db.load_ledger().unwrap(), Some(ledger));
    }
}
