//! # Sandbox Ledger
//!
//! In-memory account ledger: collateral balances, issued-asset holdings,
//! asset registry, and the id counters for assets and applications.
//!
//! Applications never touch a `Ledger` directly. They read it through
//! [`BalanceView`], and whatever executes them applies their effects with
//! the mutating methods here. Staging is plain `Clone`: copy the ledger,
//! apply a group to the copy, and swap it in only if every member
//! succeeded.
//!
//! ## Transfer rules
//!
//! 1. The sender must hold at least `amount` of the asset.
//! 2. The receiver's balance must not overflow `u64`.
//! 3. Zero-amount transfers are allowed (they carry notes).
//! 4. Asset transfers must name an asset that exists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::asset::{AssetInfo, AssetParams};
use crate::config::{FIRST_APP_ID, FIRST_ISSUED_ASSET_ID};
use crate::identity::{Address, AppId, AssetId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while moving value on the ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The sender cannot cover the transfer.
    #[error("insufficient funds: {account} holds {balance} of asset {asset}, needs {amount}")]
    InsufficientFunds {
        /// Debited account.
        account: Address,
        /// Asset being moved.
        asset: AssetId,
        /// Current balance.
        balance: u64,
        /// Requested amount.
        amount: u64,
    },

    /// The credit would overflow the receiver's balance.
    #[error("balance overflow crediting {amount} of asset {asset} to {account}")]
    BalanceOverflow {
        /// Credited account.
        account: Address,
        /// Asset being moved.
        asset: AssetId,
        /// Requested amount.
        amount: u64,
    },

    /// The asset id does not refer to a created asset.
    #[error("unknown asset: {0}")]
    UnknownAsset(AssetId),

    /// Collateral moves via payments, not asset transfers.
    #[error("collateral must be moved with a payment, not an asset transfer")]
    CollateralViaAssetTransfer,

    /// An id counter ran out.
    #[error("{0} id space exhausted")]
    IdsExhausted(&'static str),
}

// ---------------------------------------------------------------------------
// BalanceView
// ---------------------------------------------------------------------------

/// Read-only, authoritative view of ledger state handed to applications.
pub trait BalanceView {
    /// Balance of `asset` held by `account`. Unknown accounts hold zero.
    fn balance_of(&self, account: &Address, asset: AssetId) -> u64;

    /// Registry entry for `asset`, if it exists.
    fn asset_info(&self, asset: AssetId) -> Option<&AssetInfo>;

    /// The id the next created asset will receive.
    fn next_asset_id(&self) -> AssetId;

    /// Unix seconds of the latest ledger round.
    fn latest_timestamp(&self) -> u64;
}

// ---------------------------------------------------------------------------
// AccountState
// ---------------------------------------------------------------------------

/// Everything the ledger tracks for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Base collateral balance.
    pub collateral: u64,
    /// Issued-asset balances. Absent means zero.
    pub holdings: BTreeMap<AssetId, u64>,
}

impl AccountState {
    fn balance(&self, asset: AssetId) -> u64 {
        if asset.is_collateral() {
            self.collateral
        } else {
            self.holdings.get(&asset).copied().unwrap_or(0)
        }
    }

    fn slot(&mut self, asset: AssetId) -> &mut u64 {
        if asset.is_collateral() {
            &mut self.collateral
        } else {
            self.holdings.entry(asset).or_insert(0)
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Id counters and clock persisted alongside the account and asset trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCounters {
    pub next_asset_id: u64,
    pub next_app_id: u64,
    pub timestamp: u64,
}

/// The sandbox ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    accounts: BTreeMap<Address, AccountState>,
    assets: BTreeMap<AssetId, AssetInfo>,
    next_asset_id: u64,
    next_app_id: u64,
    timestamp: u64,
}

impl Ledger {
    /// An empty ledger at timestamp zero.
    pub fn new() -> Self {
        Self {
            accounts: BTreeMap::new(),
            assets: BTreeMap::new(),
            next_asset_id: FIRST_ISSUED_ASSET_ID,
            next_app_id: FIRST_APP_ID,
            timestamp: 0,
        }
    }

    /// Reassembles a ledger from its persisted parts.
    pub fn from_parts(
        accounts: BTreeMap<Address, AccountState>,
        assets: BTreeMap<AssetId, AssetInfo>,
        counters: LedgerCounters,
    ) -> Self {
        Self {
            accounts,
            assets,
            next_asset_id: counters.next_asset_id,
            next_app_id: counters.next_app_id,
            timestamp: counters.timestamp,
        }
    }

    pub fn counters(&self) -> LedgerCounters {
        LedgerCounters {
            next_asset_id: self.next_asset_id,
            next_app_id: self.next_app_id,
            timestamp: self.timestamp,
        }
    }

    /// Sets the round timestamp (unix seconds).
    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    /// Mints collateral into `account` out of thin air. Genesis / dispenser
    /// use only.
    pub fn fund(&mut self, account: Address, amount: u64) -> Result<(), LedgerError> {
        self.credit(account, AssetId::COLLATERAL, amount)
    }

    /// Moves collateral.
    pub fn pay(&mut self, from: Address, to: Address, amount: u64) -> Result<(), LedgerError> {
        self.debit(from, AssetId::COLLATERAL, amount)?;
        self.credit(to, AssetId::COLLATERAL, amount)
    }

    /// Moves an issued asset.
    pub fn transfer_asset(
        &mut self,
        asset: AssetId,
        from: Address,
        to: Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        if asset.is_collateral() {
            return Err(LedgerError::CollateralViaAssetTransfer);
        }
        if !self.assets.contains_key(&asset) {
            return Err(LedgerError::UnknownAsset(asset));
        }
        self.debit(from, asset, amount)?;
        self.credit(to, asset, amount)
    }

    /// Registers a new asset and credits its whole supply to `creator`.
    pub fn create_asset(
        &mut self,
        creator: Address,
        params: AssetParams,
    ) -> Result<AssetId, LedgerError> {
        let id = AssetId(self.next_asset_id);
        self.next_asset_id = self
            .next_asset_id
            .checked_add(1)
            .ok_or(LedgerError::IdsExhausted("asset"))?;

        let total = params.total;
        self.assets.insert(
            id,
            AssetInfo {
                id,
                creator,
                params,
            },
        );
        self.credit(creator, id, total)?;

        tracing::debug!(asset = %id, creator = %creator.short(), total, "asset created");
        Ok(id)
    }

    /// Hands out the next application id.
    pub fn allocate_app_id(&mut self) -> Result<AppId, LedgerError> {
        let id = AppId(self.next_app_id);
        self.next_app_id = self
            .next_app_id
            .checked_add(1)
            .ok_or(LedgerError::IdsExhausted("application"))?;
        Ok(id)
    }

    /// Account state, if the account has ever been touched.
    pub fn account(&self, address: &Address) -> Option<&AccountState> {
        self.accounts.get(address)
    }

    /// All touched accounts in address order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &AccountState)> {
        self.accounts.iter()
    }

    /// All created assets in id order.
    pub fn assets(&self) -> impl Iterator<Item = &AssetInfo> {
        self.assets.values()
    }

    /// Sum of every account's holding of `asset`.
    pub fn circulating(&self, asset: AssetId) -> u128 {
        self.accounts
            .values()
            .map(|a| a.balance(asset) as u128)
            .sum()
    }

    fn debit(&mut self, account: Address, asset: AssetId, amount: u64) -> Result<(), LedgerError> {
        let balance = self.balance_of(&account, asset);
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account,
                asset,
                balance,
                amount,
            });
        }
        *self.accounts.entry(account).or_default().slot(asset) = balance - amount;
        Ok(())
    }

    fn credit(&mut self, account: Address, asset: AssetId, amount: u64) -> Result<(), LedgerError> {
        let slot = self.accounts.entry(account).or_default().slot(asset);
        *slot = slot.checked_add(amount).ok_or(LedgerError::BalanceOverflow {
            account,
            asset,
            amount,
        })?;
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceView for Ledger {
    fn balance_of(&self, account: &Address, asset: AssetId) -> u64 {
        self.accounts
            .get(account)
            .map(|a| a.balance(asset))
            .unwrap_or(0)
    }

    fn asset_info(&self, asset: AssetId) -> Option<&AssetInfo> {
        self.assets.get(&asset)
    }

    fn next_asset_id(&self) -> AssetId {
        AssetId(self.next_asset_id)
    }

    fn latest_timestamp(&self) -> u64 {
        self.timestamp
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    fn token_params(total: u64) -> AssetParams {
        AssetParams {
            total,
            decimals: 6,
            name: "Test".into(),
            unit_name: "TST".into(),
            url: None,
            manager: Address::ZERO,
            reserve: Address::ZERO,
            freeze: Address::ZERO,
            clawback: Address::ZERO,
        }
    }

    #[test]
    fn unknown_account_has_zero_balance() {
        let ledger = Ledger::new();
        assert_eq!(ledger.balance_of(&alice(), AssetId::COLLATERAL), 0);
        assert!(ledger.account(&alice()).is_none());
    }

    #[test]
    fn pay_moves_collateral() {
        let mut ledger = Ledger::new();
        ledger.fund(alice(), 1_000).unwrap();
        ledger.pay(alice(), bob(), 400).unwrap();
        assert_eq!(ledger.balance_of(&alice(), AssetId::COLLATERAL), 600);
        assert_eq!(ledger.balance_of(&bob(), AssetId::COLLATERAL), 400);
    }

    #[test]
    fn pay_more_than_balance_rejected_without_side_effects() {
        let mut ledger = Ledger::new();
        ledger.fund(alice(), 100).unwrap();
        let before = ledger.clone();
        let err = ledger.pay(alice(), bob(), 101).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account: alice(),
                asset: AssetId::COLLATERAL,
                balance: 100,
                amount: 101,
            }
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn zero_payment_allowed() {
        let mut ledger = Ledger::new();
        ledger.pay(alice(), bob(), 0).unwrap();
        assert_eq!(ledger.balance_of(&bob(), AssetId::COLLATERAL), 0);
    }

    #[test]
    fn create_asset_credits_creator_and_bumps_id() {
        let mut ledger = Ledger::new();
        let expected = ledger.next_asset_id();
        let id = ledger.create_asset(alice(), token_params(500)).unwrap();
        assert_eq!(id, expected);
        assert_eq!(ledger.balance_of(&alice(), id), 500);
        assert_eq!(ledger.next_asset_id(), AssetId(id.0 + 1));
        assert_eq!(ledger.asset_info(id).unwrap().creator, alice());
    }

    #[test]
    fn transfer_asset_checks_existence_and_balance() {
        let mut ledger = Ledger::new();
        assert_eq!(
            ledger.transfer_asset(AssetId(9_999), alice(), bob(), 1),
            Err(LedgerError::UnknownAsset(AssetId(9_999)))
        );
        assert_eq!(
            ledger.transfer_asset(AssetId::COLLATERAL, alice(), bob(), 1),
            Err(LedgerError::CollateralViaAssetTransfer)
        );

        let id = ledger.create_asset(alice(), token_params(50)).unwrap();
        ledger.transfer_asset(id, alice(), bob(), 20).unwrap();
        assert_eq!(ledger.balance_of(&bob(), id), 20);
        assert!(ledger.transfer_asset(id, bob(), alice(), 21).is_err());
        assert_eq!(ledger.circulating(id), 50);
    }

    #[test]
    fn credit_overflow_detected() {
        let mut ledger = Ledger::new();
        ledger.fund(alice(), u64::MAX).unwrap();
        assert!(matches!(
            ledger.fund(alice(), 1),
            Err(LedgerError::BalanceOverflow { .. })
        ));
    }

    #[test]
    fn app_ids_are_sequential() {
        let mut ledger = Ledger::new();
        let a = ledger.allocate_app_id().unwrap();
        let b = ledger.allocate_app_id().unwrap();
        assert_eq!(b.0, a.0 + 1);
        assert!(!a.is_create());
    }
}
