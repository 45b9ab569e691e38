//! # Group Validator
//!
//! Turns a raw atomic group into a typed, per-action view, or rejects it
//! with [`PoolError::MalformedGroup`]. Nothing downstream of this module
//! indexes into a group by position.
//!
//! ## Shapes
//!
//! ```text
//! bootstrap : [ pay(gov -> pool, SEED_AMOUNT) , call(gov)            ]
//! mint      : [ call(user, assets=[token])    , pay(user -> pool, >MIN) ]
//! redeem    : [ call(user, assets=[token])    , axfer(user -> pool, token) ]
//! admin     : [ call(gov) ]
//! ```
//!
//! The invoked call must sit at the position its shape names; a group with
//! its legs swapped is malformed even if both legs are individually valid.

use ally_protocol::config::{MIN_MINT_PAYMENT, SEED_AMOUNT};
use ally_protocol::identity::{Address, AppId, AssetId};
use ally_protocol::transaction::{ApplicationCall, AssetTransfer, Payment, Transaction, TransactionGroup};

use crate::error::PoolError;

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// One application call being evaluated: the group it arrived in and its
/// position there.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub app_id: AppId,
    pub group: &'a TransactionGroup,
    pub position: usize,
}

impl<'a> Invocation<'a> {
    pub fn new(app_id: AppId, group: &'a TransactionGroup, position: usize) -> Self {
        Self {
            app_id,
            group,
            position,
        }
    }

    /// The transaction being evaluated.
    pub fn txn(&self) -> Result<&'a Transaction, PoolError> {
        self.group
            .get(self.position)
            .ok_or_else(|| PoolError::malformed(format!("no member at {}", self.position)))
    }

    /// The application call being evaluated.
    pub fn call(&self) -> Result<&'a ApplicationCall, PoolError> {
        self.txn()?
            .as_app_call()
            .ok_or_else(|| PoolError::malformed("invoked member is not an application call"))
    }

    pub fn sender(&self) -> Result<Address, PoolError> {
        Ok(self.txn()?.sender)
    }

    /// Address of the invoked pool.
    pub fn pool_address(&self) -> Address {
        self.app_id.address()
    }
}

// ---------------------------------------------------------------------------
// Typed views
// ---------------------------------------------------------------------------

/// A validated bootstrap group.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapGroup<'a> {
    pub sender: Address,
    pub seed: &'a Payment,
    pub call: &'a ApplicationCall,
}

/// A validated mint group.
#[derive(Debug, Clone, Copy)]
pub struct MintGroup<'a> {
    pub caller: Address,
    pub call: &'a ApplicationCall,
    pub payment: &'a Payment,
}

/// A validated redeem group.
#[derive(Debug, Clone, Copy)]
pub struct RedeemGroup<'a> {
    pub caller: Address,
    pub call: &'a ApplicationCall,
    pub transfer: &'a AssetTransfer,
}

/// A validated single-call group.
#[derive(Debug, Clone, Copy)]
pub struct SingleCall<'a> {
    pub caller: Address,
    pub call: &'a ApplicationCall,
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

fn expect_size(inv: &Invocation<'_>, size: usize) -> Result<(), PoolError> {
    if inv.group.len() != size {
        return Err(PoolError::malformed(format!(
            "expected {size} transactions, got {}",
            inv.group.len()
        )));
    }
    Ok(())
}

fn expect_position(inv: &Invocation<'_>, position: usize) -> Result<(), PoolError> {
    if inv.position != position {
        return Err(PoolError::malformed(format!(
            "application call must be at position {position}, found at {}",
            inv.position
        )));
    }
    Ok(())
}

fn references_token(call: &ApplicationCall, token: AssetId) -> Result<(), PoolError> {
    match call.foreign_assets.first() {
        Some(asset) if *asset == token => Ok(()),
        Some(asset) => Err(PoolError::malformed(format!(
            "call references asset {asset}, expected pool token {token}"
        ))),
        None => Err(PoolError::malformed("call does not reference the pool token")),
    }
}

fn same_sender(a: &Transaction, b: &Transaction) -> Result<(), PoolError> {
    if a.sender != b.sender {
        return Err(PoolError::malformed("group members have different senders"));
    }
    Ok(())
}

/// Seed payment then call, both from the same account.
pub fn validate_bootstrap<'a>(inv: &Invocation<'a>) -> Result<BootstrapGroup<'a>, PoolError> {
    expect_size(inv, 2)?;
    expect_position(inv, 1)?;
    let seed_txn = inv.group.get(0).ok_or_else(|| PoolError::malformed("missing seed leg"))?;
    let call_txn = inv.txn()?;

    let seed = seed_txn
        .as_payment()
        .ok_or_else(|| PoolError::malformed("seed leg must be a collateral payment"))?;
    if seed.receiver != inv.pool_address() {
        return Err(PoolError::malformed("seed leg must pay the pool"));
    }
    if seed.amount != SEED_AMOUNT {
        return Err(PoolError::malformed(format!(
            "seed leg must carry exactly {SEED_AMOUNT}, got {}",
            seed.amount
        )));
    }
    same_sender(seed_txn, call_txn)?;

    Ok(BootstrapGroup {
        sender: call_txn.sender,
        seed,
        call: inv.call()?,
    })
}

/// Call referencing the token, then a payment into the pool above dust.
pub fn validate_mint<'a>(inv: &Invocation<'a>, token: AssetId) -> Result<MintGroup<'a>, PoolError> {
    expect_size(inv, 2)?;
    expect_position(inv, 0)?;
    let call_txn = inv.txn()?;
    let call = inv.call()?;
    let pay_txn = inv.group.get(1).ok_or_else(|| PoolError::malformed("missing payment leg"))?;

    references_token(call, token)?;
    let payment = pay_txn
        .as_payment()
        .ok_or_else(|| PoolError::malformed("mint leg must be a collateral payment"))?;
    if payment.receiver != inv.pool_address() {
        return Err(PoolError::malformed("mint payment must go to the pool"));
    }
    if payment.amount <= MIN_MINT_PAYMENT {
        return Err(PoolError::malformed(format!(
            "mint payment of {} is at or below the {MIN_MINT_PAYMENT} minimum",
            payment.amount
        )));
    }
    same_sender(call_txn, pay_txn)?;

    Ok(MintGroup {
        caller: call_txn.sender,
        call,
        payment,
    })
}

/// Call referencing the token, then the token returned to the pool.
/// Also requires redemptions to be enabled.
pub fn validate_redeem<'a>(
    inv: &Invocation<'a>,
    token: AssetId,
    redeem_enabled: bool,
) -> Result<RedeemGroup<'a>, PoolError> {
    expect_size(inv, 2)?;
    expect_position(inv, 0)?;
    let call_txn = inv.txn()?;
    let call = inv.call()?;
    let xfer_txn = inv.group.get(1).ok_or_else(|| PoolError::malformed("missing transfer leg"))?;

    references_token(call, token)?;
    let transfer = xfer_txn
        .as_asset_transfer()
        .ok_or_else(|| PoolError::malformed("redeem leg must be an asset transfer"))?;
    if transfer.asset_id != token {
        return Err(PoolError::malformed(format!(
            "redeem leg moves asset {}, expected pool token {token}",
            transfer.asset_id
        )));
    }
    if transfer.receiver != inv.pool_address() {
        return Err(PoolError::malformed("redeem transfer must go to the pool"));
    }
    same_sender(call_txn, xfer_txn)?;

    if !redeem_enabled {
        return Err(PoolError::RedeemDisabled);
    }

    Ok(RedeemGroup {
        caller: call_txn.sender,
        call,
        transfer,
    })
}

/// A lone application call.
pub fn validate_single<'a>(inv: &Invocation<'a>) -> Result<SingleCall<'a>, PoolError> {
    expect_size(inv, 1)?;
    Ok(SingleCall {
        caller: inv.sender()?,
        call: inv.call()?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
