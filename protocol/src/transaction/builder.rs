//! Transaction construction via the builder pattern.
//!
//! [`TransactionBuilder`] covers the two value-moving transaction types;
//! [`AppCallBuilder`] covers application calls, which carry enough extra
//! fields (arguments, referenced accounts, foreign assets, program) to
//! deserve their own builder.
//!
//! Nothing here signs. The ledger trusts `sender` as given.

use serde::{Deserialize, Serialize};

use super::types::{OnCompletion, TxnType};
use crate::crypto::hash::sha256;
use crate::identity::{Address, AppId, AssetId};

// ---------------------------------------------------------------------------
// Transaction bodies
// ---------------------------------------------------------------------------

/// Transfer of the base collateral asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Account credited with `amount`.
    pub receiver: Address,
    /// Collateral units moved.
    pub amount: u64,
}

/// Transfer of an issued asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTransfer {
    /// Asset being moved. Never [`AssetId::COLLATERAL`].
    pub asset_id: AssetId,
    /// Account credited with `amount`.
    pub receiver: Address,
    /// Asset units moved.
    pub amount: u64,
}

/// Invocation of an application.
///
/// `args[0]` is conventionally the action selector. `accounts` and
/// `foreign_assets` are the extra ledger objects the call is allowed to
/// reference; the sender is always implicitly available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCall {
    /// Target application, or [`AppId::CREATE`].
    pub app_id: AppId,
    /// Lifecycle action requested alongside the call.
    pub on_completion: OnCompletion,
    /// Raw application arguments.
    pub args: Vec<Vec<u8>>,
    /// Referenced accounts, excluding the sender.
    pub accounts: Vec<Address>,
    /// Referenced assets.
    pub foreign_assets: Vec<AssetId>,
    /// Program descriptor, present on create and update only.
    pub program: Option<Vec<u8>>,
}

impl ApplicationCall {
    /// The selector argument, if any.
    pub fn selector(&self) -> Option<&[u8]> {
        self.args.first().map(Vec::as_slice)
    }

    /// Argument `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&[u8]> {
        self.args.get(index).map(Vec::as_slice)
    }
}

/// The body of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnKind {
    Payment(Payment),
    AssetTransfer(AssetTransfer),
    ApplicationCall(ApplicationCall),
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A single ledger transaction.
///
/// Transactions only take effect as members of a
/// [`TransactionGroup`](super::group::TransactionGroup); a lone transaction
/// is a group of one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Account that authorised the transaction.
    pub sender: Address,
    /// What the transaction does.
    pub kind: TxnKind,
    /// Opaque note bytes. The ledger stores them and attaches no meaning.
    pub note: Option<Vec<u8>>,
}

impl Transaction {
    /// The transaction's type discriminant.
    pub fn tx_type(&self) -> TxnType {
        match self.kind {
            TxnKind::Payment(_) => TxnType::Payment,
            TxnKind::AssetTransfer(_) => TxnType::AssetTransfer,
            TxnKind::ApplicationCall(_) => TxnType::ApplicationCall,
        }
    }

    /// The payment body, if this is a payment.
    pub fn as_payment(&self) -> Option<&Payment> {
        match &self.kind {
            TxnKind::Payment(p) => Some(p),
            _ => None,
        }
    }

    /// The asset-transfer body, if this is an asset transfer.
    pub fn as_asset_transfer(&self) -> Option<&AssetTransfer> {
        match &self.kind {
            TxnKind::AssetTransfer(t) => Some(t),
            _ => None,
        }
    }

    /// The application-call body, if this is an application call.
    pub fn as_app_call(&self) -> Option<&ApplicationCall> {
        match &self.kind {
            TxnKind::ApplicationCall(c) => Some(c),
            _ => None,
        }
    }

    /// Canonical bytes used for hashing. bincode is deterministic for these
    /// types: fixed field order, fixed-width integers.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }

    /// Hex-encoded SHA-256 of [`canonical_bytes`](Self::canonical_bytes).
    pub fn id(&self) -> String {
        hex::encode(sha256(&self.canonical_bytes()))
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for payments and asset transfers.
///
/// # Usage
///
/// ```
/// use ally_protocol::identity::Address;
/// use ally_protocol::transaction::TransactionBuilder;
///
/// let alice = Address::from_label("alice");
/// let bob = Address::from_label("bob");
/// let tx = TransactionBuilder::payment(alice, bob, 1_000_000)
///     .note(b"rent".to_vec())
///     .build();
/// assert_eq!(tx.as_payment().unwrap().amount, 1_000_000);
/// ```
pub struct TransactionBuilder {
    sender: Address,
    kind: TxnKind,
    note: Option<Vec<u8>>,
}

impl TransactionBuilder {
    /// Starts a collateral payment.
    pub fn payment(sender: Address, receiver: Address, amount: u64) -> Self {
        Self {
            sender,
            kind: TxnKind::Payment(Payment { receiver, amount }),
            note: None,
        }
    }

    /// Starts an asset transfer.
    pub fn asset_transfer(sender: Address, asset_id: AssetId, receiver: Address, amount: u64) -> Self {
        Self {
            sender,
            kind: TxnKind::AssetTransfer(AssetTransfer {
                asset_id,
                receiver,
                amount,
            }),
            note: None,
        }
    }

    /// Starts an application call. See [`AppCallBuilder`].
    pub fn app_call(sender: Address, app_id: AppId) -> AppCallBuilder {
        AppCallBuilder::new(sender, app_id)
    }

    /// Attaches a note.
    pub fn note(mut self, note: Vec<u8>) -> Self {
        self.note = Some(note);
        self
    }

    /// Consumes the builder.
    pub fn build(self) -> Transaction {
        Transaction {
            sender: self.sender,
            kind: self.kind,
            note: self.note,
        }
    }
}

// ---------------------------------------------------------------------------
// AppCallBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`ApplicationCall`] transactions.
///
/// ```
/// use ally_protocol::identity::{Address, AppId, AssetId};
/// use ally_protocol::transaction::TransactionBuilder;
///
/// let tx = TransactionBuilder::app_call(Address::from_label("alice"), AppId(1))
///     .selector("mint")
///     .foreign_asset(AssetId(1_000))
///     .build();
/// assert_eq!(tx.as_app_call().unwrap().selector(), Some(&b"mint"[..]));
/// ```
pub struct AppCallBuilder {
    sender: Address,
    call: ApplicationCall,
    note: Option<Vec<u8>>,
}

impl AppCallBuilder {
    fn new(sender: Address, app_id: AppId) -> Self {
        Self {
            sender,
            call: ApplicationCall {
                app_id,
                on_completion: OnCompletion::NoOp,
                args: Vec::new(),
                accounts: Vec::new(),
                foreign_assets: Vec::new(),
                program: None,
            },
            note: None,
        }
    }

    /// Sets the on-completion action. Defaults to [`OnCompletion::NoOp`].
    pub fn on_completion(mut self, on_completion: OnCompletion) -> Self {
        self.call.on_completion = on_completion;
        self
    }

    /// Pushes a UTF-8 selector as the next argument. Call it first.
    pub fn selector(self, selector: &str) -> Self {
        self.arg(selector.as_bytes().to_vec())
    }

    /// Pushes a raw argument.
    pub fn arg(mut self, arg: Vec<u8>) -> Self {
        self.call.args.push(arg);
        self
    }

    /// Pushes an integer argument as 8 big-endian bytes.
    pub fn uint_arg(self, value: u64) -> Self {
        self.arg(value.to_be_bytes().to_vec())
    }

    /// References an extra account.
    pub fn account(mut self, account: Address) -> Self {
        self.call.accounts.push(account);
        self
    }

    /// References an asset.
    pub fn foreign_asset(mut self, asset_id: AssetId) -> Self {
        self.call.foreign_assets.push(asset_id);
        self
    }

    /// Attaches a program descriptor (create and update only).
    pub fn program(mut self, program: Vec<u8>) -> Self {
        self.call.program = Some(program);
        self
    }

    /// Attaches a note.
    pub fn note(mut self, note: Vec<u8>) -> Self {
        self.note = Some(note);
        self
    }

    /// Consumes the builder.
    pub fn build(self) -> Transaction {
        Transaction {
            sender: self.sender,
            kind: TxnKind::ApplicationCall(self.call),
            note: self.note,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
