//! # Transaction Module
//!
//! Construction and grouping of ledger transactions.
//!
//! ## Architecture
//!
//! ```text
//! types.rs  : TxnType and OnCompletion discriminants
//! builder.rs: Transaction bodies plus fluent builders
//! group.rs  : TransactionGroup: 1..=16 members that commit atomically
//! ```
//!
//! ## Design Decisions
//!
//! - All amounts are `u64` in the smallest unit. No floating point.
//! - Application calls carry raw byte arguments; decoding them is the
//!   application's business, not the ledger's.
//! - Ids are SHA-256 over bincode bytes, which are deterministic for every
//!   type in this module.

pub mod builder;
pub mod group;
pub mod types;

pub use builder::{
    AppCallBuilder, ApplicationCall, AssetTransfer, Payment, Transaction, TransactionBuilder,
    TxnKind,
};
pub use group::{GroupError, TransactionGroup};
pub use types::{OnCompletion, TxnType};
