//! # Ledger Module
//!
//! The external ledger the pool runs against, reduced to what the pool
//! needs: balances, asset creation, application ids, a clock.
//!
//! ```text
//! asset.rs  : AssetParams / AssetInfo
//! sandbox.rs: Ledger (in-memory, Clone-for-staging) and BalanceView
//! ```

pub mod asset;
pub mod sandbox;

pub use asset::{AssetInfo, AssetParams};
pub use sandbox::{AccountState, BalanceView, Ledger, LedgerCounters, LedgerError};
