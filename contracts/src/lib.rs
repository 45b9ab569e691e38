//! # Ally Pool Contracts
//!
//! The collateral pool: a vault that issues a wrapped token against the
//! ledger's base asset at governor-set prices, and the runtime that runs
//! it group by group.
//!
//! - **state**: typed view over the pool's key/value store.
//! - **pricing**: fixed-point conversion and the two pool policies.
//! - **guard**: the governor check.
//! - **group**: per-action shape validation of atomic groups.
//! - **issuer**: transfers the pool makes from its own account.
//! - **dispatch**: the state machine proper.
//! - **runtime**: atomic execution and persistence.
//!
//! ## Design Principles
//!
//! 1. Every check runs before any write. A rejected group leaves the
//!    ledger, the pool and the inner-transfer log exactly as they were.
//! 2. Pools read balances from the ledger, never from cached counters.
//! 3. Prices are integers over `PRICE_SCALE`; products are taken in `u128`
//!    and overflow is an error, not a wrap.

pub mod dispatch;
pub mod error;
pub mod group;
pub mod guard;
pub mod issuer;
pub mod pricing;
pub mod runtime;
pub mod state;

pub use dispatch::{Lifecycle, Outcome, Pool, Selector};
pub use error::PoolError;
pub use issuer::InnerTxn;
pub use pricing::{FixedRatioPolicy, LockWindow, PoolPolicy, PricedPolicy, PricingPolicy};
pub use runtime::{GroupReceipt, Runtime, RuntimeError};
pub use state::PoolState;
