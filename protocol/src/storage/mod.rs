//! # Storage Module
//!
//! Application state and on-disk persistence.
//!
//! ```text
//! state.rs: GlobalState key/value store and StateDelta write sets
//! db.rs   : AllyDb, sled persistence for the ledger and applications
//! ```
//!
//! Bincode for everything on disk. JSON is for the CLI and debugging.

pub mod db;
pub mod state;

pub use db::{AllyDb, DbError, DbResult};
pub use state::{GlobalState, StateDelta, StateValue, StateWrite};
