//! # Identity Module
//!
//! Ledger account identity: 32-byte addresses plus the application and
//! asset identifiers that refer to on-ledger objects.
//!
//! Key material and signing are not here. The ledger trusts the `sender`
//! field of every transaction it is handed; authenticating that field is
//! the job of whatever sits in front of it.

pub mod address;

pub use address::{Address, AddressError, AppId, AssetId};
