// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ally Protocol: Ledger Library
//!
//! The vocabulary and machinery a collateral pool needs from the ledger it
//! runs on: addresses, transactions and atomic groups, balances and issued
//! assets, application key/value state, and persistence.
//!
//! Nothing in this crate knows what a pool is. The pool itself lives in
//! `ally-contracts` and sees the ledger only through
//! [`ledger::BalanceView`].
//!
//! ## Modules
//!
//! - **config**: Protocol constants. Fixed-point scale, seed, token params.
//! - **crypto**: SHA-256 and SHA-512/256, for address derivation and ids.
//! - **identity**: Addresses, application ids, asset ids.
//! - **transaction**: Payments, asset transfers, application calls, groups.
//! - **ledger**: The sandbox ledger and its read-only view.
//! - **storage**: Application global state and sled persistence.

pub mod config;
pub mod crypto;
pub mod identity;
pub mod ledger;
pub mod storage;
pub mod transaction;
