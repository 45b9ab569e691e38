//! Atomic transaction groups.
//!
//! A group is an ordered list of one to [`MAX_GROUP_SIZE`] transactions
//! that commit or fail together. Applications see the whole group when
//! they run, which is how a call and the payment that funds it get tied
//! together.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::builder::Transaction;
use crate::config::MAX_GROUP_SIZE;
use crate::crypto::hash::sha256;

/// Errors raised when assembling a group.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    /// A group needs at least one transaction.
    #[error("transaction group is empty")]
    Empty,

    /// The group exceeds the ledger's size limit.
    #[error("transaction group has {size} members (max {max})")]
    TooLarge {
        /// Number of transactions supplied.
        size: usize,
        /// Maximum allowed.
        max: usize,
    },
}

/// An ordered, size-checked set of transactions that commit atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionGroup {
    txns: Vec<Transaction>,
}

impl TransactionGroup {
    /// Assembles a group.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::Empty`] or [`GroupError::TooLarge`] if the
    /// member count is outside `1..=MAX_GROUP_SIZE`.
    pub fn new(txns: Vec<Transaction>) -> Result<Self, GroupError> {
        if txns.is_empty() {
            return Err(GroupError::Empty);
        }
        if txns.len() > MAX_GROUP_SIZE {
            return Err(GroupError::TooLarge {
                size: txns.len(),
                max: MAX_GROUP_SIZE,
            });
        }
        Ok(Self { txns })
    }

    /// A group of exactly one transaction.
    pub fn single(txn: Transaction) -> Self {
        Self { txns: vec![txn] }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.txns.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.txns.is_empty()
    }

    /// Member at `index`.
    pub fn get(&self, index: usize) -> Option<&Transaction> {
        self.txns.get(index)
    }

    /// Members in order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.txns.iter()
    }

    /// Members as a slice.
    pub fn as_slice(&self) -> &[Transaction] {
        &self.txns
    }

    /// Group id: hex SHA-256 over the concatenated member ids.
    pub fn id(&self) -> String {
        let mut preimage = Vec::with_capacity(self.txns.len() * 64);
        for txn in &self.txns {
            preimage.extend_from_slice(txn.id().as_bytes());
        }
        hex::encode(sha256(&preimage))
    }
}
