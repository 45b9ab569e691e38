//! Core type definitions for ledger transactions.
//!
//! These types form the vocabulary of every transaction the ledger
//! accepts. They are intentionally small and `Copy` where possible.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TxnType
// ---------------------------------------------------------------------------

/// Discriminant for the operation a transaction represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnType {
    /// Transfer of the base collateral asset.
    Payment,
    /// Transfer of an issued asset.
    AssetTransfer,
    /// Invocation of an application.
    ApplicationCall,
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payment => write!(f, "pay"),
            Self::AssetTransfer => write!(f, "axfer"),
            Self::ApplicationCall => write!(f, "appl"),
        }
    }
}

// ---------------------------------------------------------------------------
// OnCompletion
// ---------------------------------------------------------------------------

/// What an application call asks the ledger to do with the application
/// once the call's logic approves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OnCompletion {
    /// Plain call; the selector in the arguments decides what happens.
    #[default]
    NoOp,
    /// Allocate per-account local state.
    OptIn,
    /// Release per-account local state.
    CloseOut,
    /// Release local state unconditionally.
    ClearState,
    /// Replace the application's program.
    UpdateApplication,
    /// Remove the application.
    DeleteApplication,
}

impl fmt::Display for OnCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => write!(f, "NoOp"),
            Self::OptIn => write!(f, "OptIn"),
            Self::CloseOut => write!(f, "CloseOut"),
            Self::ClearState => write!(f, "ClearState"),
            Self::UpdateApplication => write!(f, "UpdateApplication"),
            Self::DeleteApplication => write!(f, "DeleteApplication"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
