//! # Asset Parameters
//!
//! An issued asset is created once, with its whole supply credited to the
//! creator, and its parameters never change afterwards in this ledger.
//! Role addresses set to [`Address::ZERO`] mean "nobody holds that power".

use serde::{Deserialize, Serialize};

use crate::identity::{Address, AssetId};

/// Creation parameters for a fungible asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetParams {
    /// Total units ever in existence.
    pub total: u64,
    /// Display decimals. Purely cosmetic; the ledger works in base units.
    pub decimals: u8,
    /// Human-readable name.
    pub name: String,
    /// Ticker / unit name.
    pub unit_name: String,
    /// Optional metadata URL.
    pub url: Option<String>,
    /// May reconfigure the asset.
    pub manager: Address,
    /// Holds non-circulating supply by convention.
    pub reserve: Address,
    /// May freeze holdings.
    pub freeze: Address,
    /// May claw back holdings.
    pub clawback: Address,
}

impl AssetParams {
    /// `true` when no role address holds any power over the asset.
    pub fn is_non_custodial(&self) -> bool {
        self.manager.is_zero()
            && self.reserve.is_zero()
            && self.freeze.is_zero()
            && self.clawback.is_zero()
    }
}

/// A created asset as the ledger records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Assigned id.
    pub id: AssetId,
    /// Account that created the asset and received the full supply.
    pub creator: Address,
    /// Creation parameters.
    pub params: AssetParams,
}
