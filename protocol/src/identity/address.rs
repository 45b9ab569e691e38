//! # Addresses and Ledger Identifiers
//!
//! Every account on the ledger is a 32-byte [`Address`]. Three flavours
//! exist and all of them end up as the same type:
//!
//! ```text
//! sandbox account  : SHA-256("ally-sandbox:" || label)
//! application      : SHA-512/256("appID" || app_id as u64 BE)
//! multisig account : SHA-512/256("MultisigAddr" || version || threshold || member_0 || ...)
//! ```
//!
//! Application addresses have no key behind them; only the application's
//! own inner transactions can move funds out of them. Multisig addresses
//! are what a governing committee looks like from the pool's point of view.
//! Collecting the threshold of signatures happens off-ledger.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::COLLATERAL_ASSET_ID;
use crate::crypto::hash::{sha256, sha512_256_multi};

/// Domain prefix for application account derivation.
const APP_ID_PREFIX: &[u8] = b"appID";

/// Domain prefix for multisig account derivation.
const MULTISIG_PREFIX: &[u8] = b"MultisigAddr";

/// Domain prefix for labelled sandbox accounts.
const SANDBOX_PREFIX: &[u8] = b"ally-sandbox:";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while parsing or deriving addresses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The hex string could not be decoded.
    #[error("invalid address hex: {0}")]
    InvalidHex(String),

    /// The decoded bytes are not 32 long.
    #[error("invalid address length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    /// The multisig threshold is zero or larger than the member count.
    #[error("invalid multisig threshold {threshold} for {members} members")]
    InvalidThreshold {
        /// Requested threshold.
        threshold: u8,
        /// Number of members supplied.
        members: usize,
    },
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 32-byte ledger account address, rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 32]);

impl Address {
    /// The all-zero address. Used as "no authority" for asset roles.
    pub const ZERO: Address = Address([0u8; 32]);

    /// Wraps raw address bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns `true` for [`Address::ZERO`].
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Derives a deterministic sandbox address from a human label such as
    /// `"governor1"` or `"alice"`.
    pub fn from_label(label: &str) -> Self {
        let mut preimage = Vec::with_capacity(SANDBOX_PREFIX.len() + label.len());
        preimage.extend_from_slice(SANDBOX_PREFIX);
        preimage.extend_from_slice(label.as_bytes());
        Self(sha256(&preimage))
    }

    /// The account controlled by application `app_id`.
    pub fn for_application(app_id: AppId) -> Self {
        Self(sha512_256_multi(&[APP_ID_PREFIX, &app_id.0.to_be_bytes()]))
    }

    /// Derives the address of a `threshold`-of-`members.len()` multisig
    /// account. Member order matters.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::InvalidThreshold`] if `threshold` is zero or
    /// exceeds the number of members.
    pub fn multisig(version: u8, threshold: u8, members: &[Address]) -> Result<Self, AddressError> {
        if threshold == 0 || threshold as usize > members.len() {
            return Err(AddressError::InvalidThreshold {
                threshold,
                members: members.len(),
            });
        }

        let header = [version, threshold];
        let mut parts: Vec<&[u8]> = Vec::with_capacity(members.len() + 2);
        parts.push(MULTISIG_PREFIX);
        parts.push(&header);
        for member in members {
            parts.push(member.as_bytes());
        }
        Ok(Self(sha512_256_multi(&parts)))
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 64-character hex address.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let bytes = hex::decode(s).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// First 8 hex characters, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifier of a deployed application. `AppId(0)` in a call means
/// "create a new application".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AppId(pub u64);

impl AppId {
    /// The creation sentinel.
    pub const CREATE: AppId = AppId(0);

    /// Returns `true` for the creation sentinel.
    pub fn is_create(&self) -> bool {
        self.0 == 0
    }

    /// The account this application controls.
    pub fn address(&self) -> Address {
        Address::for_application(*self)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a fungible asset. [`AssetId::COLLATERAL`] is the base
/// asset every account holds natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u64);

impl AssetId {
    /// The base collateral asset.
    pub const COLLATERAL: AssetId = AssetId(COLLATERAL_ASSET_ID);

    /// Returns `true` for the base collateral asset.
    pub fn is_collateral(&self) -> bool {
        self.0 == COLLATERAL_ASSET_ID
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_addresses_are_deterministic() {
        assert_eq!(Address::from_label("alice"), Address::from_label("alice"));
        assert_ne!(Address::from_label("alice"), Address::from_label("bob"));
    }

    #[test]
    fn application_addresses_differ_per_app() {
        assert_ne!(AppId(1).address(), AppId(2).address());
        assert_eq!(AppId(7).address(), Address::for_application(AppId(7)));
    }

    #[test]
    fn hex_roundtrip() {
        let addr = Address::from_label("governor");
        let parsed: Address = addr.to_hex().parse().unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn hex_wrong_length_rejected() {
        assert_eq!(Address::from_hex("abcd"), Err(AddressError::InvalidLength(2)));
        assert!(matches!(
            Address::from_hex("zz"),
            Err(AddressError::InvalidHex(_))
        ));
    }

    #[test]
    fn multisig_depends_on_threshold_and_order() {
        let members = [
            Address::from_label("g1"),
            Address::from_label("g2"),
            Address::from_label("g3"),
        ];
        let two_of_three = Address::multisig(1, 2, &members).unwrap();
        let three_of_three = Address::multisig(1, 3, &members).unwrap();
        assert_ne!(two_of_three, three_of_three);

        let reordered = [members[1], members[0], members[2]];
        assert_ne!(two_of_three, Address::multisig(1, 2, &reordered).unwrap());
    }

    #[test]
    fn multisig_rejects_bad_threshold() {
        let members = [Address::from_label("g1")];
        assert!(Address::multisig(1, 0, &members).is_err());
        assert!(Address::multisig(1, 2, &members).is_err());
    }

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_label("x").is_zero());
    }

    #[test]
    fn address_serializes_as_hex_string() {
        let addr = Address::from_label("alice");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
    }

    #[test]
    fn collateral_asset_id() {
        assert!(AssetId::COLLATERAL.is_collateral());
        assert!(!AssetId(1_000).is_collateral());
        assert!(AppId::CREATE.is_create());
    }
}
