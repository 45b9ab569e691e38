//! # Hashing Utilities
//!
//! The two digests the pool protocol needs, and no more:
//!
//! - **SHA-512/256**: address derivation for applications and multisig
//!   accounts. The ledger we mirror derives both this way, so we do too.
//! - **SHA-256**: sandbox account labels and group ids.
//!
//! Both return fixed 32-byte arrays; nothing here allocates.

use sha2::{Digest, Sha256, Sha512_256};

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use ally_protocol::crypto::sha256;
///
/// let hash = sha256(b"ally pool");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the SHA-512/256 hash of the input data.
pub fn sha512_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash multiple byte slices with SHA-512/256 without concatenating them
/// first.
pub fn sha512_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
