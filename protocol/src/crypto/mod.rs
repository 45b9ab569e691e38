//! # Hashing Primitives
//!
//! Thin wrappers over `sha2`. Addresses and group ids are the only things
//! the pool protocol hashes.

pub mod hash;

pub use hash::{sha256, sha512_256, sha512_256_multi};
