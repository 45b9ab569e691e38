//! # Protocol Configuration & Constants
//!
//! Every magic number in the pool protocol lives here. If you're hardcoding
//! a constant somewhere else, move it here.
//!
//! Prices, seed reserve and supply caps are consensus-relevant: two nodes
//! replaying the same groups must agree on every unit, so none of these are
//! runtime-tunable.

// ---------------------------------------------------------------------------
// Fixed-point Pricing
// ---------------------------------------------------------------------------

/// Denominator of every scaled price. A price of `PRICE_SCALE` is parity:
/// one collateral unit buys one token unit.
pub const PRICE_SCALE: u64 = 1_000_000_000;

/// Mint and redeem price written at creation time (parity).
pub const DEFAULT_PRICE: u64 = PRICE_SCALE;

// ---------------------------------------------------------------------------
// Pool Reserves
// ---------------------------------------------------------------------------

/// Collateral the governor must send alongside the bootstrap call. Stays in
/// the pool account forever so it can always cover its own fees.
pub const SEED_AMOUNT: u64 = 1_000_000_000;

/// Mint payments must be strictly greater than this. Anything at or below
/// is dust and is rejected as a malformed group.
pub const MIN_MINT_PAYMENT: u64 = 1_000;

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Largest atomic group the ledger accepts.
pub const MAX_GROUP_SIZE: usize = 16;

/// Asset id reserved for the base collateral asset. Issued assets start
/// above it.
pub const COLLATERAL_ASSET_ID: u64 = 0;

/// First id handed out for issued assets.
pub const FIRST_ISSUED_ASSET_ID: u64 = 1_000;

/// First id handed out for applications. `0` means "create".
pub const FIRST_APP_ID: u64 = 1;

/// Maximum note length carried by a payment.
pub const MAX_NOTE_LENGTH: usize = 1_024;

// ---------------------------------------------------------------------------
// Wrapped Token Parameters
// ---------------------------------------------------------------------------

/// Total supply of the priced-pool token. Everything is minted to the pool
/// at bootstrap; circulation is whatever the pool no longer holds.
pub const PRICED_TOKEN_SUPPLY: u64 = u64::MAX;

/// Display name and unit of the priced-pool token.
pub const PRICED_TOKEN_NAME: &str = "wALGO";
pub const PRICED_TOKEN_UNIT: &str = "wALGO";
pub const PRICED_TOKEN_DECIMALS: u8 = 6;
pub const PRICED_TOKEN_URL: &str = "https://maxos.studio";

/// Total supply of the fixed-ratio pool token.
pub const FIXED_TOKEN_SUPPLY: u64 = 100_000_000_000_000_000;

/// Name prefix of the fixed-ratio token; the application id is appended.
pub const FIXED_TOKEN_NAME_PREFIX: &str = "GovernanceToken-";
pub const FIXED_TOKEN_UNIT: &str = "algo-gov";

// ---------------------------------------------------------------------------
// Operator Tooling
// ---------------------------------------------------------------------------

/// Largest price move, in per-mille, the operator CLI accepts without
/// `--force`. 25 = 2.5 %.
pub const MAX_PRICE_SHIFT_PER_MILLE: u64 = 25;

/// Returns `true` if moving a price from `current` to `proposed` stays
/// within [`MAX_PRICE_SHIFT_PER_MILLE`]. A zero current price only accepts
/// zero.
pub fn price_shift_within_limit(current: u64, proposed: u64) -> bool {
    let delta = current.abs_diff(proposed) as u128;
    delta * 1_000 <= current as u128 * MAX_PRICE_SHIFT_PER_MILLE as u128
}
