//! # Pricing Engine
//!
//! Converts collateral into tokens on mint and tokens into collateral on
//! redeem. Two policies share one interface:
//!
//! - [`PricedPolicy`]: governor-set scaled prices, independent for each
//!   direction so the pool can run a spread.
//! - [`FixedRatioPolicy`]: one token per collateral unit on the way in,
//!   a pro-rata share of the redeemable collateral on the way out.
//!
//! ## Fixed-point Arithmetic
//!
//! Prices are integers over [`PRICE_SCALE`]. Every conversion multiplies
//! in `u128` and divides once, truncating toward zero:
//!
//! ```text
//! mint_amount(c)   = floor(mint_price   * c / SCALE)
//! redeem_amount(t) = floor(redeem_price * t / SCALE)
//! ```
//!
//! A `u64 * u64` product always fits in `u128`; the only possible overflow
//! is a quotient above `u64::MAX`, which is rejected as
//! [`PoolError::PriceOverflow`] rather than wrapped.

use ally_protocol::config::{
    FIXED_TOKEN_NAME_PREFIX, FIXED_TOKEN_SUPPLY, FIXED_TOKEN_UNIT, PRICED_TOKEN_DECIMALS,
    PRICED_TOKEN_NAME, PRICED_TOKEN_SUPPLY, PRICED_TOKEN_UNIT, PRICED_TOKEN_URL, PRICE_SCALE,
};
use ally_protocol::identity::{Address, AppId, AssetId};
use ally_protocol::ledger::AssetParams;
use serde::{Deserialize, Serialize};

use crate::dispatch::Selector;
use crate::error::PoolError;
use crate::state::PoolState;

// ---------------------------------------------------------------------------
// Scaled arithmetic
// ---------------------------------------------------------------------------

/// `floor(a * b / denom)` with a double-width intermediate. `None` if
/// `denom` is zero or the quotient does not fit in a `u64`.
pub fn mul_div(a: u64, b: u64, denom: u64) -> Option<u64> {
    if denom == 0 {
        return None;
    }
    let wide = (a as u128) * (b as u128) / (denom as u128);
    u64::try_from(wide).ok()
}

/// Tokens issued for `collateral_in` at `mint_price`.
pub fn mint_amount(mint_price: u64, collateral_in: u64) -> Result<u64, PoolError> {
    mul_div(mint_price, collateral_in, PRICE_SCALE).ok_or(PoolError::PriceOverflow {
        price: mint_price,
        amount: collateral_in,
    })
}

/// Collateral paid out for `tokens_in` at `redeem_price`.
pub fn redeem_amount(redeem_price: u64, tokens_in: u64) -> Result<u64, PoolError> {
    mul_div(redeem_price, tokens_in, PRICE_SCALE).ok_or(PoolError::PriceOverflow {
        price: redeem_price,
        amount: tokens_in,
    })
}

// ---------------------------------------------------------------------------
// Policy interface
// ---------------------------------------------------------------------------

/// Ledger figures a policy may price against, read from the authoritative
/// balance view at the start of the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reserves {
    /// Pool collateral above the seed reserve.
    pub redeemable_collateral: u64,
    /// Pool tokens held outside the pool account.
    pub outstanding_tokens: u64,
}

/// What distinguishes one kind of pool from another.
pub trait PricingPolicy {
    /// Tokens to send the caller for `collateral_in`.
    fn tokens_for_collateral(
        &self,
        state: &PoolState,
        reserves: &Reserves,
        collateral_in: u64,
    ) -> Result<u64, PoolError>;

    /// Collateral to send the caller for `tokens_in`.
    fn collateral_for_tokens(
        &self,
        state: &PoolState,
        reserves: &Reserves,
        tokens_in: u64,
    ) -> Result<u64, PoolError>;

    /// Parameters of the token created at bootstrap.
    fn token_params(&self, app_id: AppId) -> AssetParams;

    /// Whether `selector` is an action this policy exposes.
    fn supports(&self, selector: Selector) -> bool;

    /// Rejects mints outside the policy's allowed period.
    fn check_mint_time(&self, _now: u64) -> Result<(), PoolError> {
        Ok(())
    }

    /// Rejects redemptions outside the policy's allowed period.
    fn check_redeem_time(&self, _now: u64) -> Result<(), PoolError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PricedPolicy
// ---------------------------------------------------------------------------

/// Governor-priced pool issuing a non-custodial token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedPolicy;

impl PricingPolicy for PricedPolicy {
    fn tokens_for_collateral(
        &self,
        state: &PoolState,
        _reserves: &Reserves,
        collateral_in: u64,
    ) -> Result<u64, PoolError> {
        mint_amount(state.mint_price, collateral_in)
    }

    fn collateral_for_tokens(
        &self,
        state: &PoolState,
        _reserves: &Reserves,
        tokens_in: u64,
    ) -> Result<u64, PoolError> {
        redeem_amount(state.redeem_price, tokens_in)
    }

    fn token_params(&self, _app_id: AppId) -> AssetParams {
        AssetParams {
            total: PRICED_TOKEN_SUPPLY,
            decimals: PRICED_TOKEN_DECIMALS,
            name: PRICED_TOKEN_NAME.to_string(),
            unit_name: PRICED_TOKEN_UNIT.to_string(),
            url: Some(PRICED_TOKEN_URL.to_string()),
            manager: Address::ZERO,
            reserve: Address::ZERO,
            freeze: Address::ZERO,
            clawback: Address::ZERO,
        }
    }

    fn supports(&self, _selector: Selector) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// FixedRatioPolicy
// ---------------------------------------------------------------------------

/// Unix-second bounds for a fixed-ratio pool: deposits close at `start`,
/// withdrawals open at `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockWindow {
    pub start: u64,
    pub stop: u64,
}

/// 1:1 mint, pro-rata redeem, custodial token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedRatioPolicy {
    /// Optional lock window. `None` leaves both directions always open.
    pub lock: Option<LockWindow>,
}

impl FixedRatioPolicy {
    pub fn with_lock(start: u64, stop: u64) -> Self {
        Self {
            lock: Some(LockWindow { start, stop }),
        }
    }
}

impl PricingPolicy for FixedRatioPolicy {
    fn tokens_for_collateral(
        &self,
        _state: &PoolState,
        _reserves: &Reserves,
        collateral_in: u64,
    ) -> Result<u64, PoolError> {
        Ok(collateral_in)
    }

    fn collateral_for_tokens(
        &self,
        _state: &PoolState,
        reserves: &Reserves,
        tokens_in: u64,
    ) -> Result<u64, PoolError> {
        if reserves.outstanding_tokens == 0 {
            return Err(PoolError::InsufficientPoolBalance {
                asset: AssetId::COLLATERAL,
                requested: tokens_in,
                available: reserves.redeemable_collateral,
            });
        }
        mul_div(
            tokens_in,
            reserves.redeemable_collateral,
            reserves.outstanding_tokens,
        )
        .ok_or(PoolError::PriceOverflow {
            price: reserves.redeemable_collateral,
            amount: tokens_in,
        })
    }

    fn token_params(&self, app_id: AppId) -> AssetParams {
        let pool = app_id.address();
        AssetParams {
            total: FIXED_TOKEN_SUPPLY,
            decimals: 0,
            name: format!("{FIXED_TOKEN_NAME_PREFIX}{app_id}"),
            unit_name: FIXED_TOKEN_UNIT.to_string(),
            url: None,
            manager: pool,
            reserve: pool,
            freeze: Address::ZERO,
            clawback: Address::ZERO,
        }
    }

    fn supports(&self, selector: Selector) -> bool {
        !matches!(
            selector,
            Selector::SetMintPrice | Selector::SetRedeemPrice | Selector::ToggleRedeem
        )
    }

    fn check_mint_time(&self, now: u64) -> Result<(), PoolError> {
        match self.lock {
            Some(w) if now >= w.start => Err(PoolError::OutsideLockWindow {
                action: "mint",
                now,
                start: w.start,
                stop: w.stop,
            }),
            _ => Ok(()),
        }
    }

    fn check_redeem_time(&self, now: u64) -> Result<(), PoolError> {
        match self.lock {
            Some(w) if now <= w.stop => Err(PoolError::OutsideLockWindow {
                action: "redeem",
                now,
                start: w.start,
                stop: w.stop,
            }),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// PoolPolicy
// ---------------------------------------------------------------------------

/// The policy a pool is deployed with. Serialized as JSON into the
/// `program` field of create and update calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolPolicy {
    Priced(PricedPolicy),
    FixedRatio(FixedRatioPolicy),
}

impl Default for PoolPolicy {
    fn default() -> Self {
        PoolPolicy::Priced(PricedPolicy)
    }
}

impl PoolPolicy {
    /// Program bytes for a create or update call.
    pub fn to_program(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decodes a program descriptor.
    pub fn from_program(bytes: &[u8]) -> Result<Self, PoolError> {
        serde_json::from_slice(bytes)
            .map_err(|e| PoolError::invalid_argument(format!("bad program descriptor: {e}")))
    }

    fn inner(&self) -> &dyn PricingPolicy {
        match self {
            PoolPolicy::Priced(p) => p,
            PoolPolicy::FixedRatio(p) => p,
        }
    }
}

impl PricingPolicy for PoolPolicy {
    fn tokens_for_collateral(
        &self,
        state: &PoolState,
        reserves: &Reserves,
        collateral_in: u64,
    ) -> Result<u64, PoolError> {
        self.inner()
            .tokens_for_collateral(state, reserves, collateral_in)
    }

    fn collateral_for_tokens(
        &self,
        state: &PoolState,
        reserves: &Reserves,
        tokens_in: u64,
    ) -> Result<u64, PoolError> {
        self.inner().collateral_for_tokens(state, reserves, tokens_in)
    }

    fn token_params(&self, app_id: AppId) -> AssetParams {
        self.inner().token_params(app_id)
    }

    fn supports(&self, selector: Selector) -> bool {
        self.inner().supports(selector)
    }

    fn check_mint_time(&self, now: u64) -> Result<(), PoolError> {
        self.inner().check_mint_time(now)
    }

    fn check_redeem_time(&self, now: u64) -> Result<(), PoolError> {
        self.inner().check_redeem_time(now)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at(mint_price: u64, redeem_price: u64) -> PoolState {
        let mut state = PoolState::genesis(Address::from_label("gov"));
        state.mint_price = mint_price;
        state.redeem_price = redeem_price;
        state
    }

    const NO_RESERVES: Reserves = Reserves {
        redeemable_collateral: 0,
        outstanding_tokens: 0,
    };

    #[test]
    fn parity_is_identity() {
        assert_eq!(mint_amount(PRICE_SCALE, 1_000_000).unwrap(), 1_000_000);
        assert_eq!(redeem_amount(PRICE_SCALE, 1_000_000).unwrap(), 1_000_000);
    }

    #[test]
    fn truncates_toward_zero() {
        // 0.999999999 * 10 = 9.99999999
        assert_eq!(mint_amount(PRICE_SCALE - 1, 10).unwrap(), 9);
        assert_eq!(redeem_amount(1, PRICE_SCALE - 1).unwrap(), 0);
    }

    #[test]
    fn wide_product_does_not_wrap() {
        // price * amount far exceeds u64 but the quotient fits.
        assert_eq!(mint_amount(PRICE_SCALE, u64::MAX).unwrap(), u64::MAX);
        assert_eq!(
            mint_amount(2 * PRICE_SCALE, u64::MAX),
            Err(PoolError::PriceOverflow {
                price: 2 * PRICE_SCALE,
                amount: u64::MAX,
            })
        );
    }

    #[test]
    fn mul_div_rejects_zero_denominator() {
        assert_eq!(mul_div(1, 1, 0), None);
    }

    #[test]
    fn mint_is_monotonic() {
        let price = 1_234_567_891;
        let mut last = 0;
        for c in (0..50_000u64).step_by(997) {
            let m = mint_amount(price, c).unwrap();
            assert!(m >= last);
            last = m;
        }
    }

    #[test]
    fn round_trip_never_returns_more_at_or_below_parity() {
        for price in [1, 7, 999_999_999, PRICE_SCALE] {
            for c in [1u64, 7, 1_001, 1_000_000, 123_456_789_012] {
                let m = mint_amount(price, c).unwrap();
                let back = redeem_amount(price, m).unwrap();
                assert!(back <= c, "price {price} collateral {c} came back as {back}");
            }
        }
    }

    #[test]
    fn shared_price_above_parity_pays_out_more_than_deposited() {
        let price = 3 * PRICE_SCALE;
        let m = mint_amount(price, 1_000_000).unwrap();
        assert_eq!(m, 3_000_000);
        assert_eq!(redeem_amount(price, m).unwrap(), 9_000_000);

        // A one-unit premium already leaks on large deposits.
        let c = 123_456_789_012;
        let back = redeem_amount(1_000_000_007, mint_amount(1_000_000_007, c).unwrap()).unwrap();
        assert!(back > c);
    }

    #[test]
    fn priced_policy_uses_state_prices() {
        let policy = PricedPolicy;
        let state = state_at(2 * PRICE_SCALE, PRICE_SCALE / 2);
        assert_eq!(
            policy.tokens_for_collateral(&state, &NO_RESERVES, 100).unwrap(),
            200
        );
        assert_eq!(
            policy.collateral_for_tokens(&state, &NO_RESERVES, 100).unwrap(),
            50
        );
    }

    #[test]
    fn priced_token_is_non_custodial() {
        let params = PricedPolicy.token_params(AppId(4));
        assert!(params.is_non_custodial());
        assert_eq!(params.total, u64::MAX);
        assert_eq!(params.decimals, 6);
        assert_eq!(params.unit_name, "wALGO");
    }

    #[test]
    fn fixed_ratio_mints_one_to_one_and_redeems_pro_rata() {
        let policy = FixedRatioPolicy::default();
        let state = state_at(PRICE_SCALE, PRICE_SCALE);
        assert_eq!(
            policy.tokens_for_collateral(&state, &NO_RESERVES, 777).unwrap(),
            777
        );

        // Pool gained 50% on its collateral.
        let reserves = Reserves {
            redeemable_collateral: 1_500,
            outstanding_tokens: 1_000,
        };
        assert_eq!(
            policy.collateral_for_tokens(&state, &reserves, 100).unwrap(),
            150
        );
        assert_eq!(
            policy.collateral_for_tokens(&state, &reserves, 1_000).unwrap(),
            1_500
        );
    }

    #[test]
    fn fixed_ratio_redeem_with_nothing_outstanding_fails() {
        let policy = FixedRatioPolicy::default();
        let state = state_at(PRICE_SCALE, PRICE_SCALE);
        assert!(matches!(
            policy.collateral_for_tokens(&state, &NO_RESERVES, 1),
            Err(PoolError::InsufficientPoolBalance { .. })
        ));
    }

    #[test]
    fn fixed_ratio_token_is_custodial_and_named_after_app() {
        let params = FixedRatioPolicy::default().token_params(AppId(42));
        assert_eq!(params.name, "GovernanceToken-42");
        assert_eq!(params.unit_name, "algo-gov");
        assert_eq!(params.manager, AppId(42).address());
        assert_eq!(params.reserve, AppId(42).address());
        assert!(!params.is_non_custodial());
    }

    #[test]
    fn lock_window_splits_mint_and_redeem() {
        let policy = FixedRatioPolicy::with_lock(100, 200);
        assert!(policy.check_mint_time(99).is_ok());
        assert!(policy.check_mint_time(100).is_err());
        assert!(policy.check_redeem_time(200).is_err());
        assert!(policy.check_redeem_time(201).is_ok());

        let open = FixedRatioPolicy::default();
        assert!(open.check_mint_time(u64::MAX).is_ok());
        assert!(open.check_redeem_time(0).is_ok());
    }

    #[test]
    fn fixed_ratio_hides_price_knobs() {
        let policy = PoolPolicy::FixedRatio(FixedRatioPolicy::default());
        assert!(policy.supports(Selector::Mint));
        assert!(policy.supports(Selector::Vote));
        assert!(!policy.supports(Selector::SetMintPrice));
        assert!(!policy.supports(Selector::ToggleRedeem));
        assert!(PoolPolicy::default().supports(Selector::ToggleRedeem));
    }

    #[test]
    fn program_descriptor_round_trips() {
        let policy = PoolPolicy::FixedRatio(FixedRatioPolicy::with_lock(5, 6));
        assert_eq!(PoolPolicy::from_program(&policy.to_program()).unwrap(), policy);
        assert!(matches!(
            PoolPolicy::from_program(b"not json"),
            Err(PoolError::InvalidArgument { .. })
        ));
    }
}
