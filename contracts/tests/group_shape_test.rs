//! Integration tests for group well-formedness.
//!
//! Every malformed variant of a mint, redeem or bootstrap group must be
//! rejected as `MalformedGroup` and leave the runtime bit-for-bit as it
//! was, including the legs that would have succeeded on their own.

use ally_contracts::{PoolError, Runtime};
use ally_protocol::config::{MIN_MINT_PAYMENT, SEED_AMOUNT};
use ally_protocol::identity::{Address, AppId, AssetId};
use ally_protocol::ledger::{AssetParams, Ledger};
use ally_protocol::transaction::{Transaction, TransactionBuilder, TransactionGroup};

fn gov() -> Address {
    Address::from_label("governor")
}

fn alice() -> Address {
    Address::from_label("alice")
}

fn bob() -> Address {
    Address::from_label("bob")
}

/// A bootstrapped parity pool where alice already holds some tokens and
/// also holds an unrelated asset.
fn setup() -> (Runtime, AppId, AssetId, AssetId) {
    let mut ledger = Ledger::new();
    for who in [gov(), alice(), bob()] {
        ledger.fund(who, 10 * SEED_AMOUNT).unwrap();
    }
    let decoy = ledger
        .create_asset(
            alice(),
            AssetParams {
                total: 1_000_000_000,
                decimals: 0,
                name: "Decoy".into(),
                unit_name: "DCY".into(),
                url: None,
                manager: Address::ZERO,
                reserve: Address::ZERO,
                freeze: Address::ZERO,
                clawback: Address::ZERO,
            },
        )
        .unwrap();

    let mut rt = Runtime::new(ledger);
    let app = rt
        .submit_txn(TransactionBuilder::app_call(gov(), AppId::CREATE).build())
        .unwrap()
        .created_app
        .unwrap();
    let token = rt
        .submit(&group(vec![
            TransactionBuilder::payment(gov(), app.address(), SEED_AMOUNT).build(),
            call(gov(), app, "bootstrap", None),
        ]))
        .unwrap()
        .created_assets()[0];
    rt.submit(&group(vec![
        call(alice(), app, "mint", Some(token)),
        TransactionBuilder::payment(alice(), app.address(), 5_000_000).build(),
    ]))
    .unwrap();
    (rt, app, token, decoy)
}

fn call(sender: Address, app: AppId, selector: &str, asset: Option<AssetId>) -> Transaction {
    let mut builder = TransactionBuilder::app_call(sender, app).selector(selector);
    if let Some(asset) = asset {
        builder = builder.foreign_asset(asset);
    }
    builder.build()
}

fn group(txns: Vec<Transaction>) -> TransactionGroup {
    TransactionGroup::new(txns).unwrap()
}

fn assert_malformed(rt: &mut Runtime, g: TransactionGroup) {
    let before = rt.clone();
    let err = rt.submit(&g).unwrap_err();
    assert!(
        matches!(err.pool_error(), Some(PoolError::MalformedGroup { .. })),
        "expected MalformedGroup, got {err}"
    );
    assert_eq!(*rt, before);
}

// ---------------------------------------------------------------------------
// Mint
// ---------------------------------------------------------------------------

#[test]
fn mint_with_reversed_legs() {
    let (mut rt, app, token, _) = setup();
    assert_malformed(
        &mut rt,
        group(vec![
            TransactionBuilder::payment(alice(), app.address(), 10_000).build(),
            call(alice(), app, "mint", Some(token)),
        ]),
    );
}

#[test]
fn mint_with_mismatched_senders() {
    let (mut rt, app, token, _) = setup();
    assert_malformed(
        &mut rt,
        group(vec![
            call(alice(), app, "mint", Some(token)),
            TransactionBuilder::payment(bob(), app.address(), 10_000).build(),
        ]),
    );
}

#[test]
fn mint_referencing_wrong_or_no_asset() {
    let (mut rt, app, _, decoy) = setup();
    for asset in [Some(decoy), None] {
        assert_malformed(
            &mut rt,
            group(vec![
                call(alice(), app, "mint", asset),
                TransactionBuilder::payment(alice(), app.address(), 10_000).build(),
            ]),
        );
    }
}

#[test]
fn mint_paying_someone_else() {
    let (mut rt, app, token, _) = setup();
    assert_malformed(
        &mut rt,
        group(vec![
            call(alice(), app, "mint", Some(token)),
            TransactionBuilder::payment(alice(), bob(), 10_000).build(),
        ]),
    );
}

#[test]
fn mint_at_dust_threshold() {
    let (mut rt, app, token, _) = setup();
    assert_malformed(
        &mut rt,
        group(vec![
            call(alice(), app, "mint", Some(token)),
            TransactionBuilder::payment(alice(), app.address(), MIN_MINT_PAYMENT).build(),
        ]),
    );
    rt.submit(&group(vec![
        call(alice(), app, "mint", Some(token)),
        TransactionBuilder::payment(alice(), app.address(), MIN_MINT_PAYMENT + 1).build(),
    ]))
    .unwrap();
}

#[test]
fn mint_with_extra_member() {
    let (mut rt, app, token, _) = setup();
    assert_malformed(
        &mut rt,
        group(vec![
            call(alice(), app, "mint", Some(token)),
            TransactionBuilder::payment(alice(), app.address(), 10_000).build(),
            TransactionBuilder::payment(alice(), app.address(), 10_000).build(),
        ]),
    );
}

#[test]
fn lone_mint_call() {
    let (mut rt, app, token, _) = setup();
    assert_malformed(&mut rt, group(vec![call(alice(), app, "mint", Some(token))]));
}

// ---------------------------------------------------------------------------
// Redeem
// ---------------------------------------------------------------------------

#[test]
fn redeem_returning_the_wrong_asset() {
    let (mut rt, app, token, decoy) = setup();
    assert_malformed(
        &mut rt,
        group(vec![
            call(alice(), app, "redeem", Some(token)),
            TransactionBuilder::asset_transfer(alice(), decoy, app.address(), 1_000).build(),
        ]),
    );
}

#[test]
fn redeem_with_payment_leg() {
    let (mut rt, app, token, _) = setup();
    assert_malformed(
        &mut rt,
        group(vec![
            call(alice(), app, "redeem", Some(token)),
            TransactionBuilder::payment(alice(), app.address(), 1_000).build(),
        ]),
    );
}

#[test]
fn redeem_with_reversed_legs() {
    let (mut rt, app, token, _) = setup();
    assert_malformed(
        &mut rt,
        group(vec![
            TransactionBuilder::asset_transfer(alice(), token, app.address(), 1_000).build(),
            call(alice(), app, "redeem", Some(token)),
        ]),
    );
}

#[test]
fn redeem_tokens_sent_elsewhere() {
    let (mut rt, app, token, _) = setup();
    assert_malformed(
        &mut rt,
        group(vec![
            call(alice(), app, "redeem", Some(token)),
            TransactionBuilder::asset_transfer(alice(), token, bob(), 1_000).build(),
        ]),
    );
}

// ---------------------------------------------------------------------------
// Bootstrap and admin
// ---------------------------------------------------------------------------

#[test]
fn bootstrap_shape_checked_after_authorization() {
    let mut ledger = Ledger::new();
    ledger.fund(gov(), 10 * SEED_AMOUNT).unwrap();
    let mut rt = Runtime::new(ledger);
    let app = rt
        .submit_txn(TransactionBuilder::app_call(gov(), AppId::CREATE).build())
        .unwrap()
        .created_app
        .unwrap();

    // Wrong seed amount.
    assert_malformed(
        &mut rt,
        group(vec![
            TransactionBuilder::payment(gov(), app.address(), SEED_AMOUNT / 2).build(),
            call(gov(), app, "bootstrap", None),
        ]),
    );
    // No seed leg at all.
    assert_malformed(&mut rt, group(vec![call(gov(), app, "bootstrap", None)]));
    // Call first.
    assert_malformed(
        &mut rt,
        group(vec![
            call(gov(), app, "bootstrap", None),
            TransactionBuilder::payment(gov(), app.address(), SEED_AMOUNT).build(),
        ]),
    );
    assert_eq!(rt.pool_state(app).unwrap().pool_token, None);
}

#[test]
fn admin_action_in_a_pair_is_malformed() {
    let (mut rt, app, _, _) = setup();
    assert_malformed(
        &mut rt,
        group(vec![
            call(gov(), app, "toggle_redeem", None),
            TransactionBuilder::payment(gov(), app.address(), 1).build(),
        ]),
    );
}
