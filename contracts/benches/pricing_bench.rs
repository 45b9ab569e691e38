// Pricing and group-execution benchmarks for the Ally pool.
//
// Covers the scaled conversions on their own and a full mint/redeem cycle
// through the runtime, including the ledger clone that staging costs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ally_contracts::pricing::{mint_amount, mul_div, redeem_amount};
use ally_contracts::{PoolPolicy, Runtime};
use ally_protocol::config::{PRICE_SCALE, SEED_AMOUNT};
use ally_protocol::identity::{Address, AppId, AssetId};
use ally_protocol::ledger::Ledger;
use ally_protocol::transaction::{TransactionBuilder, TransactionGroup};

fn bench_scaled_conversions(c: &mut Criterion) {
    c.bench_function("pricing/mul_div", |b| {
        b.iter(|| mul_div(black_box(1_010_000_000), black_box(u64::MAX / 3), PRICE_SCALE));
    });
    c.bench_function("pricing/mint_amount", |b| {
        b.iter(|| mint_amount(black_box(PRICE_SCALE), black_box(1_000_000)));
    });
    c.bench_function("pricing/redeem_amount", |b| {
        b.iter(|| redeem_amount(black_box(990_000_000), black_box(1_000_000)));
    });
}

fn deployed(accounts: usize) -> (Runtime, AppId, AssetId, Address) {
    let gov = Address::from_label("governor");
    let user = Address::from_label("user");
    let mut ledger = Ledger::new();
    ledger.fund(gov, 10 * SEED_AMOUNT).unwrap();
    ledger.fund(user, 10 * SEED_AMOUNT).unwrap();
    for i in 0..accounts {
        ledger
            .fund(Address::from_label(&format!("holder-{i}")), 1_000)
            .unwrap();
    }

    let mut rt = Runtime::new(ledger);
    let app = rt
        .submit_txn(
            TransactionBuilder::app_call(gov, AppId::CREATE)
                .program(PoolPolicy::default().to_program())
                .build(),
        )
        .unwrap()
        .created_app
        .unwrap();
    let bootstrap = TransactionGroup::new(vec![
        TransactionBuilder::payment(gov, app.address(), SEED_AMOUNT).build(),
        TransactionBuilder::app_call(gov, app).selector("bootstrap").build(),
    ])
    .unwrap();
    let token = rt.submit(&bootstrap).unwrap().created_assets()[0];
    (rt, app, token, user)
}

fn bench_mint_redeem_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("runtime/mint_redeem_cycle");
    for accounts in [10usize, 1_000] {
        let (rt, app, token, user) = deployed(accounts);
        let mint = TransactionGroup::new(vec![
            TransactionBuilder::app_call(user, app)
                .selector("mint")
                .foreign_asset(token)
                .build(),
            TransactionBuilder::payment(user, app.address(), 1_000_000).build(),
        ])
        .unwrap();
        let redeem = TransactionGroup::new(vec![
            TransactionBuilder::app_call(user, app)
                .selector("redeem")
                .foreign_asset(token)
                .build(),
            TransactionBuilder::asset_transfer(user, token, app.address(), 1_000_000).build(),
        ])
        .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(accounts), &accounts, |b, _| {
            let mut rt = rt.clone();
            b.iter(|| {
                rt.submit(&mint).unwrap();
                rt.submit(&redeem).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scaled_conversions, bench_mint_redeem_cycle);
criterion_main!(benches);
