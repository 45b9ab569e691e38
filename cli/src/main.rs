// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ally Operator
//!
//! Entry point for the `ally` binary. Each invocation loads the sandbox
//! runtime from the data directory, stamps the ledger with the wall clock,
//! runs one command and saves the result.
//!
//! - `init`, `deploy`, `delete` manage accounts and pools
//! - `mint`, `redeem` move value in and out of a pool
//! - `set-governor`, `mint-price`, `redeem-price`, `toggle-redeem`, `notify`
//!   drive governance
//! - `status`, `balances` print state without writing

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::Path;

use ally_contracts::{FixedRatioPolicy, PoolPolicy, PricedPolicy, Runtime};
use ally_protocol::config::{price_shift_within_limit, SEED_AMOUNT};
use ally_protocol::identity::{Address, AppId, AssetId};
use ally_protocol::ledger::BalanceView;
use ally_protocol::storage::AllyDb;
use ally_protocol::transaction::{OnCompletion, Transaction, TransactionBuilder, TransactionGroup};

use cli::{AllyCli, Commands};

/// Multisig encoding version used for governing councils.
const MULTISIG_VERSION: u8 = 1;

fn main() -> Result<()> {
    let cli = AllyCli::parse();
    logging::init_logging("ally=info,ally_contracts=info,ally_protocol=warn", cli.log_format.into());

    let db = open_db(&cli.data_dir)?;
    let mut rt = Runtime::load(&db).context("failed to load sandbox state")?;
    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
    rt.ledger_mut().set_timestamp(now);

    let dirty = match cli.command {
        Commands::Init(args) => init(&mut rt, args)?,
        Commands::Deploy(args) => deploy(&mut rt, args)?,
        Commands::Mint(args) => mint(&mut rt, args)?,
        Commands::Redeem(args) => redeem(&mut rt, args)?,
        Commands::SetGovernor(args) => {
            let to = resolve_account(&args.to);
            let txn = call(&args.pool).selector("set_governor").account(to).build();
            submit_txn(&mut rt, txn)?;
            println!("governor of pool {} is now {}", args.pool.app, to);
            true
        }
        Commands::MintPrice(args) => price(&mut rt, args, PriceKind::Mint)?,
        Commands::RedeemPrice(args) => price(&mut rt, args, PriceKind::Redeem)?,
        Commands::ToggleRedeem(args) => {
            submit_txn(&mut rt, call(&args).selector("toggle_redeem").build())?;
            let enabled = rt.pool_state(AppId(args.app))?.redeem_enabled;
            println!("redeem enabled: {enabled}");
            true
        }
        Commands::Notify(args) => notify(&mut rt, args)?,
        Commands::Delete(args) => {
            let txn = call(&args)
                .on_completion(OnCompletion::DeleteApplication)
                .build();
            submit_txn(&mut rt, txn)?;
            println!("pool {} deleted", args.app);
            true
        }
        Commands::Status(args) => {
            status(&rt, args.app.map(AppId))?;
            false
        }
        Commands::Balances => {
            balances(&rt);
            false
        }
    };

    if dirty {
        rt.save(&db).context("failed to save sandbox state")?;
    }
    Ok(())
}

fn open_db(data_dir: &Path) -> Result<AllyDb> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    AllyDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))
}

/// A 64-character hex string is taken as a raw address; anything else is a
/// sandbox label.
fn resolve_account(account: &str) -> Address {
    if account.len() == 64 {
        if let Ok(address) = Address::from_hex(account) {
            return address;
        }
    }
    Address::from_label(account)
}

fn call(pool: &cli::PoolArgs) -> ally_protocol::transaction::AppCallBuilder {
    TransactionBuilder::app_call(resolve_account(&pool.from), AppId(pool.app))
}

fn submit_txn(rt: &mut Runtime, txn: Transaction) -> Result<()> {
    rt.submit_txn(txn).context("call rejected")?;
    Ok(())
}

fn pool_token(rt: &Runtime, app: AppId) -> Result<AssetId> {
    rt.pool_state(app)
        .with_context(|| format!("cannot read pool {app}"))?
        .pool_token
        .with_context(|| format!("pool {app} is not bootstrapped"))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn init(rt: &mut Runtime, args: cli::InitArgs) -> Result<bool> {
    for label in &args.accounts {
        let address = resolve_account(label);
        rt.ledger_mut()
            .fund(address, args.amount)
            .with_context(|| format!("failed to fund {label}"))?;
        println!("{label:<12} {address}");
    }
    tracing::info!(accounts = args.accounts.len(), amount = args.amount, "sandbox funded");
    Ok(true)
}

fn deploy(rt: &mut Runtime, args: cli::DeployArgs) -> Result<bool> {
    let creator = resolve_account(&args.from);
    let policy = if args.fixed {
        let fixed = match (args.lock_start, args.lock_stop) {
            (Some(start), Some(stop)) => FixedRatioPolicy::with_lock(start, stop),
            _ => FixedRatioPolicy::default(),
        };
        PoolPolicy::FixedRatio(fixed)
    } else {
        PoolPolicy::Priced(PricedPolicy)
    };

    let council = if args.governors.is_empty() {
        None
    } else {
        let members: Vec<Address> = args.governors.iter().map(|g| resolve_account(g)).collect();
        Some(
            Address::multisig(MULTISIG_VERSION, args.threshold, &members)
                .context("invalid governor council")?,
        )
    };

    let app = rt
        .submit_txn(
            TransactionBuilder::app_call(creator, AppId::CREATE)
                .program(policy.to_program())
                .build(),
        )
        .context("pool creation rejected")?
        .created_app
        .context("pool creation produced no application")?;

    let bootstrap = TransactionGroup::new(vec![
        TransactionBuilder::payment(creator, app.address(), SEED_AMOUNT).build(),
        TransactionBuilder::app_call(creator, app)
            .selector("bootstrap")
            .build(),
    ])?;
    let token = rt
        .submit(&bootstrap)
        .context("bootstrap rejected")?
        .created_assets()
        .first()
        .copied()
        .context("bootstrap created no token")?;

    if let Some(council) = council {
        rt.submit_txn(
            TransactionBuilder::app_call(creator, app)
                .selector("set_governor")
                .account(council)
                .build(),
        )
        .context("governor hand-over rejected")?;
        println!("governor    {council}");
    }

    println!("app         {app}");
    println!("address     {}", app.address());
    println!("pool token  {token}");
    Ok(true)
}

fn mint(rt: &mut Runtime, args: cli::AmountArgs) -> Result<bool> {
    let app = AppId(args.pool.app);
    let sender = resolve_account(&args.pool.from);
    let token = pool_token(rt, app)?;
    let group = TransactionGroup::new(vec![
        call(&args.pool).selector("mint").foreign_asset(token).build(),
        TransactionBuilder::payment(sender, app.address(), args.amount).build(),
    ])?;

    let before = rt.ledger().balance_of(&sender, token);
    rt.submit(&group).context("mint rejected")?;
    let minted = rt.ledger().balance_of(&sender, token).saturating_sub(before);
    println!("minted {minted} of asset {token} for {} collateral", args.amount);
    Ok(true)
}

fn redeem(rt: &mut Runtime, args: cli::AmountArgs) -> Result<bool> {
    let app = AppId(args.pool.app);
    let sender = resolve_account(&args.pool.from);
    let token = pool_token(rt, app)?;
    let group = TransactionGroup::new(vec![
        call(&args.pool).selector("redeem").foreign_asset(token).build(),
        TransactionBuilder::asset_transfer(sender, token, app.address(), args.amount).build(),
    ])?;

    let before = rt.ledger().balance_of(&sender, AssetId::COLLATERAL);
    rt.submit(&group).context("redeem rejected")?;
    let paid = rt
        .ledger()
        .balance_of(&sender, AssetId::COLLATERAL)
        .saturating_sub(before);
    println!("redeemed {} of asset {token} for {paid} collateral", args.amount);
    Ok(true)
}

#[derive(Debug, Clone, Copy)]
enum PriceKind {
    Mint,
    Redeem,
}

fn price(rt: &mut Runtime, args: cli::PriceArgs, kind: PriceKind) -> Result<bool> {
    let app = AppId(args.pool.app);
    let state = rt.pool_state(app).with_context(|| format!("cannot read pool {app}"))?;
    let (current, selector) = match kind {
        PriceKind::Mint => (state.mint_price, "set_mint_price"),
        PriceKind::Redeem => (state.redeem_price, "set_redeem_price"),
    };

    let Some(proposed) = args.set else {
        println!("{current}");
        return Ok(false);
    };
    if !args.force && !price_shift_within_limit(current, proposed) {
        bail!("moving the price from {current} to {proposed} exceeds the shift limit; pass --force to override");
    }

    submit_txn(rt, call(&args.pool).selector(selector).uint_arg(proposed).build())?;
    tracing::info!(app = %app, selector, from = current, to = proposed, "price updated");
    println!("{current} -> {proposed}");
    Ok(true)
}

fn notify(rt: &mut Runtime, args: cli::NotifyArgs) -> Result<bool> {
    let selector = if args.vote { "vote" } else { "join" };
    let mut builder = call(&args.pool)
        .selector(selector)
        .arg(args.note.into_bytes())
        .account(resolve_account(&args.to));
    if let Some(commit) = args.commit {
        builder = builder.uint_arg(commit);
    }
    submit_txn(rt, builder.build())?;
    println!("{selector} sent to {}", args.to);
    Ok(true)
}

fn status(rt: &Runtime, app: Option<AppId>) -> Result<()> {
    let apps: Vec<AppId> = match app {
        Some(app) => vec![app],
        None => rt.pools().map(|p| p.app_id).collect(),
    };

    let mut pools = Vec::with_capacity(apps.len());
    for app in apps {
        let pool = rt.pool(app).with_context(|| format!("no pool with id {app}"))?;
        let state = rt.pool_state(app)?;
        let address = app.address();
        let collateral = rt.ledger().balance_of(&address, AssetId::COLLATERAL);
        let tokens = state
            .pool_token
            .map(|t| rt.ledger().balance_of(&address, t));
        pools.push(json!({
            "app": app.0,
            "address": address,
            "creator": pool.creator,
            "policy": pool.policy,
            "state": state,
            "collateral": collateral,
            "redeemable_collateral": collateral.saturating_sub(SEED_AMOUNT),
            "pool_token_balance": tokens,
        }));
    }

    let out = json!({
        "timestamp": rt.ledger().latest_timestamp(),
        "pools": pools,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn balances(rt: &Runtime) {
    for (address, account) in rt.ledger().accounts() {
        let holdings: Vec<String> = account
            .holdings
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(asset, amount)| format!("{asset}:{amount}"))
            .collect();
        println!("{}  {:>20}  {}", address.short(), account.collateral, holdings.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_addresses_resolve_verbatim() {
        let alice = Address::from_label("alice");
        assert_eq!(resolve_account(&alice.to_hex()), alice);
        assert_eq!(resolve_account("alice"), alice);
    }

    #[test]
    fn non_hex_of_address_length_is_a_label() {
        let label = "z".repeat(64);
        assert_eq!(resolve_account(&label), Address::from_label(&label));
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = open_db(dir.path()).unwrap();
            let mut rt = Runtime::load(&db).unwrap();
            init(
                &mut rt,
                cli::InitArgs {
                    accounts: vec!["governor".into()],
                    amount: 5 * SEED_AMOUNT,
                },
            )
            .unwrap();
            deploy(
                &mut rt,
                cli::DeployArgs {
                    from: "governor".into(),
                    fixed: false,
                    lock_start: None,
                    lock_stop: None,
                    governors: vec![],
                    threshold: 1,
                },
            )
            .unwrap();
            rt.save(&db).unwrap();
        }

        let db = open_db(dir.path()).unwrap();
        let rt = Runtime::load(&db).unwrap();
        let app = rt.pools().next().unwrap().app_id;
        assert!(pool_token(&rt, app).is_ok());
        assert_eq!(
            rt.ledger().balance_of(&app.address(), AssetId::COLLATERAL),
            SEED_AMOUNT
        );
    }

    #[test]
    fn mint_from_the_pool_account_fails_cleanly() {
        let mut rt = Runtime::default();
        rt.ledger_mut()
            .fund(Address::from_label("governor"), 5 * SEED_AMOUNT)
            .unwrap();
        deploy(
            &mut rt,
            cli::DeployArgs {
                from: "governor".into(),
                fixed: false,
                lock_start: None,
                lock_stop: None,
                governors: vec![],
                threshold: 1,
            },
        )
        .unwrap();
        let app = rt.pools().next().unwrap().app_id;
        let before = rt.clone();

        let args = cli::AmountArgs {
            pool: cli::PoolArgs {
                app: app.0,
                from: app.address().to_hex(),
            },
            amount: 10_000,
        };
        assert!(mint(&mut rt, args).is_err());
        assert_eq!(rt, before);
    }

    #[test]
    fn price_guard_rejects_large_shift_without_force() {
        let mut rt = Runtime::default();
        rt.ledger_mut()
            .fund(Address::from_label("governor"), 5 * SEED_AMOUNT)
            .unwrap();
        deploy(
            &mut rt,
            cli::DeployArgs {
                from: "governor".into(),
                fixed: false,
                lock_start: None,
                lock_stop: None,
                governors: vec![],
                threshold: 1,
            },
        )
        .unwrap();
        let app = rt.pools().next().unwrap().app_id;
        let args = |set, force| cli::PriceArgs {
            pool: cli::PoolArgs {
                app: app.0,
                from: "governor".into(),
            },
            set: Some(set),
            force,
        };

        assert!(price(&mut rt, args(1_100_000_000, false), PriceKind::Mint).is_err());
        assert!(price(&mut rt, args(1_020_000_000, false), PriceKind::Mint).unwrap());
        assert!(price(&mut rt, args(2_000_000_000, true), PriceKind::Mint).unwrap());
        assert_eq!(rt.pool_state(app).unwrap().mint_price, 2_000_000_000);
    }
}
