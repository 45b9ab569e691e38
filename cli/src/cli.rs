//! # CLI Interface
//!
//! Defines the command-line argument structure for `ally` using `clap`
//! derive. Every subcommand operates on the sandbox ledger stored in the
//! data directory.
//!
//! Accounts are given either as a 64-character hex address or as a label,
//! which is hashed into a deterministic sandbox address.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Operator tooling for Ally collateral pools.
///
/// Deploys pools, moves collateral in and out of them and drives the
/// governance actions, all against a local sled-backed sandbox ledger.
#[derive(Parser, Debug)]
#[command(name = "ally", about = "Ally collateral pool operator", version, propagate_version = true)]
pub struct AllyCli {
    /// Path to the data directory holding the sandbox database.
    #[arg(long, short = 'd', env = "ALLY_DATA_DIR", default_value = ".ally", global = true)]
    pub data_dir: PathBuf,

    /// Log output format.
    #[arg(long, env = "ALLY_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty, global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Log format selector exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

/// Top-level subcommands for the `ally` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and fund sandbox accounts.
    Init(InitArgs),
    /// Create a pool and bootstrap its token.
    Deploy(DeployArgs),
    /// Deposit collateral and receive pool tokens.
    Mint(AmountArgs),
    /// Return pool tokens and receive collateral.
    Redeem(AmountArgs),
    /// Hand governance over to another account.
    SetGovernor(SetGovernorArgs),
    /// Show or change the mint price.
    MintPrice(PriceArgs),
    /// Show or change the redeem price.
    RedeemPrice(PriceArgs),
    /// Flip whether redemption is enabled.
    ToggleRedeem(PoolArgs),
    /// Send a governance join or vote notification.
    Notify(NotifyArgs),
    /// Delete a pool. Its balances stay on the ledger.
    Delete(PoolArgs),
    /// Print pool state and balances as JSON.
    Status(StatusArgs),
    /// Print collateral and token balances of every account.
    Balances,
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Accounts to fund.
    #[arg(long, value_delimiter = ',', default_value = "governor,alice,bob")]
    pub accounts: Vec<String>,

    /// Collateral credited to each account, in base units.
    #[arg(long, default_value_t = 100_000_000_000)]
    pub amount: u64,
}

/// Arguments for the `deploy` subcommand.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Account that deploys, seeds and initially governs the pool.
    #[arg(long, default_value = "governor")]
    pub from: String,

    /// Use the fixed-ratio policy instead of the priced one.
    #[arg(long)]
    pub fixed: bool,

    /// Unix time after which minting closes (fixed-ratio only).
    #[arg(long, requires_all = ["fixed", "lock_stop"])]
    pub lock_start: Option<u64>,

    /// Unix time after which redemption opens (fixed-ratio only).
    #[arg(long, requires_all = ["fixed", "lock_start"])]
    pub lock_stop: Option<u64>,

    /// Hand governance to a multisig of these accounts after bootstrap.
    #[arg(long, value_delimiter = ',')]
    pub governors: Vec<String>,

    /// Signature threshold of the governing multisig.
    #[arg(long, default_value_t = 1, requires = "governors")]
    pub threshold: u8,
}

/// Selects a pool and the account acting on it.
#[derive(Args, Debug)]
pub struct PoolArgs {
    /// Application id of the pool.
    #[arg(long)]
    pub app: u64,

    /// Account sending the call.
    #[arg(long, default_value = "governor")]
    pub from: String,
}

/// Arguments for `mint` and `redeem`.
#[derive(Args, Debug)]
pub struct AmountArgs {
    #[command(flatten)]
    pub pool: PoolArgs,

    /// Collateral to deposit (mint) or tokens to return (redeem).
    #[arg(long)]
    pub amount: u64,
}

/// Arguments for the `set-governor` subcommand.
#[derive(Args, Debug)]
pub struct SetGovernorArgs {
    #[command(flatten)]
    pub pool: PoolArgs,

    /// The new governor.
    #[arg(long)]
    pub to: String,
}

/// Arguments for `mint-price` and `redeem-price`.
#[derive(Args, Debug)]
pub struct PriceArgs {
    #[command(flatten)]
    pub pool: PoolArgs,

    /// New price scaled by 1e9. Prints the current price when omitted.
    #[arg(long)]
    pub set: Option<u64>,

    /// Allow a change larger than the per-call shift limit.
    #[arg(long, requires = "set")]
    pub force: bool,
}

/// Arguments for the `notify` subcommand.
#[derive(Args, Debug)]
pub struct NotifyArgs {
    #[command(flatten)]
    pub pool: PoolArgs,

    /// Receiver of the zero-value notification.
    #[arg(long)]
    pub to: String,

    /// Note carried by the notification.
    #[arg(long)]
    pub note: String,

    /// Send a vote instead of a join.
    #[arg(long)]
    pub vote: bool,

    /// Collateral to commit with the vote.
    #[arg(long, requires = "vote")]
    pub commit: Option<u64>,
}

/// Arguments for the `status` subcommand.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Application id of the pool. Every pool is listed when omitted.
    #[arg(long)]
    pub app: Option<u64>,
}
