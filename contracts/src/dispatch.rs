//! # Action Dispatcher
//!
//! The pool state machine. A [`Pool`] evaluates one application call
//! against a read-only ledger view and a snapshot of its own state, and
//! returns an [`Outcome`]: the state writes, the inner transactions, and
//! any lifecycle change. It never mutates anything itself; the runtime
//! applies an outcome only once the whole group has succeeded.
//!
//! ## Entry Points
//!
//! | On-completion       | Behaviour                                 |
//! |---------------------|-------------------------------------------|
//! | create (`app_id 0`) | genesis state, `governor = creator`        |
//! | `NoOp`              | dispatch on `args[0]`                      |
//! | `OptIn`             | always rejected                            |
//! | `CloseOut`          | approved, no effect                        |
//! | `ClearState`        | approved, no effect                        |
//! | `UpdateApplication` | governor only, replaces the policy         |
//! | `DeleteApplication` | governor only, removes the pool            |
//!
//! ## Check Order
//!
//! Bootstrap checks `AlreadyBootstrapped`, then the governor, then the
//! group shape. Other governor-only actions check the governor first.
//! Mint and redeem need the pool token, then the shape, then the policy's
//! time window, then pricing, then the issuer's balance check.

use std::fmt;

use ally_protocol::config::SEED_AMOUNT;
use ally_protocol::identity::{Address, AppId, AssetId};
use ally_protocol::ledger::BalanceView;
use ally_protocol::storage::{GlobalState, StateDelta};
use ally_protocol::transaction::{ApplicationCall, OnCompletion};
use serde::{Deserialize, Serialize};

use crate::error::PoolError;
use crate::group::{
    validate_bootstrap, validate_mint, validate_redeem, validate_single, Invocation, SingleCall,
};
use crate::guard::require_governor;
use crate::issuer::{InnerTxn, Issuer};
use crate::pricing::{PoolPolicy, PricingPolicy, Reserves};
use crate::state::{PoolDelta, PoolState, KEY_POOL_TOKEN};

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// The action named by `args[0]` of a `NoOp` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    Bootstrap,
    SetGovernor,
    SetMintPrice,
    SetRedeemPrice,
    ToggleRedeem,
    Join,
    Vote,
    Mint,
    Redeem,
}

impl Selector {
    pub const ALL: [Selector; 9] = [
        Selector::Bootstrap,
        Selector::SetGovernor,
        Selector::SetMintPrice,
        Selector::SetRedeemPrice,
        Selector::ToggleRedeem,
        Selector::Join,
        Selector::Vote,
        Selector::Mint,
        Selector::Redeem,
    ];

    /// The wire name carried in `args[0]`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Selector::Bootstrap => "bootstrap",
            Selector::SetGovernor => "set_governor",
            Selector::SetMintPrice => "set_mint_price",
            Selector::SetRedeemPrice => "set_redeem_price",
            Selector::ToggleRedeem => "toggle_redeem",
            Selector::Join => "join",
            Selector::Vote => "vote",
            Selector::Mint => "mint",
            Selector::Redeem => "redeem",
        }
    }

    pub fn parse(raw: &[u8]) -> Result<Self, PoolError> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().as_bytes() == raw)
            .ok_or_else(|| PoolError::UnknownAction(String::from_utf8_lossy(raw).into_owned()))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Big-endian bytes to integer. Empty is zero; more than eight bytes is
/// rejected.
pub fn btoi(bytes: &[u8]) -> Result<u64, PoolError> {
    if bytes.len() > 8 {
        return Err(PoolError::invalid_argument(format!(
            "integer argument is {} bytes, max 8",
            bytes.len()
        )));
    }
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

fn uint_arg(call: &ApplicationCall, index: usize, name: &str) -> Result<u64, PoolError> {
    let raw = call
        .arg(index)
        .ok_or_else(|| PoolError::invalid_argument(format!("missing {name} argument")))?;
    btoi(raw)
}

fn first_account(call: &ApplicationCall, purpose: &str) -> Result<Address, PoolError> {
    call.accounts
        .first()
        .copied()
        .ok_or_else(|| PoolError::invalid_argument(format!("{purpose} needs a referenced account")))
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What happens to the application itself after the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    Unchanged,
    Updated(PoolPolicy),
    Deleted,
}

/// Everything an approved invocation wants done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub delta: StateDelta,
    pub inner: Vec<InnerTxn>,
    pub lifecycle: Lifecycle,
}

impl Outcome {
    fn approve() -> Self {
        Self {
            delta: StateDelta::new(),
            inner: Vec::new(),
            lifecycle: Lifecycle::Unchanged,
        }
    }

    fn with_delta(delta: PoolDelta) -> Self {
        Self {
            delta: delta.into_inner(),
            ..Self::approve()
        }
    }

    fn with_inner(delta: PoolDelta, inner: Vec<InnerTxn>) -> Self {
        Self {
            delta: delta.into_inner(),
            inner,
            lifecycle: Lifecycle::Unchanged,
        }
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// A deployed pool: its policy and its stored state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub app_id: AppId,
    pub creator: Address,
    pub policy: PoolPolicy,
    pub store: GlobalState,
}

impl Pool {
    /// Deploys a pool with genesis state.
    pub fn create(app_id: AppId, creator: Address, policy: PoolPolicy) -> Self {
        let mut store = GlobalState::new();
        store.apply(&PoolState::genesis(creator).to_delta());
        tracing::info!(app = %app_id, creator = %creator.short(), ?policy, "pool created");
        Self {
            app_id,
            creator,
            policy,
            store,
        }
    }

    /// The pool's own account.
    pub fn address(&self) -> Address {
        self.app_id.address()
    }

    pub fn state(&self) -> Result<PoolState, PoolError> {
        PoolState::load(&self.store)
    }

    /// Applies the writes of an approved outcome.
    pub fn apply(&mut self, delta: &StateDelta) {
        self.store.apply(delta);
    }

    /// Evaluates the call at `inv.position` against `view`.
    pub fn evaluate<V: BalanceView>(
        &self,
        inv: &Invocation<'_>,
        view: &V,
    ) -> Result<Outcome, PoolError> {
        let call = inv.call()?;
        let sender = inv.sender()?;
        let state = self.state()?;

        match call.on_completion {
            OnCompletion::NoOp => self.dispatch(inv, call, &state, view),
            OnCompletion::OptIn => Err(PoolError::OptInRejected),
            OnCompletion::CloseOut | OnCompletion::ClearState => Ok(Outcome::approve()),
            OnCompletion::UpdateApplication => {
                require_governor(&state, &sender)?;
                let policy = match &call.program {
                    Some(program) => PoolPolicy::from_program(program)?,
                    None => self.policy,
                };
                Ok(Outcome {
                    lifecycle: Lifecycle::Updated(policy),
                    ..Outcome::approve()
                })
            }
            OnCompletion::DeleteApplication => {
                require_governor(&state, &sender)?;
                Ok(Outcome {
                    lifecycle: Lifecycle::Deleted,
                    ..Outcome::approve()
                })
            }
        }
    }

    fn dispatch<V: BalanceView>(
        &self,
        inv: &Invocation<'_>,
        call: &ApplicationCall,
        state: &PoolState,
        view: &V,
    ) -> Result<Outcome, PoolError> {
        let raw = call
            .selector()
            .ok_or_else(|| PoolError::UnknownAction(String::new()))?;
        let selector = Selector::parse(raw)?;
        if !self.policy.supports(selector) {
            return Err(PoolError::UnknownAction(selector.to_string()));
        }
        tracing::debug!(app = %self.app_id, %selector, position = inv.position, "dispatching");

        match selector {
            Selector::Bootstrap => self.bootstrap(inv, state, view),
            Selector::SetGovernor => {
                let single = admin_call(inv, state)?;
                let governor = first_account(single.call, "set_governor")?;
                Ok(Outcome::with_delta(PoolDelta::new().governor(governor)))
            }
            Selector::SetMintPrice => {
                let single = admin_call(inv, state)?;
                let price = uint_arg(single.call, 1, "price")?;
                Ok(Outcome::with_delta(PoolDelta::new().mint_price(price)))
            }
            Selector::SetRedeemPrice => {
                let single = admin_call(inv, state)?;
                let price = uint_arg(single.call, 1, "price")?;
                Ok(Outcome::with_delta(PoolDelta::new().redeem_price(price)))
            }
            Selector::ToggleRedeem => {
                admin_call(inv, state)?;
                Ok(Outcome::with_delta(
                    PoolDelta::new().redeem_enabled(!state.redeem_enabled),
                ))
            }
            Selector::Join => self.notify(inv, state, view, false),
            Selector::Vote => self.notify(inv, state, view, true),
            Selector::Mint => self.mint(inv, state, view),
            Selector::Redeem => self.redeem(inv, state, view),
        }
    }

    fn bootstrap<V: BalanceView>(
        &self,
        inv: &Invocation<'_>,
        state: &PoolState,
        view: &V,
    ) -> Result<Outcome, PoolError> {
        if let Some(token) = state.pool_token {
            return Err(PoolError::AlreadyBootstrapped { token });
        }
        require_governor(state, &inv.sender()?)?;
        validate_bootstrap(inv)?;

        let mut issuer = Issuer::new(self.address(), view);
        let token = issuer.create_asset(self.policy.token_params(self.app_id));
        tracing::info!(app = %self.app_id, %token, "bootstrapping pool token");
        Ok(Outcome::with_inner(
            PoolDelta::new().pool_token(token),
            issuer.finish(),
        ))
    }

    /// `join` and `vote`: a zero-value payment carrying the caller's note
    /// to the first referenced account. `vote` may also commit collateral.
    fn notify<V: BalanceView>(
        &self,
        inv: &Invocation<'_>,
        state: &PoolState,
        view: &V,
        is_vote: bool,
    ) -> Result<Outcome, PoolError> {
        let single = admin_call(inv, state)?;
        let target = first_account(single.call, "notify")?;
        let note = single
            .call
            .arg(1)
            .ok_or_else(|| PoolError::invalid_argument("missing note argument"))?
            .to_vec();

        let mut delta = PoolDelta::new();
        if is_vote {
            if let Some(raw) = single.call.arg(2) {
                let commit = btoi(raw)?;
                let committed = state
                    .committed_collateral
                    .checked_add(commit)
                    .ok_or_else(|| PoolError::invalid_argument("committed collateral overflows"))?;
                let redeemable = redeemable_collateral(view, self.address());
                if committed > redeemable {
                    return Err(PoolError::InsufficientPoolBalance {
                        asset: AssetId::COLLATERAL,
                        requested: committed,
                        available: redeemable,
                    });
                }
                delta = delta.committed_collateral(committed);
            }
        }

        let mut issuer = Issuer::new(self.address(), view);
        issuer.pay_with_note(target, 0, Some(note))?;
        Ok(Outcome::with_inner(delta, issuer.finish()))
    }

    fn mint<V: BalanceView>(
        &self,
        inv: &Invocation<'_>,
        state: &PoolState,
        view: &V,
    ) -> Result<Outcome, PoolError> {
        let token = state.pool_token.ok_or(PoolError::NotBootstrapped)?;
        let group = validate_mint(inv, token)?;
        self.policy.check_mint_time(view.latest_timestamp())?;

        let reserves = self.reserves(view, token)?;
        let tokens = self
            .policy
            .tokens_for_collateral(state, &reserves, group.payment.amount)?;
        tracing::debug!(
            app = %self.app_id,
            caller = %group.caller.short(),
            collateral_in = group.payment.amount,
            tokens,
            "mint priced"
        );

        let mut issuer = Issuer::new(self.address(), view);
        issuer.transfer_asset(group.caller, token, tokens)?;
        Ok(Outcome::with_inner(PoolDelta::new(), issuer.finish()))
    }

    fn redeem<V: BalanceView>(
        &self,
        inv: &Invocation<'_>,
        state: &PoolState,
        view: &V,
    ) -> Result<Outcome, PoolError> {
        let token = state.pool_token.ok_or(PoolError::NotBootstrapped)?;
        let group = validate_redeem(inv, token, state.redeem_enabled)?;
        self.policy.check_redeem_time(view.latest_timestamp())?;

        let reserves = self.reserves(view, token)?;
        let collateral = self
            .policy
            .collateral_for_tokens(state, &reserves, group.transfer.amount)?;
        tracing::debug!(
            app = %self.app_id,
            caller = %group.caller.short(),
            tokens_in = group.transfer.amount,
            collateral,
            "redeem priced"
        );

        let mut issuer = Issuer::new(self.address(), view);
        issuer.pay(group.caller, collateral)?;
        Ok(Outcome::with_inner(PoolDelta::new(), issuer.finish()))
    }

    fn reserves<V: BalanceView>(&self, view: &V, token: AssetId) -> Result<Reserves, PoolError> {
        let supply = view
            .asset_info(token)
            .map(|info| info.params.total)
            .ok_or_else(|| PoolError::CorruptState {
                key: KEY_POOL_TOKEN.to_string(),
            })?;
        Ok(Reserves {
            redeemable_collateral: redeemable_collateral(view, self.address()),
            outstanding_tokens: supply.saturating_sub(view.balance_of(&self.address(), token)),
        })
    }
}

fn admin_call<'a>(
    inv: &Invocation<'a>,
    state: &PoolState,
) -> Result<SingleCall<'a>, PoolError> {
    require_governor(state, &inv.sender()?)?;
    validate_single(inv)
}

fn redeemable_collateral<V: BalanceView>(view: &V, pool: Address) -> u64 {
    view.balance_of(&pool, AssetId::COLLATERAL)
        .saturating_sub(SEED_AMOUNT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
