//! # Pool Errors
//!
//! Every way a pool invocation can be rejected. A rejection always means
//! the whole group is dropped: no state write, no inner transfer, no
//! ledger movement from any member.

use ally_protocol::identity::{Address, AppId, AssetId};
use thiserror::Error;

/// Reasons a pool rejects an invocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A governor-only action was attempted by someone else.
    #[error("unauthorized: {caller} is not the governor ({governor})")]
    Unauthorized {
        /// Sender of the rejected call.
        caller: Address,
        /// Current governor.
        governor: Address,
    },

    /// The pool token was already created.
    #[error("pool already bootstrapped with token {token}")]
    AlreadyBootstrapped {
        /// The existing pool token.
        token: AssetId,
    },

    /// Mint or redeem before the pool token exists.
    #[error("pool has not been bootstrapped")]
    NotBootstrapped,

    /// The group does not have the shape the action requires.
    #[error("malformed group: {reason}")]
    MalformedGroup {
        /// Which check failed.
        reason: String,
    },

    /// Redemptions are switched off.
    #[error("redeem is disabled")]
    RedeemDisabled,

    /// The selector names no action this pool supports.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// A scaled price product does not fit in a `u64`.
    #[error("price overflow: {price} * {amount} / scale exceeds u64")]
    PriceOverflow {
        /// Scaled price used.
        price: u64,
        /// Amount being priced.
        amount: u64,
    },

    /// The pool cannot fund an inner transfer.
    #[error("insufficient pool balance of asset {asset}: requested {requested}, available {available}")]
    InsufficientPoolBalance {
        /// Asset the pool would have to send.
        asset: AssetId,
        /// Amount requested.
        requested: u64,
        /// Amount the pool may spend.
        available: u64,
    },

    /// An application argument could not be decoded.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with it.
        reason: String,
    },

    /// The pool keeps no per-account state, so opting in is refused.
    #[error("opt-in is not supported")]
    OptInRejected,

    /// The action is outside the pool's lock window.
    #[error("{action} not allowed at {now} (window start {start}, stop {stop})")]
    OutsideLockWindow {
        /// Rejected action.
        action: &'static str,
        /// Ledger time of the attempt.
        now: u64,
        /// Window start.
        start: u64,
        /// Window stop.
        stop: u64,
    },

    /// A stored key is missing or holds the wrong type.
    #[error("corrupt pool state at key '{key}'")]
    CorruptState {
        /// Offending key.
        key: String,
    },

    /// The call targets an application that does not exist.
    #[error("unknown application: {0}")]
    UnknownApplication(AppId),
}

impl PoolError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        PoolError::MalformedGroup {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        PoolError::InvalidArgument {
            reason: reason.into(),
        }
    }
}
