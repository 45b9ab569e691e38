//! # Governance Guard
//!
//! One predicate gates every administrative transition: the sender must be
//! the current governor. It runs before any other check of the action so
//! an outsider learns nothing about whether their group was well formed.

use ally_protocol::identity::Address;

use crate::error::PoolError;
use crate::state::PoolState;

/// Fails with [`PoolError::Unauthorized`] unless `caller` governs the pool.
pub fn require_governor(state: &PoolState, caller: &Address) -> Result<(), PoolError> {
    if *caller != state.governor {
        tracing::warn!(
            caller = %caller.short(),
            governor = %state.governor.short(),
            "rejected non-governor call"
        );
        return Err(PoolError::Unauthorized {
            caller: *caller,
            governor: state.governor,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn governor_passes_everyone_else_fails() {
        let gov = Address::from_label("gov");
        let mallory = Address::from_label("mallory");
        let state = PoolState::genesis(gov);

        assert!(require_governor(&state, &gov).is_ok());
        assert_eq!(
            require_governor(&state, &mallory),
            Err(PoolError::Unauthorized {
                caller: mallory,
                governor: gov,
            })
        );
    }
}
