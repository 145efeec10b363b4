//! Exactly-once execution of a method's real logic
//!
//! A base method reached through a contract traversal runs its whole body,
//! action included. Every such call happens while some recursion flag is
//! raised, so the guard skips the action whenever any flag is up. For one
//! external call that leaves a single window with all flags down: after the
//! outermost precondition check and before the outermost postcondition
//! check of the most-derived method.

use tracing::trace;

use crate::{
    engine::{self, with_engine},
    errors::ContractResult,
};

/// True iff a traversal of any kind is in progress on the active call
pub fn is_recursing() -> bool {
    with_engine(|engine| engine.stack.active().any_flag())
}

/// Run `action` unless a traversal is in progress
///
/// The action runs in a fresh context so contract-checked calls it makes
/// start their own traversals. Returns whether the action ran. An action
/// that was entered counts as run even if it fails.
pub fn run_guarded<F>(action: F) -> ContractResult<bool>
where
    F: FnOnce() -> ContractResult<()>,
{
    let recursing = with_engine(|engine| {
        let recursing = engine.stack.active().any_flag();
        if recursing {
            engine.stats.actions_suppressed += 1;
        }
        recursing
    });
    if recursing {
        trace!("action suppressed during traversal");
        return Ok(false);
    }

    let outcome = engine::evaluate_isolated(action)?;
    with_engine(|engine| engine.stats.actions_run += 1);
    outcome?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{
        config::EngineConfig, contract::ContractKind, engine::CallChain, errors::ContractError,
    };

    #[test]
    fn test_runs_once_with_flags_clear() {
        let _chain = CallChain::begin();
        let runs = Cell::new(0);

        let ran = run_guarded(|| {
            runs.set(runs.get() + 1);
            Ok(())
        })
        .unwrap();

        assert!(ran);
        assert_eq!(runs.get(), 1);
        assert_eq!(engine::stats().actions_run, 1);
    }

    #[test]
    fn test_suppressed_under_any_flag() {
        for kind in ContractKind::ALL {
            let _chain = CallChain::begin();
            let runs = Cell::new(0);
            engine::with_context_stack(|stack| stack.active_mut().set_flag(kind, true));

            assert!(is_recursing());
            let ran = run_guarded(|| {
                runs.set(runs.get() + 1);
                Ok(())
            })
            .unwrap();

            assert!(!ran, "action ran while {} flag was set", kind);
            assert_eq!(runs.get(), 0);
            assert_eq!(engine::stats().actions_suppressed, 1);
        }
    }

    #[test]
    fn test_action_sees_fresh_context() {
        let _chain = CallChain::begin();
        engine::capture_old("outer", 1i32);

        run_guarded(|| {
            assert!(!is_recursing());
            assert!(engine::recall_old::<i32>("outer").is_err());
            engine::capture_old("inner", 2i32);
            Ok(())
        })
        .unwrap();

        assert!(engine::recall_old::<i32>("inner").is_err());
        assert_eq!(engine::recall_old::<i32>("outer").unwrap(), 1);
    }

    #[test]
    fn test_action_error_propagates_and_restores() {
        let _chain = CallChain::begin();

        let outcome = run_guarded(|| Err(anyhow::anyhow!("out of stock").into()));

        assert!(outcome.is_err());
        assert_eq!(engine::with_context_stack(|stack| stack.depth()), 0);
        assert_eq!(engine::stats().actions_run, 1);
    }

    #[test]
    fn test_action_not_counted_when_isolation_fails() {
        let _chain = CallChain::begin();
        engine::configure(EngineConfig::new().with_max_isolation_depth(1)).unwrap();
        let runs = Cell::new(0);

        let outer = engine::enter_isolated().unwrap();
        let outcome = run_guarded(|| {
            runs.set(runs.get() + 1);
            Ok(())
        });

        assert!(matches!(
            outcome,
            Err(ContractError::IsolationDepthExceeded { depth: 2 })
        ));
        assert_eq!(runs.get(), 0);
        assert_eq!(engine::stats().actions_run, 0);

        drop(outer);
        engine::configure(EngineConfig::default()).unwrap();
    }
}
