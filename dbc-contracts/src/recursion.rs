//! Traversal of an override chain for one contract kind
//!
//! Every check site hands over its own clause and a delegate that performs a
//! real call into the base method. The first check of a kind on a call is
//! the top-level trigger: it raises the kind's flag, runs the delegate, and
//! aggregates whatever the chain registered. Any check of the same kind
//! reached while the flag is up only registers its clause. Checks of other
//! kinds are not affected by the flag and run their own cycle.

use tracing::{debug, trace};

use crate::{
    aggregator::ContractAggregator,
    contract::{ClauseSource, ContractKind},
    engine::with_engine,
    errors::ContractResult,
};

/// Register `clause` for `kind` and, at the top level, walk and aggregate
pub fn check<C, F>(kind: ContractKind, clause: C, delegate: F) -> ContractResult<()>
where
    C: ClauseSource,
    F: FnOnce() -> ContractResult<()>,
{
    // predicate evaluation happens in an isolated context
    let clause = clause.resolve()?;

    let nested = with_engine(|engine| {
        if let Some(clause) = clause {
            if engine.config.trace_clauses {
                trace!(
                    %kind,
                    class = %clause.class_name,
                    method = %clause.method_name,
                    holds = clause.holds,
                    "registered clause"
                );
            }
            engine.stats.clauses_registered += 1;
            engine.stack.active_mut().register_mut(kind).push(clause);
        }

        let active = engine.stack.active_mut();
        if active.flag(kind) {
            return true;
        }
        active.set_flag(kind, true);
        engine.stats.traversals += 1;
        false
    });
    if nested {
        return Ok(());
    }

    debug!(%kind, "traversal started");
    let walked = delegate();

    with_engine(|engine| {
        let active = engine.stack.active_mut();
        active.set_flag(kind, false);

        let verdict: ContractResult<()> = match walked {
            Ok(()) => ContractAggregator::aggregate_and_clear(kind, active.register_mut(kind))
                .map_err(Into::into),
            Err(e) => {
                active.register_mut(kind).clear();
                Err(e)
            }
        };

        // the outermost postcondition check owns the call's olds
        if kind == ContractKind::Postcondition && !active.any_flag() {
            active.snapshots_mut().clear();
        }

        if let Err(e) = &verdict {
            if e.as_violation().is_some() {
                engine.stats.violations += 1;
            }
        }
        debug!(%kind, passed = verdict.is_ok(), "traversal finished");
        verdict
    })
}

pub fn check_invariant<C, F>(clause: C, delegate: F) -> ContractResult<()>
where
    C: ClauseSource,
    F: FnOnce() -> ContractResult<()>,
{
    check(ContractKind::Invariant, clause, delegate)
}

pub fn check_precondition<C, F>(clause: C, delegate: F) -> ContractResult<()>
where
    C: ClauseSource,
    F: FnOnce() -> ContractResult<()>,
{
    check(ContractKind::Precondition, clause, delegate)
}

pub fn check_postcondition<C, F>(clause: C, delegate: F) -> ContractResult<()>
where
    C: ClauseSource,
    F: FnOnce() -> ContractResult<()>,
{
    check(ContractKind::Postcondition, clause, delegate)
}

/// Delegate for a level with no base
pub fn no_base() -> ContractResult<()> {
    Ok(())
}

#[cfg(test)]
#[path = "recursion/recursion_tests.rs"]
mod tests;
