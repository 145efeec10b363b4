//! Per-thread engine state
//!
//! Each thread owns one [`ContextStack`]. Delegates, predicates and actions
//! re-enter the engine freely because the state is only ever borrowed for
//! the duration of a single bookkeeping step, never across user code.
//!
//! Independent call chains should be separated with [`CallChain`], which
//! resets the thread's engine when it begins and when it is dropped.

use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;

use serde::Serialize;
use tracing::{trace, warn};

use crate::{
    config::EngineConfig,
    contract::ContractKind,
    context::ContextStack,
    errors::ContractResult,
    snapshot::{OldValue, SnapshotStore},
};

/// Counters for one thread's engine since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Top-level traversals started
    pub traversals: u64,
    /// Clauses appended to a register
    pub clauses_registered: u64,
    /// Guarded actions that executed
    pub actions_run: u64,
    /// Guarded actions skipped because a traversal was in progress
    pub actions_suppressed: u64,
    /// Aggregations that failed
    pub violations: u64,
}

pub(crate) struct Engine {
    pub(crate) stack: ContextStack,
    pub(crate) config: EngineConfig,
    pub(crate) stats: EngineStats,
}

impl Default for Engine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            stack: ContextStack::new(config.max_isolation_depth),
            config,
            stats: EngineStats::default(),
        }
    }
}

thread_local! {
    static ENGINE: RefCell<Engine> = RefCell::new(Engine::default());
}

/// Run one bookkeeping step against this thread's engine
///
/// `f` must not call back into user code.
pub(crate) fn with_engine<R>(f: impl FnOnce(&mut Engine) -> R) -> R {
    ENGINE.with(|engine| f(&mut engine.borrow_mut()))
}

/// Install `config` for this thread
pub fn configure(config: EngineConfig) -> ContractResult<()> {
    config.validate()?;
    with_engine(|engine| {
        engine.stack.set_max_depth(config.max_isolation_depth);
        engine.config = config;
    });
    Ok(())
}

pub fn config() -> EngineConfig {
    with_engine(|engine| engine.config.clone())
}

pub fn stats() -> EngineStats {
    with_engine(|engine| engine.stats)
}

/// Tear down this thread's call state and counters
///
/// The configuration is kept.
pub fn reset() {
    with_engine(|engine| {
        if !engine.stack.is_idle() {
            warn!(
                suspended = engine.stack.depth(),
                "resetting contract engine with unfinished call state"
            );
        }
        engine.stack.reset();
        engine.stats = EngineStats::default();
    });
}

/// True when no call is in flight on this thread
pub fn is_idle() -> bool {
    with_engine(|engine| engine.stack.is_idle())
}

/// Inspect or adjust the raw context stack
///
/// Intended for diagnostics and tests; `f` must not call into the engine.
pub fn with_context_stack<R>(f: impl FnOnce(&mut ContextStack) -> R) -> R {
    with_engine(|engine| f(&mut engine.stack))
}

/// Whether a traversal of `kind` is in progress on the active context
pub fn is_traversing(kind: ContractKind) -> bool {
    with_engine(|engine| engine.stack.active().flag(kind))
}

/// Suspends the active context until dropped
///
/// While the guard lives, a fresh context is active. Dropping it restores
/// the suspended one, also when unwinding.
#[must_use = "the isolated context ends when the guard is dropped"]
pub struct IsolationGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for IsolationGuard {
    fn drop(&mut self) {
        let restored = ENGINE.try_with(|engine| match engine.try_borrow_mut() {
            Ok(mut engine) => engine.stack.leave_isolated().map_err(|e| e.to_string()),
            Err(_) => Err("engine is borrowed".to_string()),
        });
        if let Ok(Err(reason)) = restored {
            warn!("failed to restore call context: {}", reason);
        }
    }
}

pub fn enter_isolated() -> ContractResult<IsolationGuard> {
    with_engine(|engine| engine.stack.enter_isolated())?;
    Ok(IsolationGuard {
        _not_send: PhantomData,
    })
}

/// Run `f` against a fresh context and restore the current one afterwards
pub fn evaluate_isolated<R>(f: impl FnOnce() -> R) -> ContractResult<R> {
    let _isolation = enter_isolated()?;
    Ok(f())
}

/// Capture an old value on the active call
pub fn capture_old<V: Any>(name: impl Into<String>, value: V) {
    capture_old_value(name, OldValue::new(value));
}

pub fn capture_old_value(name: impl Into<String>, value: OldValue) {
    let name = name.into();
    trace!(name = %name, type_name = value.type_name(), "captured old value");
    with_engine(|engine| engine.stack.active_mut().snapshots_mut().capture_value(name, value));
}

/// Recall an old value captured on the active call
pub fn recall_old<V: Any + Clone>(name: &str) -> ContractResult<V> {
    with_engine(|engine| engine.stack.active().snapshots().recall::<V>(name))
}

pub fn clear_olds() {
    with_engine(|engine| engine.stack.active_mut().snapshots_mut().clear());
}

/// Copy of the active call's old values
///
/// Predicates evaluated in an isolated context read the enclosing call's
/// olds through this copy.
pub fn snapshot() -> SnapshotStore {
    with_engine(|engine| engine.stack.active().snapshots().clone())
}

/// Boundary of one independent call chain on this thread
///
/// ```
/// use dbc_contracts::engine::{self, CallChain};
///
/// let _chain = CallChain::begin();
/// engine::capture_old("count", 1i32);
/// assert_eq!(engine::recall_old::<i32>("count").unwrap(), 1);
/// ```
pub struct CallChain {
    _not_send: PhantomData<*const ()>,
}

impl CallChain {
    pub fn begin() -> Self {
        reset();
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for CallChain {
    fn drop(&mut self) {
        let _ = ENGINE.try_with(|engine| {
            let mut engine = engine.borrow_mut();
            engine.stack.reset();
            engine.stats = EngineStats::default();
        });
    }
}

#[cfg(test)]
#[path = "engine/engine_tests.rs"]
mod tests;
