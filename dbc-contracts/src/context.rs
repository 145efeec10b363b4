//! Call contexts and the context stack
//!
//! A [`CallContext`] holds everything one logical invocation of a
//! contract-checked method accumulates: a clause register per contract kind,
//! a recursion flag per kind, and the old-value snapshots. The
//! [`ContextStack`] keeps exactly one context active and suspends the rest,
//! so short computations can run against a clean slate and then restore the
//! caller's state untouched.

use tracing::trace;

use crate::{
    contract::{ClauseResult, ContractKind},
    errors::{ContractError, ContractResult},
    snapshot::SnapshotStore,
};

/// State for one logical invocation
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Precondition clauses, most-derived first
    preconditions: Vec<ClauseResult>,
    /// Postcondition clauses, most-derived first
    postconditions: Vec<ClauseResult>,
    /// Invariant clauses, most-derived first
    invariants: Vec<ClauseResult>,

    precondition_loop: bool,
    postcondition_loop: bool,
    invariant_loop: bool,

    snapshots: SnapshotStore,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: ContractKind) -> &[ClauseResult] {
        match kind {
            ContractKind::Precondition => &self.preconditions,
            ContractKind::Postcondition => &self.postconditions,
            ContractKind::Invariant => &self.invariants,
        }
    }

    pub fn register_mut(&mut self, kind: ContractKind) -> &mut Vec<ClauseResult> {
        match kind {
            ContractKind::Precondition => &mut self.preconditions,
            ContractKind::Postcondition => &mut self.postconditions,
            ContractKind::Invariant => &mut self.invariants,
        }
    }

    /// Whether a traversal of `kind` is in progress for this call
    pub fn flag(&self, kind: ContractKind) -> bool {
        match kind {
            ContractKind::Precondition => self.precondition_loop,
            ContractKind::Postcondition => self.postcondition_loop,
            ContractKind::Invariant => self.invariant_loop,
        }
    }

    pub fn set_flag(&mut self, kind: ContractKind, value: bool) {
        match kind {
            ContractKind::Precondition => self.precondition_loop = value,
            ContractKind::Postcondition => self.postcondition_loop = value,
            ContractKind::Invariant => self.invariant_loop = value,
        }
    }

    pub fn any_flag(&self) -> bool {
        self.precondition_loop || self.postcondition_loop || self.invariant_loop
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn snapshots_mut(&mut self) -> &mut SnapshotStore {
        &mut self.snapshots
    }

    /// No flags, no pending clauses, no snapshots
    pub fn is_clean(&self) -> bool {
        !self.any_flag()
            && ContractKind::ALL.iter().all(|&kind| self.register(kind).is_empty())
            && self.snapshots.is_empty()
    }
}

/// Suspended contexts plus the single active one
#[derive(Debug, Clone)]
pub struct ContextStack {
    saved: Vec<CallContext>,
    active: CallContext,
    max_depth: usize,
}

impl ContextStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            saved: Vec::new(),
            active: CallContext::new(),
            max_depth,
        }
    }

    pub fn active(&self) -> &CallContext {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut CallContext {
        &mut self.active
    }

    /// Number of suspended contexts
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Suspend the active context and install a fresh one
    pub fn enter_isolated(&mut self) -> ContractResult<()> {
        if self.saved.len() >= self.max_depth {
            return Err(ContractError::IsolationDepthExceeded {
                depth: self.saved.len() + 1,
            });
        }
        let suspended = std::mem::take(&mut self.active);
        self.saved.push(suspended);
        trace!(depth = self.saved.len(), "entered isolated context");
        Ok(())
    }

    /// Restore the most recently suspended context, discarding the active one
    pub fn leave_isolated(&mut self) -> ContractResult<()> {
        let restored = self.saved.pop().ok_or(ContractError::ContextStackUnderflow)?;
        self.active = restored;
        trace!(depth = self.saved.len(), "left isolated context");
        Ok(())
    }

    /// Drop every suspended context and start from an empty active one
    pub fn reset(&mut self) {
        self.saved.clear();
        self.active = CallContext::new();
    }

    /// Nothing suspended and the active context is clean
    pub fn is_idle(&self) -> bool {
        self.saved.is_empty() && self.active.is_clean()
    }
}

#[cfg(test)]
#[path = "context/context_tests.rs"]
mod tests;
