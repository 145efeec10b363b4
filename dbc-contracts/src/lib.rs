//! Runtime design-by-contract for override chains
//!
//! This crate checks preconditions, postconditions and invariants declared
//! at every level of an override chain and combines them by the subtyping
//! rules: preconditions may only be weakened (OR across levels),
//! postconditions and invariants may only be strengthened (AND across
//! levels). Violations are reported as [`ContractViolation`]s naming the
//! declaring type and method.
//!
//! The building blocks:
//!
//! - [`snapshot`]: old values captured before the action runs
//! - [`context`]: per-call clause registers, recursion flags and the context stack
//! - [`aggregator`]: kind-specific combination of a register
//! - [`recursion`]: top-level vs nested traversal of the chain
//! - [`guard`]: exactly-once execution of the real action
//! - [`engine`]: the per-thread handle tying them together
//! - [`method`]: declarative per-level contracts built on the above
//!
//! Checking is single-threaded per call chain. Each thread has its own
//! engine; use [`engine::CallChain`] to mark the boundaries of independent
//! call chains.

pub mod aggregator;
pub mod config;
pub mod context;
pub mod contract;
pub mod engine;
pub mod errors;
pub mod guard;
pub mod method;
pub mod recursion;
pub mod snapshot;

pub use aggregator::{Combination, ContractAggregator};
pub use config::EngineConfig;
pub use context::{CallContext, ContextStack};
pub use contract::{Clause, ClauseResult, ClauseSource, ContractKind};
pub use engine::{
    capture_old, clear_olds, evaluate_isolated, recall_old, CallChain, EngineStats, IsolationGuard,
};
pub use errors::{ContractError, ContractResult, ContractViolation};
pub use guard::{is_recursing, run_guarded};
pub use method::{MethodContract, MethodContractBuilder};
pub use recursion::{check, check_invariant, check_postcondition, check_precondition};
pub use snapshot::{OldValue, SnapshotEntry, SnapshotStore};
