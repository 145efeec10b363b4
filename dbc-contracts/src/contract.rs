//! Contract kinds and clause results
//!
//! A clause is one predicate declared at one level of an override chain.
//! Clauses are evaluated at the check site and collected into the active
//! call's register for their kind, where the aggregator combines them.
//!
//! # Contract Semantics
//!
//! ## Preconditions (`require`)
//! - Evaluated before the method's action runs
//! - Combined across the chain by logical OR: an override may accept inputs
//!   its base rejects (weakening)
//! - Failure blames the caller
//!
//! ## Postconditions (`ensure`)
//! - Evaluated after the method's action runs
//! - Combined by logical AND: an override must keep every base guarantee
//! - May read the call's old values through the snapshot store
//!
//! ## Invariants
//! - Checked on entry to and exit from every contract-checked method
//! - Combined by logical AND

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{engine, errors::ContractResult};

/// Types of contract conditions
///
/// Each kind owns its own clause register and recursion flag on the active
/// call context, so traversals of different kinds never interfere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    /// Precondition (require)
    Precondition,

    /// Postcondition (ensure)
    Postcondition,

    /// Class invariant
    Invariant,
}

impl ContractKind {
    /// Every kind, in the order a method body checks them first
    pub const ALL: [ContractKind; 3] = [
        ContractKind::Invariant,
        ContractKind::Precondition,
        ContractKind::Postcondition,
    ];

    /// Tag used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            ContractKind::Precondition => "precondition",
            ContractKind::Postcondition => "postcondition",
            ContractKind::Invariant => "invariant",
        }
    }

    /// Returns true if an override may weaken clauses of this kind
    pub fn is_weakenable(&self) -> bool {
        matches!(self, ContractKind::Precondition)
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One evaluated predicate at one hierarchy level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseResult {
    /// Outcome of the predicate
    pub holds: bool,

    /// Type that declared the clause
    pub class_name: String,

    /// Method that declared the clause
    pub method_name: String,

    /// Optional label shown when this clause is blamed for a violation
    pub message: Option<String>,
}

impl ClauseResult {
    /// Create a clause result for `class_name.method_name`
    pub fn new(holds: bool, class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            holds,
            class_name: class_name.into(),
            method_name: method_name.into(),
            message: None,
        }
    }

    /// Attach a message describing the predicate
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A clause whose predicate has not been evaluated yet
///
/// The predicate runs in an isolated call context when the clause is
/// resolved, so contract-checked calls made by the predicate cannot leak
/// entries into the register being built for the enclosing check.
pub struct Clause<F> {
    class_name: String,
    method_name: String,
    message: Option<String>,
    predicate: F,
}

impl<F> Clause<F>
where
    F: FnOnce() -> ContractResult<bool>,
{
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>, predicate: F) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            message: None,
            predicate,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Anything a check site can hand to the recursion controller as its clause
///
/// `None` means the level declares nothing for this kind but still takes
/// part in the traversal.
pub trait ClauseSource {
    fn resolve(self) -> ContractResult<Option<ClauseResult>>;
}

impl ClauseSource for ClauseResult {
    fn resolve(self) -> ContractResult<Option<ClauseResult>> {
        Ok(Some(self))
    }
}

impl ClauseSource for Option<ClauseResult> {
    fn resolve(self) -> ContractResult<Option<ClauseResult>> {
        Ok(self)
    }
}

impl<F> ClauseSource for Clause<F>
where
    F: FnOnce() -> ContractResult<bool>,
{
    fn resolve(self) -> ContractResult<Option<ClauseResult>> {
        let holds = engine::evaluate_isolated(self.predicate)??;
        Ok(Some(ClauseResult {
            holds,
            class_name: self.class_name,
            method_name: self.method_name,
            message: self.message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(ContractKind::Precondition.to_string(), "precondition");
        assert_eq!(ContractKind::Postcondition.to_string(), "postcondition");
        assert_eq!(ContractKind::Invariant.to_string(), "invariant");
        assert!(ContractKind::Precondition.is_weakenable());
        assert!(!ContractKind::Invariant.is_weakenable());
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&ContractKind::Postcondition).unwrap();
        assert_eq!(json, "\"postcondition\"");
    }

    #[test]
    fn test_lazy_clause_resolves() {
        let _chain = engine::CallChain::begin();
        let clause = Clause::new("Account", "withdraw", || Ok(false))
            .with_message("amount <= balance")
            .resolve()
            .unwrap()
            .unwrap();

        assert!(!clause.holds);
        assert_eq!(clause.class_name, "Account");
        assert_eq!(clause.message.as_deref(), Some("amount <= balance"));
    }

    #[test]
    fn test_lazy_clause_runs_isolated() {
        let _chain = engine::CallChain::begin();
        engine::capture_old("balance", 10i64);

        let seen = Clause::new("Account", "deposit", || {
            Ok(engine::recall_old::<i64>("balance").is_err())
        })
        .resolve()
        .unwrap()
        .unwrap();

        // the predicate saw a fresh context, the enclosing one is intact
        assert!(seen.holds);
        assert_eq!(engine::recall_old::<i64>("balance").unwrap(), 10);
    }
}
