//! Declarative contracts for one level of an override chain
//!
//! A [`MethodContract`] describes what one type's override of a method
//! declares: invariant, precondition, old captures, action and
//! postcondition, plus an explicit link to the override it refines. Calling
//! it runs the method body against the engine:
//!
//! 1. entry invariant
//! 2. precondition
//! 3. old-value capture
//! 4. guarded action
//! 5. postcondition
//! 6. exit invariant
//!
//! Each check delegates to the base level's body, which is how the base
//! clauses reach the registers.
//!
//! ```
//! use std::rc::Rc;
//! use dbc_contracts::{engine::CallChain, MethodContract};
//!
//! struct Counter { count: i32 }
//!
//! let base = Rc::new(
//!     MethodContract::<Counter>::builder("Counter", "bump")
//!         .invariant(|c| c.count >= 0)
//!         .require(|c| c.count < 100)
//!         .action(|c| { c.count += 1; Ok(()) })
//!         .build(),
//! );
//! let derived = MethodContract::<Counter>::builder("FastCounter", "bump")
//!     .extends(base)
//!     .old("count", |c| c.count)
//!     .action(|c| { c.count += 5; Ok(()) })
//!     .ensure(|c, olds| Ok(c.count > olds.recall::<i32>("count")?))
//!     .build();
//!
//! let _chain = CallChain::begin();
//! let mut counter = Counter { count: 0 };
//! derived.call(&mut counter).unwrap();
//! assert_eq!(counter.count, 5);
//! ```

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::{
    contract::{ClauseResult, ContractKind},
    engine,
    errors::{ContractError, ContractResult},
    guard, recursion,
    snapshot::{OldValue, SnapshotStore},
};

type Predicate<T> = Box<dyn Fn(&T) -> bool>;
type Postcondition<T> = Box<dyn Fn(&T, &SnapshotStore) -> ContractResult<bool>>;
type Capture<T> = Box<dyn Fn(&T) -> OldValue>;
type Action<T> = Box<dyn Fn(&mut T) -> anyhow::Result<()>>;

struct Labeled<P> {
    label: Option<String>,
    predicate: P,
}

/// One override level of one method on `T`
pub struct MethodContract<T> {
    class_name: String,
    method_name: String,
    invariants: Vec<Labeled<Predicate<T>>>,
    preconditions: Vec<Labeled<Predicate<T>>>,
    postconditions: Vec<Labeled<Postcondition<T>>>,
    olds: Vec<(String, Capture<T>)>,
    action: Option<Action<T>>,
    base: Option<Rc<MethodContract<T>>>,
}

impl<T> fmt::Debug for MethodContract<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodContract")
            .field("class_name", &self.class_name)
            .field("method_name", &self.method_name)
            .field("invariants", &self.invariants.len())
            .field("preconditions", &self.preconditions.len())
            .field("postconditions", &self.postconditions.len())
            .field("olds", &self.olds.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("base", &self.base.as_ref().map(|base| &base.class_name))
            .finish()
    }
}

impl<T: 'static> MethodContract<T> {
    pub fn builder(class_name: impl Into<String>, method_name: impl Into<String>) -> MethodContractBuilder<T> {
        MethodContractBuilder {
            contract: MethodContract {
                class_name: class_name.into(),
                method_name: method_name.into(),
                invariants: Vec::new(),
                preconditions: Vec::new(),
                postconditions: Vec::new(),
                olds: Vec::new(),
                action: None,
                base: None,
            },
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn base(&self) -> Option<&Rc<MethodContract<T>>> {
        self.base.as_ref()
    }

    /// Number of levels from this one down to the root of the chain
    pub fn chain_len(&self) -> usize {
        1 + self.base.as_ref().map_or(0, |base| base.chain_len())
    }

    /// Whether this level declares anything for `kind`
    pub fn declares(&self, kind: ContractKind) -> bool {
        match kind {
            ContractKind::Invariant => !self.invariants.is_empty(),
            ContractKind::Precondition => !self.preconditions.is_empty(),
            ContractKind::Postcondition => !self.postconditions.is_empty(),
        }
    }

    /// Invoke the method on `target`
    ///
    /// Reached from a base delegate, the body only contributes this level's
    /// clauses to the traversals in progress and forwards the walk.
    pub fn call(&self, target: &mut T) -> ContractResult<()> {
        if guard::is_recursing() {
            return self.contribute(target);
        }

        debug!(class = %self.class_name, method = %self.method_name, "contract-checked call");
        let outcome = self.run_body(target);
        if outcome.is_err() {
            // olds of an aborted call must not leak into the next one
            engine::clear_olds();
        }
        outcome
    }

    /// "Call my base's version": the delegate handed to every check
    pub fn call_base(&self, target: &mut T) -> ContractResult<()> {
        match &self.base {
            Some(base) => base.call(target),
            None => Ok(()),
        }
    }

    fn run_body(&self, target: &mut T) -> ContractResult<()> {
        let clause = self.clause(ContractKind::Invariant, target)?;
        recursion::check_invariant(clause, || self.call_base(target))?;

        let clause = self.clause(ContractKind::Precondition, target)?;
        recursion::check_precondition(clause, || self.call_base(target))?;

        self.capture_olds(target)?;
        guard::run_guarded(|| self.run_action(target))?;

        let clause = self.clause(ContractKind::Postcondition, target)?;
        recursion::check_postcondition(clause, || self.call_base(target))?;

        let clause = self.clause(ContractKind::Invariant, target)?;
        recursion::check_invariant(clause, || self.call_base(target))
    }

    fn contribute(&self, target: &mut T) -> ContractResult<()> {
        for kind in ContractKind::ALL {
            if !engine::is_traversing(kind) || !self.declares(kind) {
                continue;
            }
            let clause = self.clause(kind, target)?;
            // the kind's flag is up, so this only registers
            recursion::check(kind, clause, recursion::no_base)?;
        }

        // precondition walks always happen before the action runs
        if engine::is_traversing(ContractKind::Precondition) {
            self.capture_olds(target)?;
        }

        guard::run_guarded(|| self.run_action(target))?;
        self.call_base(target)
    }

    fn run_action(&self, target: &mut T) -> ContractResult<()> {
        match &self.action {
            Some(action) => action(target).map_err(ContractError::Action),
            None => Ok(()),
        }
    }

    fn capture_olds(&self, target: &T) -> ContractResult<()> {
        if self.olds.is_empty() {
            return Ok(());
        }
        let values = engine::evaluate_isolated(|| {
            self.olds
                .iter()
                .map(|(name, capture)| (name.clone(), capture(target)))
                .collect::<Vec<_>>()
        })?;
        for (name, value) in values {
            engine::capture_old_value(name, value);
        }
        Ok(())
    }

    /// Evaluate this level's clause for `kind`, `None` if nothing is declared
    ///
    /// Several predicates on one level must all hold; the first failing
    /// label becomes the clause message.
    fn clause(&self, kind: ContractKind, target: &T) -> ContractResult<Option<ClauseResult>> {
        if !self.declares(kind) {
            return Ok(None);
        }

        let olds = match kind {
            ContractKind::Postcondition => engine::snapshot(),
            _ => SnapshotStore::new(),
        };
        let failing = engine::evaluate_isolated(|| -> ContractResult<Option<Option<String>>> {
            match kind {
                ContractKind::Invariant => Ok(first_failing(&self.invariants, |p| p(target))),
                ContractKind::Precondition => Ok(first_failing(&self.preconditions, |p| p(target))),
                ContractKind::Postcondition => {
                    for labeled in &self.postconditions {
                        if !(labeled.predicate)(target, &olds)? {
                            return Ok(Some(labeled.label.clone()));
                        }
                    }
                    Ok(None)
                }
            }
        })??;

        let mut clause = ClauseResult::new(failing.is_none(), &self.class_name, &self.method_name);
        clause.message = failing.flatten();
        Ok(Some(clause))
    }
}

fn first_failing<P>(predicates: &[Labeled<P>], holds: impl Fn(&P) -> bool) -> Option<Option<String>> {
    predicates
        .iter()
        .find(|labeled| !holds(&labeled.predicate))
        .map(|labeled| labeled.label.clone())
}

/// Builder for [`MethodContract`]
pub struct MethodContractBuilder<T> {
    contract: MethodContract<T>,
}

impl<T: 'static> MethodContractBuilder<T> {
    /// The override this level refines
    pub fn extends(mut self, base: Rc<MethodContract<T>>) -> Self {
        self.contract.base = Some(base);
        self
    }

    pub fn invariant(self, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        self.push_invariant(None, predicate)
    }

    pub fn invariant_labeled(self, label: impl Into<String>, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        self.push_invariant(Some(label.into()), predicate)
    }

    pub fn require(self, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        self.push_require(None, predicate)
    }

    pub fn require_labeled(self, label: impl Into<String>, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        self.push_require(Some(label.into()), predicate)
    }

    pub fn ensure(
        self,
        predicate: impl Fn(&T, &SnapshotStore) -> ContractResult<bool> + 'static,
    ) -> Self {
        self.push_ensure(None, predicate)
    }

    pub fn ensure_labeled(
        self,
        label: impl Into<String>,
        predicate: impl Fn(&T, &SnapshotStore) -> ContractResult<bool> + 'static,
    ) -> Self {
        self.push_ensure(Some(label.into()), predicate)
    }

    /// Capture `name` before the action runs
    pub fn old<V: Any>(mut self, name: impl Into<String>, capture: impl Fn(&T) -> V + 'static) -> Self {
        self.contract
            .olds
            .push((name.into(), Box::new(move |target: &T| OldValue::new(capture(target)))));
        self
    }

    /// The method's real logic
    pub fn action(mut self, action: impl Fn(&mut T) -> anyhow::Result<()> + 'static) -> Self {
        self.contract.action = Some(Box::new(action));
        self
    }

    pub fn build(self) -> MethodContract<T> {
        self.contract
    }

    fn push_invariant(mut self, label: Option<String>, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        self.contract.invariants.push(Labeled {
            label,
            predicate: Box::new(predicate),
        });
        self
    }

    fn push_require(mut self, label: Option<String>, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        self.contract.preconditions.push(Labeled {
            label,
            predicate: Box::new(predicate),
        });
        self
    }

    fn push_ensure(
        mut self,
        label: Option<String>,
        predicate: impl Fn(&T, &SnapshotStore) -> ContractResult<bool> + 'static,
    ) -> Self {
        self.contract.postconditions.push(Labeled {
            label,
            predicate: Box::new(predicate),
        });
        self
    }
}

#[cfg(test)]
#[path = "method/method_tests.rs"]
mod tests;
