//! Clause aggregation
//!
//! Combines a completed register into a single verdict. Preconditions are
//! joined with OR, postconditions and invariants with AND. The register is
//! always drained, whatever the verdict.

use tracing::debug;

use crate::{
    contract::{ClauseResult, ContractKind},
    errors::ContractViolation,
};

/// How the entries of a register are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combination {
    /// Pass if any entry holds
    Any,
    /// Pass only if every entry holds
    All,
}

impl From<ContractKind> for Combination {
    fn from(kind: ContractKind) -> Self {
        match kind {
            ContractKind::Precondition => Combination::Any,
            ContractKind::Postcondition | ContractKind::Invariant => Combination::All,
        }
    }
}

pub struct ContractAggregator;

impl ContractAggregator {
    /// Evaluate `entries` as a register of `kind`
    ///
    /// An empty register passes. On failure the first failing entry is blamed.
    pub fn combine(kind: ContractKind, entries: &[ClauseResult]) -> Result<(), ContractViolation> {
        if entries.is_empty() {
            return Ok(());
        }

        let passed = match Combination::from(kind) {
            Combination::Any => entries.iter().any(|entry| entry.holds),
            Combination::All => entries.iter().all(|entry| entry.holds),
        };
        if passed {
            return Ok(());
        }

        // a failing register always has at least one false entry
        let blamed = entries
            .iter()
            .find(|entry| !entry.holds)
            .map(|entry| ContractViolation::from_clause(kind, entry))
            .unwrap_or_else(|| ContractViolation::new(kind, "<unknown>", "<unknown>"));
        debug!(%blamed, "contract aggregation failed");
        Err(blamed)
    }

    /// Evaluate and drain `register`
    pub fn aggregate_and_clear(
        kind: ContractKind,
        register: &mut Vec<ClauseResult>,
    ) -> Result<(), ContractViolation> {
        let entries = std::mem::take(register);
        Self::combine(kind, &entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(holds: bool, class_name: &str) -> ClauseResult {
        ClauseResult::new(holds, class_name, "func")
    }

    #[test]
    fn test_precondition_any_true_passes() {
        let entries = vec![entry(false, "derived"), entry(true, "base")];
        assert!(ContractAggregator::combine(ContractKind::Precondition, &entries).is_ok());
    }

    #[test]
    fn test_precondition_all_false_blames_first() {
        let entries = vec![entry(false, "derived"), entry(false, "base")];
        let violation = ContractAggregator::combine(ContractKind::Precondition, &entries).unwrap_err();

        assert_eq!(violation.kind, ContractKind::Precondition);
        assert_eq!(violation.class_name, "derived");
    }

    #[test]
    fn test_postcondition_requires_every_entry() {
        let entries = vec![entry(true, "derived"), entry(false, "base")];
        let violation = ContractAggregator::combine(ContractKind::Postcondition, &entries).unwrap_err();

        assert_eq!(violation.kind, ContractKind::Postcondition);
        assert_eq!(violation.class_name, "base");
    }

    #[test]
    fn test_invariant_all_true_passes() {
        let entries = vec![entry(true, "derived"), entry(true, "base")];
        assert!(ContractAggregator::combine(ContractKind::Invariant, &entries).is_ok());
    }

    #[test]
    fn test_empty_register_passes() {
        for kind in ContractKind::ALL {
            assert!(ContractAggregator::combine(kind, &[]).is_ok());
        }
    }

    #[test]
    fn test_register_drained_on_pass_and_fail() {
        let mut register = vec![entry(true, "derived")];
        assert!(ContractAggregator::aggregate_and_clear(ContractKind::Invariant, &mut register).is_ok());
        assert!(register.is_empty());

        let mut register = vec![entry(false, "derived")];
        assert!(ContractAggregator::aggregate_and_clear(ContractKind::Invariant, &mut register).is_err());
        assert!(register.is_empty());
    }
}
