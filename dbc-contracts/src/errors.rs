//! Contract-related error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contract::{ClauseResult, ContractKind};

/// Main contract error type
#[derive(Error, Debug)]
pub enum ContractError {
    /// A clause register failed aggregation
    #[error("Contract violation: {0}")]
    Violation(#[from] ContractViolation),

    /// Old value lookup with no prior capture in the active call
    #[error("old with name '{name}' not found")]
    SnapshotNotFound { name: String },

    /// Old value exists but was captured with a different type
    #[error("old with name '{name}' is not a {expected}")]
    SnapshotTypeMismatch { name: String, expected: &'static str },

    /// `leave_isolated` without a matching `enter_isolated`
    #[error("context stack underflow: no suspended call context to restore")]
    ContextStackUnderflow,

    /// Too many nested isolated contexts
    #[error("isolation depth {depth} exceeds the configured maximum")]
    IsolationDepthExceeded { depth: usize },

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The guarded action itself failed
    #[error("Action failed: {0}")]
    Action(#[from] anyhow::Error),
}

impl ContractError {
    /// Get the violation if this error is one
    pub fn as_violation(&self) -> Option<&ContractViolation> {
        match self {
            Self::Violation(violation) => Some(violation),
            _ => None,
        }
    }
}

/// A failed contract, naming the declaring type and method
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind} failed @ {class_name}.{method_name}(){}", message_suffix(.message))]
pub struct ContractViolation {
    pub kind: ContractKind,
    pub class_name: String,
    pub method_name: String,
    pub message: Option<String>,
}

impl ContractViolation {
    /// Create a new contract violation
    pub fn new(kind: ContractKind, class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            kind,
            class_name: class_name.into(),
            method_name: method_name.into(),
            message: None,
        }
    }

    /// Blame a specific clause
    pub fn from_clause(kind: ContractKind, clause: &ClauseResult) -> Self {
        Self {
            kind,
            class_name: clause.class_name.clone(),
            method_name: clause.method_name.clone(),
            message: clause.message.clone(),
        }
    }

    /// Set the message for this violation
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {}", message),
        None => String::new(),
    }
}

/// Result type for contract operations
pub type ContractResult<T> = Result<T, ContractError>;

#[cfg(test)]
#[path = "errors/errors_tests.rs"]
mod tests;
