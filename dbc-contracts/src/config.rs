//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::errors::{ContractError, ContractResult};

/// Configuration for the contract engine of one thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of suspended call contexts
    ///
    /// Every guarded action and every isolated predicate suspends one
    /// context, so this bounds how deeply contract-checked calls may nest
    /// inside each other.
    pub max_isolation_depth: usize,

    /// Emit a trace event for every clause entering a register
    pub trace_clauses: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_isolation_depth: 256,
            trace_clauses: false,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_isolation_depth(mut self, depth: usize) -> Self {
        self.max_isolation_depth = depth;
        self
    }

    pub fn with_trace_clauses(mut self, enabled: bool) -> Self {
        self.trace_clauses = enabled;
        self
    }

    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> ContractResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ContractError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ContractResult<()> {
        if self.max_isolation_depth == 0 {
            return Err(ContractError::Config(
                "max_isolation_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_isolation_depth, 256);
        assert!(!config.trace_clauses);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_max_isolation_depth(16)
            .with_trace_clauses(true);
        assert_eq!(config.max_isolation_depth, 16);
        assert!(config.trace_clauses);
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json(r#"{ "trace_clauses": true }"#).unwrap();
        assert_eq!(config.max_isolation_depth, 256);
        assert!(config.trace_clauses);
    }

    #[test]
    fn test_from_json_rejects_zero_depth() {
        let result = EngineConfig::from_json(r#"{ "max_isolation_depth": 0 }"#);
        assert!(matches!(result, Err(ContractError::Config(_))));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(EngineConfig::from_json("not json").is_err());
    }
}
