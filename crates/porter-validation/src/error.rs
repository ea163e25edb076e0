//! Error types for the rule engine

use thiserror::Error;

/// Errors raised by rules and the catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A rule could not evaluate its input
    #[error("rule {rule} failed: {message}")]
    RuleFailed {
        /// Rule code
        rule: String,
        /// What went wrong
        message: String,
    },

    /// A rule with this code is already registered
    #[error("rule '{0}' is already registered")]
    DuplicateRule(String),

    /// No rule with this code
    #[error("unknown rule '{0}'")]
    UnknownRule(String),
}

impl ValidationError {
    /// Create rule failure
    pub fn rule_failed(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleFailed {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Result type for rule evaluation
pub type RuleResult<T> = Result<T, ValidationError>;
