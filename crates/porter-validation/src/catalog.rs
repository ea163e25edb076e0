//! Extensible rule catalog

use crate::error::{RuleResult, ValidationError};
use crate::rule::Rule;
use crate::rules::builtin_rules;
use indexmap::IndexMap;

/// Rules keyed by code, iterated in registration order
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: IndexMap<String, Rule>,
}

impl RuleCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding every built-in rule
    #[must_use]
    pub fn with_builtin_rules() -> Self {
        let mut catalog = Self::new();
        for rule in builtin_rules() {
            catalog.rules.insert(rule.code.clone(), rule);
        }
        catalog
    }

    /// Register a rule
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateRule`] if the code is taken.
    pub fn register(&mut self, rule: Rule) -> RuleResult<()> {
        if self.rules.contains_key(&rule.code) {
            return Err(ValidationError::DuplicateRule(rule.code));
        }
        self.rules.insert(rule.code.clone(), rule);
        Ok(())
    }

    /// Remove a rule by code
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownRule`] if no rule has the code.
    pub fn remove(&mut self, code: &str) -> RuleResult<Rule> {
        self.rules
            .shift_remove(code)
            .ok_or_else(|| ValidationError::UnknownRule(code.to_string()))
    }

    /// Rule by code
    #[inline]
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&Rule> {
        self.rules.get(code)
    }

    /// Rules in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Number of rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// No rules registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Assessment, RuleInput};

    fn noop(_: &RuleInput<'_>) -> RuleResult<Assessment> {
        Ok(Assessment::compliant())
    }

    #[test]
    fn builtin_catalog_order() {
        let catalog = RuleCatalog::with_builtin_rules();
        let ids: Vec<u16> = catalog.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 7, 8, 10, 11, 14, 16, 21, 22, 24, 25, 26, 39, 44, 45]);
        assert_eq!(catalog.get("objectmaps_usage").map(|r| r.id), Some(26));
    }

    #[test]
    fn duplicate_codes_rejected() {
        let mut catalog = RuleCatalog::with_builtin_rules();
        let err = catalog
            .register(Rule::new(1, "new_input_integration", "Again", &[], noop))
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateRule("new_input_integration".into()));
    }

    #[test]
    fn custom_rules_append() {
        let mut catalog = RuleCatalog::with_builtin_rules();
        catalog
            .register(Rule::new(50, "custom_check", "Custom", &["anything"], noop))
            .unwrap();
        assert_eq!(catalog.iter().last().map(|r| r.code.as_str()), Some("custom_check"));
        assert!(catalog.remove("custom_check").is_ok());
        assert!(matches!(catalog.remove("custom_check"), Err(ValidationError::UnknownRule(_))));
    }
}
