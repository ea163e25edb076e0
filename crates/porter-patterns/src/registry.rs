//! Strategy registry keyed by domain type
//!
//! Selection is an explicit lookup on [`DomainType`]; repository names play
//! no part in it.

use crate::error::{PatternError, PatternResult};
use crate::strategy::{
    ConfigStrategy, JavaAlgorithmStrategy, LoadApiStrategy, MfpStrategy, PatternStrategy,
};
use porter_model::DomainType;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of pattern strategies
#[derive(Debug, Default, Clone)]
pub struct StrategyRegistry {
    strategies: BTreeMap<DomainType, Arc<dyn PatternStrategy>>,
}

impl StrategyRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Create registry with built-in strategies
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JavaAlgorithmStrategy::new()));
        registry.register(Arc::new(LoadApiStrategy::new()));
        registry.register(Arc::new(ConfigStrategy::new()));
        registry.register(Arc::new(MfpStrategy::new()));
        registry
    }

    /// Register a strategy, replacing any previous one for its domain
    pub fn register(&mut self, strategy: Arc<dyn PatternStrategy>) {
        self.strategies.insert(strategy.domain(), strategy);
    }

    /// Check if a domain has a strategy
    #[inline]
    #[must_use]
    pub fn contains(&self, domain: DomainType) -> bool {
        self.strategies.contains_key(&domain)
    }

    /// Strategy for a domain, if registered
    #[must_use]
    pub fn get(&self, domain: DomainType) -> Option<Arc<dyn PatternStrategy>> {
        self.strategies.get(&domain).cloned()
    }

    /// Strategy for a domain
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::NoStrategy`] when nothing is registered.
    pub fn for_domain(&self, domain: DomainType) -> PatternResult<Arc<dyn PatternStrategy>> {
        self.get(domain).ok_or(PatternError::NoStrategy(domain))
    }

    /// Registered domains
    #[must_use]
    pub fn domains(&self) -> Vec<DomainType> {
        self.strategies.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_domain() {
        let registry = StrategyRegistry::with_defaults();
        for domain in DomainType::ALL {
            let strategy = registry.for_domain(domain).unwrap();
            assert_eq!(strategy.domain(), domain);
        }
        assert_eq!(registry.domains().len(), DomainType::ALL.len());
    }

    #[test]
    fn empty_registry_reports_missing_strategy() {
        let registry = StrategyRegistry::new();
        assert!(!registry.contains(DomainType::SqlConfig));
        assert!(matches!(
            registry.for_domain(DomainType::SqlConfig),
            Err(PatternError::NoStrategy(DomainType::SqlConfig))
        ));
    }

    #[test]
    fn register_replaces_same_domain() {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(MfpStrategy::new()));
        registry.register(Arc::new(MfpStrategy::new()));
        assert_eq!(registry.domains(), vec![DomainType::PythonMfp]);
    }
}
