//! Porter Validation - compliance rule engine
//!
//! A [`RuleCatalog`] holds named rules keyed by code; anything implementing
//! [`RuleValidator`] (plain functions included) can be registered without
//! touching the engine. The [`ValidationFramework`] evaluates every rule for
//! a commit in parallel and aggregates:
//!
//! - overall compliance: mean of the evaluated scores
//! - violations: scores below 0.8, high severity below 0.5
//! - recommendations: deduplicated in catalog order
//!
//! Rules that cannot be automated report [`RuleOutcome::NotEvaluated`] and
//! are excluded from every average.
//!
//! # Example
//!
//! ```rust,ignore
//! use porter_validation::{ValidationContext, ValidationFramework};
//!
//! let framework = ValidationFramework::with_builtin_rules();
//! let context = ValidationContext::new("loadapi", domain, "feature", "develop");
//! let validation = framework.validate(&commit, &adaptations, &context);
//! for violation in &validation.violations {
//!     println!("{} ({}): {}", violation.rule_code, violation.severity, violation.message);
//! }
//! ```

#![warn(missing_docs)]

pub mod catalog;
pub mod error;
pub mod framework;
pub mod result;
pub mod rule;
pub mod rules;

pub use catalog::RuleCatalog;
pub use error::{RuleResult, ValidationError};
pub use framework::{
    PatternCompliance, RuleStats, ValidationFramework, ValidationReport, ViolationCount,
};
pub use result::{
    mean_score, CommitValidation, RuleOutcome, ValidationResult, Violation, ViolationSeverity,
    HIGH_SEVERITY_THRESHOLD, VIOLATION_THRESHOLD,
};
pub use rule::{Assessment, Rule, RuleCategory, RuleInput, RuleValidator, ValidationContext};
pub use rules::builtin_rules;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
