//! Validation Framework: evaluates a commit against the catalog
//!
//! Rules run in parallel on the rayon pool and results come back in catalog
//! order. Every commit validation is kept in an in-memory history feeding
//! [`ValidationFramework::report`].

use crate::catalog::RuleCatalog;
use crate::rule::{Assessment, Rule, RuleCategory, RuleInput, ValidationContext};
use crate::result::{
    mean_score, CommitValidation, RuleOutcome, ValidationResult, Violation, VIOLATION_THRESHOLD,
};
use indexmap::IndexSet;
use parking_lot::RwLock;
use porter_model::{Adaptation, Commit, ComponentKind};
use porter_patterns::MODULE_PARENTS;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Violations listed in the report summary
pub const TOP_VIOLATIONS: usize = 5;

/// Score lost per pattern issue
pub const PATTERN_ISSUE_PENALTY: f64 = 0.1;

/// How often a rule was violated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationCount {
    /// Rule code
    pub rule_code: String,
    /// Number of violating commits
    pub count: usize,
}

/// Aggregate figures for one rule across the history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStats {
    /// Rule number
    pub rule_id: u16,
    /// Rule code
    pub rule_code: String,
    /// Display name
    pub name: String,
    /// Family
    pub category: RuleCategory,
    /// Mean score over evaluated runs
    pub compliance: Option<f64>,
    /// Commits the rule ran against
    pub validations: usize,
    /// Commits where it was not evaluated
    pub not_evaluated: usize,
    /// Commits where it scored below the violation threshold
    pub violations: usize,
}

/// Summary across every validated commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Commits validated
    pub total_validations: usize,
    /// Mean overall compliance; `None` when nothing was evaluated
    pub average_compliance: Option<f64>,
    /// Violation counts keyed by category label
    pub violations_by_category: BTreeMap<String, usize>,
    /// Most frequently violated rules
    pub most_common_violations: Vec<ViolationCount>,
    /// Per-rule figures in catalog order
    pub rules: Vec<RuleStats>,
    /// Every recommendation, deduplicated in first-seen order
    pub recommendations: Vec<String>,
    /// The underlying commit validations
    pub validations: Vec<CommitValidation>,
}

/// Structural pattern check of a commit's adaptations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCompliance {
    /// No issues found
    pub compliant: bool,
    /// Issue descriptions, prefixed with the file path
    pub issues: Vec<String>,
    /// 1.0 minus a fixed penalty per issue, floored at zero
    pub score: f64,
}

/// Rule engine with validation history
#[derive(Debug, Default)]
pub struct ValidationFramework {
    catalog: RuleCatalog,
    history: RwLock<Vec<CommitValidation>>,
}

impl ValidationFramework {
    /// Create framework over a catalog
    #[must_use]
    pub fn new(catalog: RuleCatalog) -> Self {
        Self {
            catalog,
            history: RwLock::new(Vec::new()),
        }
    }

    /// Framework over the built-in rules
    #[must_use]
    pub fn with_builtin_rules() -> Self {
        Self::new(RuleCatalog::with_builtin_rules())
    }

    /// The catalog
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Validate one commit's adaptations against every rule
    pub fn validate(
        &self,
        commit: &Commit,
        adaptations: &[Adaptation],
        context: &ValidationContext,
    ) -> CommitValidation {
        let input = RuleInput::new(commit, adaptations, context);
        let rules: Vec<&Rule> = self.catalog.iter().collect();
        let results: Vec<ValidationResult> =
            rules.par_iter().map(|rule| evaluate(rule, &input)).collect();

        let violations: Vec<Violation> = results
            .iter()
            .filter_map(|r| {
                let severity = r.severity()?;
                Some(Violation {
                    rule_id: r.rule_id,
                    rule_code: r.rule_code.clone(),
                    severity,
                    score: r.score().unwrap_or_default(),
                    message: r.message.clone(),
                    recommendations: r.recommendations.clone(),
                })
            })
            .collect();
        let recommendations: IndexSet<String> = results
            .iter()
            .flat_map(|r| r.recommendations.iter().cloned())
            .collect();

        let validation = CommitValidation {
            commit: commit.hash.clone(),
            overall_compliance: mean_score(&results),
            results,
            violations,
            recommendations: recommendations.into_iter().collect(),
        };
        debug!(
            commit = %commit.short_hash(),
            compliance = ?validation.overall_compliance,
            violations = validation.violations.len(),
            "Validated commit"
        );
        if validation.has_high_violation() {
            info!(commit = %commit.short_hash(), "High-severity rule violation");
        }
        self.history.write().push(validation.clone());
        validation
    }

    /// Every validation so far, in order
    #[must_use]
    pub fn history(&self) -> Vec<CommitValidation> {
        self.history.read().clone()
    }

    /// Summary report over the history
    #[must_use]
    pub fn report(&self) -> ValidationReport {
        let history = self.history.read();

        let overall: Vec<f64> = history.iter().filter_map(|v| v.overall_compliance).collect();
        #[allow(clippy::cast_precision_loss)]
        let average_compliance =
            (!overall.is_empty()).then(|| overall.iter().sum::<f64>() / overall.len() as f64);

        let mut violations_by_category: BTreeMap<String, usize> = BTreeMap::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for violation in history.iter().flat_map(|v| &v.violations) {
            let category = self
                .catalog
                .get(&violation.rule_code)
                .map_or("Unknown", |rule| rule.category.label());
            *violations_by_category.entry(category.to_string()).or_default() += 1;
            *counts.entry(violation.rule_code.as_str()).or_default() += 1;
        }
        let mut most_common: Vec<ViolationCount> = counts
            .into_iter()
            .map(|(code, count)| ViolationCount {
                rule_code: code.to_string(),
                count,
            })
            .collect();
        most_common.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.rule_code.cmp(&b.rule_code)));
        most_common.truncate(TOP_VIOLATIONS);

        let rules = self
            .catalog
            .iter()
            .map(|rule| rule_stats(rule, &history))
            .collect();

        let mut recommendations = IndexSet::new();
        for validation in history.iter() {
            recommendations.extend(validation.recommendations.iter().cloned());
            for violation in &validation.violations {
                recommendations.extend(violation.recommendations.iter().cloned());
            }
        }

        ValidationReport {
            total_validations: history.len(),
            average_compliance,
            violations_by_category,
            most_common_violations: most_common,
            rules,
            recommendations: recommendations.into_iter().collect(),
            validations: history.clone(),
        }
    }

    /// Structural check of adaptations against the target conventions
    #[must_use]
    pub fn pattern_compliance(&self, adaptations: &[Adaptation]) -> PatternCompliance {
        let issues: Vec<String> = adaptations
            .iter()
            .filter(|a| !a.is_removal())
            .flat_map(|a| {
                pattern_issues(a)
                    .into_iter()
                    .map(move |issue| format!("{}: {issue}", a.file_path))
            })
            .collect();
        #[allow(clippy::cast_precision_loss)]
        let score = (1.0 - PATTERN_ISSUE_PENALTY * issues.len() as f64).max(0.0);
        PatternCompliance {
            compliant: issues.is_empty(),
            issues,
            score,
        }
    }
}

fn evaluate(rule: &Rule, input: &RuleInput<'_>) -> ValidationResult {
    let (outcome, message, recommendations) = match rule.evaluate(input) {
        Ok(Assessment::Scored { score, .. }) if !score.is_finite() => {
            warn!(rule = %rule.code, score, "Rule produced a non-finite score");
            (
                RuleOutcome::Evaluated(0.0),
                format!("Validation error: non-finite score {score}"),
                vec!["Manual validation required".to_string()],
            )
        }
        Ok(Assessment::Scored {
            score,
            message,
            recommendations,
        }) => {
            let score = score.clamp(0.0, 1.0);
            let message = message.unwrap_or_else(|| {
                if score >= VIOLATION_THRESHOLD {
                    "Compliant".to_string()
                } else {
                    "Non-compliant".to_string()
                }
            });
            (RuleOutcome::Evaluated(score), message, recommendations)
        }
        Ok(Assessment::NotEvaluated {
            reason,
            recommendations,
        }) => (RuleOutcome::NotEvaluated, reason, recommendations),
        Err(e) => {
            warn!(rule = %rule.code, error = %e, "Rule evaluation failed");
            (
                RuleOutcome::Evaluated(0.0),
                format!("Validation error: {e}"),
                vec!["Manual validation required".to_string()],
            )
        }
    };
    ValidationResult {
        rule_id: rule.id,
        rule_code: rule.code.clone(),
        outcome,
        message,
        recommendations,
    }
}

fn rule_stats(rule: &Rule, history: &[CommitValidation]) -> RuleStats {
    let results: Vec<ValidationResult> = history
        .iter()
        .filter_map(|v| v.result(&rule.code).cloned())
        .collect();
    RuleStats {
        rule_id: rule.id,
        rule_code: rule.code.clone(),
        name: rule.name.clone(),
        category: rule.category,
        compliance: mean_score(&results),
        validations: results.len(),
        not_evaluated: results.iter().filter(|r| r.is_not_evaluated()).count(),
        violations: results.iter().filter(|r| r.severity().is_some()).count(),
    }
}

fn pattern_issues(adaptation: &Adaptation) -> Vec<&'static str> {
    let content = adaptation.content();
    let mut issues = Vec::new();
    match adaptation.component_kind {
        ComponentKind::Module => {
            if !content.contains("@Component") {
                issues.push("Missing @Component annotation - violates module pattern");
            }
            if !MODULE_PARENTS
                .iter()
                .any(|parent| content.contains(&format!("extends {parent}")))
            {
                issues.push(
                    "Incorrect inheritance - should extend AbstractModule or AbstractUtilModuleGroup",
                );
            }
        }
        ComponentKind::DataLoader => {
            if !content.contains("class") || !content.contains("LoadApi") {
                issues.push("LoadAPI class should inherit from LoadApi base class");
            }
            if !content.contains("MASTER_HEADER") {
                issues.push("Missing MASTER_HEADER definition - required for LoadAPI pattern");
            }
            if !content.contains("def validate_row") {
                issues.push("Missing validate_row method - required for LoadAPI validation");
            }
        }
        ComponentKind::QueryView if adaptation.file_path.ends_with(".sql") => {
            if !content.contains("OPENROWSET") {
                issues.push("SQL view should use OPENROWSET for data access");
            }
            if !content.contains("WITH") {
                issues.push("Missing WITH clause - should define column structure");
            }
        }
        _ => {}
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RuleResult, ValidationError};
    use crate::result::ViolationSeverity;
    use porter_model::{CommitCategory, DomainType};
    use pretty_assertions::assert_eq;

    fn context() -> ValidationContext {
        ValidationContext::new("algo", DomainType::JavaAlgorithm, "feature", "develop")
            .with_base_branches(vec!["develop".into()])
    }

    fn module(content: &str) -> Adaptation {
        Adaptation::new("src/StoreModule.java", ComponentKind::Module, Some(content.into()))
    }

    const GOOD_MODULE: &str = "/** Store */\n@Component\npublic class StoreModule extends AbstractModule {\n    private static final int N = 1;\n}";

    #[test]
    fn overall_is_mean_of_evaluated_rules() {
        let framework = ValidationFramework::with_builtin_rules();
        let commit = Commit::new("abc1234", "Add store module", CommitCategory::FeatureAddition);
        let validation = framework.validate(&commit, &[module(GOOD_MODULE)], &context());

        assert_eq!(validation.results.len(), framework.catalog().len());
        let evaluated: Vec<f64> = validation.results.iter().filter_map(ValidationResult::score).collect();
        let mean = evaluated.iter().sum::<f64>() / evaluated.len() as f64;
        assert!((validation.overall_compliance.unwrap() - mean).abs() < 1e-6);
        assert!(validation.violations.is_empty());
        // only module creation, branch and utility class rules apply to one module
        assert_eq!(evaluated.len(), 3);
        assert_eq!(validation.not_evaluated().count(), 13);
    }

    #[test]
    fn broken_module_is_high_violation() {
        let framework = ValidationFramework::with_builtin_rules();
        let commit = Commit::new("abc1234", "Add store module", CommitCategory::FeatureAddition);
        let validation = framework.validate(&commit, &[module("public class StoreModule {}")], &context());

        let violation = validation.violation("new_module_creation").unwrap();
        assert_eq!(violation.severity, ViolationSeverity::High);
        assert!(validation.has_high_violation());
    }

    fn failing(_: &RuleInput<'_>) -> RuleResult<Assessment> {
        Err(ValidationError::rule_failed("exploding", "boom"))
    }

    #[test]
    fn rule_errors_score_zero() {
        let mut catalog = RuleCatalog::new();
        catalog.register(Rule::new(99, "exploding", "Exploding", &[], failing)).unwrap();
        let framework = ValidationFramework::new(catalog);
        let commit = Commit::new("abc1234", "m", CommitCategory::CodeChange);
        let validation = framework.validate(&commit, &[], &context());

        let result = validation.result("exploding").unwrap();
        assert_eq!(result.score(), Some(0.0));
        assert!(result.message.starts_with("Validation error:"));
        assert_eq!(result.recommendations, vec!["Manual validation required".to_string()]);
    }

    #[test]
    fn report_aggregates_history() {
        let framework = ValidationFramework::with_builtin_rules();
        for (hash, content) in [("a1", "public class A {}"), ("b2", "public class B {}"), ("c3", GOOD_MODULE)] {
            let commit = Commit::new(hash, "m", CommitCategory::CodeChange);
            framework.validate(&commit, &[module(content)], &context());
        }
        let report = framework.report();

        assert_eq!(report.total_validations, 3);
        assert_eq!(report.validations.len(), 3);
        assert_eq!(report.most_common_violations[0].rule_code, "new_module_creation");
        assert_eq!(report.most_common_violations[0].count, 2);
        assert!(report.most_common_violations.len() <= TOP_VIOLATIONS);
        assert!(report.violations_by_category.contains_key("Core Implementation"));

        let stats = report.rules.iter().find(|r| r.rule_code == "new_module_creation").unwrap();
        assert_eq!((stats.validations, stats.violations), (3, 2));
        let process = report.rules.iter().find(|r| r.rule_code == "testing_framework").unwrap();
        assert_eq!((process.compliance, process.not_evaluated), (None, 3));

        let unique: IndexSet<&String> = report.recommendations.iter().collect();
        assert_eq!(unique.len(), report.recommendations.len());
    }

    #[test]
    fn pattern_compliance_per_issue() {
        let framework = ValidationFramework::default();
        let adaptations = vec![
            module("public class StoreModule {}"),
            Adaptation::new("views/store.sql", ComponentKind::QueryView, Some("SELECT 1".into())),
            Adaptation::removal("old/Gone.java"),
        ];
        let check = framework.pattern_compliance(&adaptations);
        assert!(!check.compliant);
        assert_eq!(check.issues.len(), 4);
        assert!((check.score - 0.6).abs() < 1e-9);
        assert!(check.issues[0].starts_with("src/StoreModule.java: "));
    }

    #[test]
    fn pattern_compliance_floors_at_zero() {
        let framework = ValidationFramework::default();
        let loaders: Vec<Adaptation> = (0..5)
            .map(|i| Adaptation::new(format!("l/{i}.py"), ComponentKind::DataLoader, Some(String::new())))
            .collect();
        let check = framework.pattern_compliance(&loaders);
        assert_eq!(check.issues.len(), 15);
        assert!(check.score.abs() < f64::EPSILON);
    }
}
