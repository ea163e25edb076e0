//! Per-rule and per-commit validation results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores below this are violations
pub const VIOLATION_THRESHOLD: f64 = 0.8;

/// Violations scoring below this are high severity
pub const HIGH_SEVERITY_THRESHOLD: f64 = 0.5;

/// Outcome of one rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "score", rename_all = "snake_case")]
pub enum RuleOutcome {
    /// Scored in [0, 1]
    Evaluated(f64),
    /// The rule could not be automated; excluded from aggregates
    NotEvaluated,
}

/// Violation severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationSeverity {
    /// Score in [0.5, 0.8)
    Medium,
    /// Score below 0.5
    High,
}

impl ViolationSeverity {
    /// Severity for a score, `None` when compliant
    #[must_use]
    pub fn for_score(score: f64) -> Option<Self> {
        if score >= VIOLATION_THRESHOLD {
            None
        } else if score < HIGH_SEVERITY_THRESHOLD {
            Some(Self::High)
        } else {
            Some(Self::Medium)
        }
    }
}

impl fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Result of one rule for one commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Rule number
    pub rule_id: u16,
    /// Rule code
    pub rule_code: String,
    /// Score or not-evaluated marker
    pub outcome: RuleOutcome,
    /// Summary message
    pub message: String,
    /// Suggested follow-ups
    pub recommendations: Vec<String>,
}

impl ValidationResult {
    /// Compliance score, if evaluated
    #[inline]
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        match self.outcome {
            RuleOutcome::Evaluated(score) => Some(score),
            RuleOutcome::NotEvaluated => None,
        }
    }

    /// Rule was not evaluated
    #[inline]
    #[must_use]
    pub fn is_not_evaluated(&self) -> bool {
        matches!(self.outcome, RuleOutcome::NotEvaluated)
    }

    /// Violation severity, if this result is a violation
    #[must_use]
    pub fn severity(&self) -> Option<ViolationSeverity> {
        self.score().and_then(ViolationSeverity::for_score)
    }
}

/// A rule scoring below the violation threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule number
    pub rule_id: u16,
    /// Rule code
    pub rule_code: String,
    /// Severity
    pub severity: ViolationSeverity,
    /// Score that triggered it
    pub score: f64,
    /// Rule message
    pub message: String,
    /// Rule recommendations
    pub recommendations: Vec<String>,
}

/// All rule results for one commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitValidation {
    /// Commit hash
    pub commit: String,
    /// One result per rule, in catalog order
    pub results: Vec<ValidationResult>,
    /// Mean of evaluated scores; `None` when nothing was evaluated
    pub overall_compliance: Option<f64>,
    /// Results below the violation threshold
    pub violations: Vec<Violation>,
    /// Recommendations from every result, deduplicated in order
    pub recommendations: Vec<String>,
}

impl CommitValidation {
    /// Any high-severity violation
    #[must_use]
    pub fn has_high_violation(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::High)
    }

    /// Result for a rule code
    #[must_use]
    pub fn result(&self, code: &str) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.rule_code == code)
    }

    /// Violation for a rule code
    #[must_use]
    pub fn violation(&self, code: &str) -> Option<&Violation> {
        self.violations.iter().find(|v| v.rule_code == code)
    }

    /// Rules reported as not evaluated
    pub fn not_evaluated(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| r.is_not_evaluated())
    }
}

/// Mean of the evaluated scores
#[must_use]
pub fn mean_score(results: &[ValidationResult]) -> Option<f64> {
    let scores: Vec<f64> = results.iter().filter_map(ValidationResult::score).collect();
    if scores.is_empty() {
        None
    } else {
        #[allow(clippy::cast_precision_loss)]
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(code: &str, outcome: RuleOutcome) -> ValidationResult {
        ValidationResult {
            rule_id: 1,
            rule_code: code.to_string(),
            outcome,
            message: String::new(),
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn severity_boundaries() {
        assert_eq!(ViolationSeverity::for_score(0.8), None);
        assert_eq!(ViolationSeverity::for_score(0.79), Some(ViolationSeverity::Medium));
        assert_eq!(ViolationSeverity::for_score(0.5), Some(ViolationSeverity::Medium));
        assert_eq!(ViolationSeverity::for_score(0.49), Some(ViolationSeverity::High));
    }

    #[test]
    fn mean_skips_not_evaluated() {
        let results = vec![
            result("a", RuleOutcome::Evaluated(1.0)),
            result("b", RuleOutcome::NotEvaluated),
            result("c", RuleOutcome::Evaluated(0.5)),
        ];
        assert!((mean_score(&results).unwrap() - 0.75).abs() < 1e-9);
        assert_eq!(mean_score(&results[1..2]), None);
    }
}
