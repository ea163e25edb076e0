//! Rule definitions, inputs and assessments

use crate::error::RuleResult;
use porter_model::{Adaptation, Commit, ComponentKind, DomainType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Rule families, derived from the rule number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RuleCategory {
    /// Rules 1-10
    CoreImplementation,
    /// Rules 11-15
    RepositoryCoordination,
    /// Rules 16-20
    PatternManagement,
    /// Rules 21-22
    ErrorHandlingAndTesting,
    /// Rule 23
    DocumentationAndRelease,
    /// Rule 24
    DevelopmentFlow,
    /// Rules 25-34
    ClassManagement,
    /// Rules 35-43
    AdvancedPatterns,
    /// Rule 44
    CriticalMissingPattern,
    /// Rule 45
    PostDeploymentParameter,
    /// Anything else
    Other,
}

impl RuleCategory {
    /// Category for a rule number
    #[must_use]
    pub const fn from_id(id: u16) -> Self {
        match id {
            1..=10 => Self::CoreImplementation,
            11..=15 => Self::RepositoryCoordination,
            16..=20 => Self::PatternManagement,
            21..=22 => Self::ErrorHandlingAndTesting,
            23 => Self::DocumentationAndRelease,
            24 => Self::DevelopmentFlow,
            25..=34 => Self::ClassManagement,
            35..=43 => Self::AdvancedPatterns,
            44 => Self::CriticalMissingPattern,
            45 => Self::PostDeploymentParameter,
            _ => Self::Other,
        }
    }

    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CoreImplementation => "Core Implementation",
            Self::RepositoryCoordination => "Repository Coordination",
            Self::PatternManagement => "Pattern Management",
            Self::ErrorHandlingAndTesting => "Error Handling & Testing",
            Self::DocumentationAndRelease => "Documentation & Release Management",
            Self::DevelopmentFlow => "Complete Development Flow",
            Self::ClassManagement => "Class Management",
            Self::AdvancedPatterns => "Advanced Patterns",
            Self::CriticalMissingPattern => "Critical Missing Pattern",
            Self::PostDeploymentParameter => "Post Deployment Parameter",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Run facts rules may consult
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationContext {
    /// Repository identifier
    pub repository_id: String,
    /// Repository domain
    pub domain: DomainType,
    /// Branch commits come from
    pub source_branch: String,
    /// Branch commits go to
    pub target_branch: String,
    /// Configured base branches across environments
    pub base_branches: Vec<String>,
}

impl ValidationContext {
    /// Create context
    #[must_use]
    pub fn new(
        repository_id: impl Into<String>,
        domain: DomainType,
        source_branch: impl Into<String>,
        target_branch: impl Into<String>,
    ) -> Self {
        Self {
            repository_id: repository_id.into(),
            domain,
            source_branch: source_branch.into(),
            target_branch: target_branch.into(),
            base_branches: Vec::new(),
        }
    }

    /// Set base branches
    #[inline]
    #[must_use]
    pub fn with_base_branches(mut self, branches: Vec<String>) -> Self {
        self.base_branches = branches;
        self
    }
}

/// Everything a rule sees
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    /// Commit being validated
    pub commit: &'a Commit,
    /// All of its adaptations
    pub adaptations: &'a [Adaptation],
    /// Run context
    pub context: &'a ValidationContext,
}

impl<'a> RuleInput<'a> {
    /// Create input
    #[must_use]
    pub fn new(
        commit: &'a Commit,
        adaptations: &'a [Adaptation],
        context: &'a ValidationContext,
    ) -> Self {
        Self {
            commit,
            adaptations,
            context,
        }
    }

    /// Adaptations of one kind that carry content
    pub fn of_kind(&self, kind: ComponentKind) -> impl Iterator<Item = &'a Adaptation> {
        self.adaptations
            .iter()
            .filter(move |a| a.component_kind == kind && !a.is_removal())
    }

    /// Whether any adaptation of this kind exists
    #[must_use]
    pub fn has_kind(&self, kind: ComponentKind) -> bool {
        self.of_kind(kind).next().is_some()
    }

    /// Whether every adaptation of this kind satisfies a predicate
    pub fn all_of_kind(&self, kind: ComponentKind, predicate: impl Fn(&str) -> bool) -> bool {
        self.of_kind(kind).all(|a| predicate(a.content()))
    }

    /// Whether any adaptation's content contains any of the needles
    #[must_use]
    pub fn any_content_contains(&self, needles: &[&str]) -> bool {
        self.adaptations
            .iter()
            .any(|a| needles.iter().any(|n| a.content_contains(n)))
    }
}

/// A rule's verdict before it is turned into a result
#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    /// Scored in [0, 1]
    Scored {
        /// Compliance score
        score: f64,
        /// Message for the lowest penalty applied
        message: Option<String>,
        /// Everything the rule suggests
        recommendations: Vec<String>,
    },
    /// The rule cannot be automated for this input
    NotEvaluated {
        /// Why
        reason: String,
        /// Manual checks to perform
        recommendations: Vec<String>,
    },
}

impl Assessment {
    /// Full compliance
    #[must_use]
    pub fn compliant() -> Self {
        Self::Scored {
            score: 1.0,
            message: None,
            recommendations: Vec::new(),
        }
    }

    /// Not evaluated, with manual checks
    #[must_use]
    pub fn not_evaluated<I, S>(reason: impl Into<String>, recommendations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::NotEvaluated {
            reason: reason.into(),
            recommendations: recommendations.into_iter().map(Into::into).collect(),
        }
    }

    /// Rule has nothing to check in this commit; kept out of aggregates
    #[must_use]
    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Self::NotEvaluated {
            reason: reason.into(),
            recommendations: Vec::new(),
        }
    }

    /// Apply a penalty; the lowest score and its message win
    #[must_use]
    pub fn penalize(mut self, score: f64, message: Option<&str>, recommendation: &str) -> Self {
        if let Self::Scored {
            score: current,
            message: current_message,
            recommendations,
        } = &mut self
        {
            // NaN penalizes fully
            let score = if score.is_nan() { 0.0 } else { score };
            if score < *current {
                *current = score;
                if let Some(m) = message {
                    *current_message = Some(m.to_string());
                }
            }
            recommendations.push(recommendation.to_string());
        }
        self
    }

    /// Score, if evaluated
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Scored { score, .. } => Some(*score),
            Self::NotEvaluated { .. } => None,
        }
    }
}

/// A rule's checking logic
///
/// Validators must be pure and read-only; the engine runs them concurrently.
pub trait RuleValidator: Send + Sync {
    /// Evaluate one commit
    ///
    /// # Errors
    ///
    /// Returns an error when the input cannot be evaluated; the engine
    /// records it as a zero score requiring manual validation.
    fn validate(&self, input: &RuleInput<'_>) -> RuleResult<Assessment>;
}

impl<F> RuleValidator for F
where
    F: Fn(&RuleInput<'_>) -> RuleResult<Assessment> + Send + Sync,
{
    fn validate(&self, input: &RuleInput<'_>) -> RuleResult<Assessment> {
        self(input)
    }
}

/// A named compliance rule
#[derive(Clone)]
pub struct Rule {
    /// Rule number
    pub id: u16,
    /// Stable code (`new_input_integration`, ...)
    pub code: String,
    /// Display name
    pub name: String,
    /// What the rule requires
    pub requirements: Vec<String>,
    /// Family
    pub category: RuleCategory,
    validator: Arc<dyn RuleValidator>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("code", &self.code)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

impl Rule {
    /// Create rule; the category follows from the id
    #[must_use]
    pub fn new<V>(
        id: u16,
        code: impl Into<String>,
        name: impl Into<String>,
        requirements: &[&str],
        validator: V,
    ) -> Self
    where
        V: RuleValidator + 'static,
    {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            requirements: requirements.iter().map(ToString::to_string).collect(),
            category: RuleCategory::from_id(id),
            validator: Arc::new(validator),
        }
    }

    /// Run the validator
    ///
    /// # Errors
    ///
    /// Propagates the validator's error.
    pub fn evaluate(&self, input: &RuleInput<'_>) -> RuleResult<Assessment> {
        self.validator.validate(input)
    }
}
