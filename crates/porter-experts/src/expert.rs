//! Domain experts and their recommendations

use crate::error::{ExpertError, ExpertResult};
use crate::knowledge::{extract_rules, parse_knowledge, ExpertKnowledge};
use porter_model::{Conflict, DomainType, ExpertOpinion, LanguageFamily};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Confidence every opinion starts from
pub const BASE_CONFIDENCE: f64 = 0.5;

/// Bonus when the expert's language family matches the conflict's domain
pub const DOMAIN_MATCH_BONUS: f64 = 0.3;

/// Bonus for a specific (longer than [`SPECIFIC_RECOMMENDATION_LEN`]) recommendation
pub const SPECIFICITY_BONUS: f64 = 0.2;

/// Recommendation length above which the specificity bonus applies
pub const SPECIFIC_RECOMMENDATION_LEN: usize = 10;

/// Fixed alternatives offered with every consultation
pub const ALTERNATIVES: [&str; 4] = [
    "Follow source branch patterns exactly",
    "Adapt to target branch patterns with modifications",
    "Create hybrid approach combining both patterns",
    "Defer implementation until pattern conflict is resolved",
];

/// The four built-in experts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpertKind {
    /// Java algorithm repositories
    Algorithm,
    /// Python LoadAPI repositories
    LoadApi,
    /// SQL views, templates and JSON configuration
    Config,
    /// Python MFP repositories
    Mfp,
}

impl ExpertKind {
    /// All experts in load order
    pub const ALL: [Self; 4] = [Self::Algorithm, Self::LoadApi, Self::Config, Self::Mfp];

    /// Short key used in file names
    #[inline]
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Algorithm => "algorithm",
            Self::LoadApi => "loadapi",
            Self::Config => "config",
            Self::Mfp => "mfp",
        }
    }

    /// Display name
    #[inline]
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Algorithm => "Algorithm Pattern Expert",
            Self::LoadApi => "LoadAPI Pattern Expert",
            Self::Config => "Configuration Pattern Expert",
            Self::Mfp => "MFP Pattern Expert",
        }
    }

    /// Language family the expert's recommendations target
    #[inline]
    #[must_use]
    pub const fn family(self) -> LanguageFamily {
        match self {
            Self::Algorithm => LanguageFamily::Java,
            Self::LoadApi | Self::Mfp => LanguageFamily::Python,
            Self::Config => LanguageFamily::Config,
        }
    }

    /// Primary expert for a repository domain
    #[inline]
    #[must_use]
    pub const fn for_domain(domain: DomainType) -> Self {
        match domain {
            DomainType::JavaAlgorithm => Self::Algorithm,
            DomainType::PythonLoadApi => Self::LoadApi,
            DomainType::PythonMfp => Self::Mfp,
            DomainType::SqlConfig => Self::Config,
        }
    }

    /// Knowledge document file name
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}-pattern-expert.md", self.key())
    }
}

impl fmt::Display for ExpertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A named knowledge source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expert {
    /// Which expert this is
    pub kind: ExpertKind,
    /// Display name
    pub name: String,
    /// Bucketed section knowledge
    pub knowledge: ExpertKnowledge,
    /// Numbered rule passages
    pub rules: Vec<String>,
    /// Built from defaults because the document was missing or empty
    pub fallback: bool,
}

impl Expert {
    /// Build from a markdown document
    ///
    /// # Errors
    ///
    /// Returns [`ExpertError::EmptyKnowledge`] when nothing recognisable is found.
    pub fn from_markdown(kind: ExpertKind, path: &Path, content: &str) -> ExpertResult<Self> {
        let knowledge = parse_knowledge(content);
        let rules = extract_rules(content);
        if knowledge.is_empty() && rules.is_empty() {
            return Err(ExpertError::EmptyKnowledge(path.to_path_buf()));
        }
        Ok(Self {
            kind,
            name: kind.display_name().to_string(),
            knowledge,
            rules,
            fallback: false,
        })
    }

    /// Minimal stand-in used when the document cannot be loaded
    #[must_use]
    pub fn fallback(kind: ExpertKind) -> Self {
        let key = kind.key();
        Self {
            kind,
            name: format!("{key} Pattern Expert (Fallback)"),
            knowledge: ExpertKnowledge {
                patterns: vec![format!("{key} repository patterns")],
                rules: vec![format!("Follow {key} best practices")],
                examples: vec![format!("Standard {key} implementation")],
                conflicts: vec![format!("Resolve {key} conflicts according to patterns")],
            },
            rules: vec![format!("Apply {key} repository patterns")],
            fallback: true,
        }
    }

    /// Language family
    #[inline]
    #[must_use]
    pub fn family(&self) -> LanguageFamily {
        self.kind.family()
    }

    /// Recommendation for a conflict, chosen by family and conflicting file
    #[must_use]
    pub fn recommend(&self, conflict: &Conflict) -> String {
        let file = conflict.file_path.as_str();
        let text = match self.family() {
            LanguageFamily::Java => {
                if file.contains("Module") && !file.contains("Validation") {
                    "Register module in ModuleProvider and ensure @Component annotation"
                } else if file.contains("Validation") {
                    "Register validation module in ValidationModuleNames and implement validate() method"
                } else if file.contains("Args") {
                    "Ensure Args class extends Args base class and uses @Autowired injection"
                } else {
                    "Follow Java algorithm patterns: proper inheritance, annotations, and registration"
                }
            }
            LanguageFamily::Python => {
                if file.contains("LoadApi") {
                    "Implement validate_row() and _get_normalized_data() methods, define MASTER_HEADER"
                } else if file.contains("__init__") || file.ends_with("loadapi_provider.py") {
                    "Register LoadAPI in both __init__.py files and loadapi_provider.py"
                } else if file.contains("constant") {
                    "Use UPPER_CASE naming convention for constants and error messages"
                } else {
                    "Follow Python LoadAPI patterns: proper inheritance, validation, and registration"
                }
            }
            LanguageFamily::Config => {
                if file.ends_with(".sql") {
                    "Use OPENROWSET for data access, ensure WITH clause column definitions match template headers"
                } else if file.ends_with(".tsv") {
                    "Ensure template headers match LoadAPI MASTER_HEADER and SQL view columns"
                } else if file.ends_with(".json") {
                    "Update configuration entries when adding new inputs/outputs, maintain import ID consistency"
                } else {
                    "Follow configuration patterns: header consistency, OPENROWSET usage, proper JSON structure"
                }
            }
        };
        text.to_string()
    }

    /// Why the expert recommends what it does
    #[must_use]
    pub fn rationale(&self) -> String {
        format!(
            "Based on {} knowledge of established patterns and best practices in {} repositories",
            self.name,
            self.family()
        )
    }

    /// Confidence for a recommendation on a conflict
    #[must_use]
    pub fn confidence(&self, conflict: &Conflict, recommendation: &str) -> f64 {
        let mut confidence = BASE_CONFIDENCE;
        if self.family() == conflict.domain.family() {
            confidence += DOMAIN_MATCH_BONUS;
        }
        if recommendation.len() > SPECIFIC_RECOMMENDATION_LEN {
            confidence += SPECIFICITY_BONUS;
        }
        confidence.min(1.0)
    }

    /// Produce an opinion on a conflict
    #[must_use]
    pub fn consult(&self, conflict: &Conflict) -> ExpertOpinion {
        let recommendation = self.recommend(conflict);
        let confidence = self.confidence(conflict, &recommendation);
        ExpertOpinion::new(&self.name, recommendation, self.rationale(), confidence)
            .with_alternatives(ALTERNATIVES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_model::ConflictType;

    fn conflict(domain: DomainType, path: &str) -> Conflict {
        Conflict::new(ConflictType::MissingRequiredMember, domain, path, "missing member")
    }

    #[test]
    fn fallback_has_one_item_per_bucket() {
        let expert = Expert::fallback(ExpertKind::Config);
        assert!(expert.fallback);
        assert_eq!(expert.name, "config Pattern Expert (Fallback)");
        assert_eq!(expert.knowledge.len(), 4);
        assert_eq!(expert.rules.len(), 1);
    }

    #[test]
    fn empty_document_is_rejected() {
        let err = Expert::from_markdown(ExpertKind::Mfp, Path::new("mfp.md"), "nothing here\n");
        assert!(matches!(err, Err(ExpertError::EmptyKnowledge(_))));
    }

    #[test]
    fn confidence_bonuses() {
        let java = Expert::fallback(ExpertKind::Algorithm);
        let python = Expert::fallback(ExpertKind::LoadApi);
        let c = conflict(DomainType::PythonLoadApi, "loaders/StoreLoadApi.py");

        assert!((python.consult(&c).confidence - 1.0).abs() < 1e-9);
        assert!((java.consult(&c).confidence - 0.7).abs() < 1e-9);
        assert!((java.confidence(&c, "short") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn recommendations_follow_file() {
        let java = Expert::fallback(ExpertKind::Algorithm);
        let rec = java.recommend(&conflict(DomainType::JavaAlgorithm, "src/StoreValidationModule.java"));
        assert!(rec.contains("ValidationModuleNames"));

        let config = Expert::fallback(ExpertKind::Config);
        let rec = config.recommend(&conflict(DomainType::SqlConfig, "template/store.tsv"));
        assert!(rec.contains("MASTER_HEADER"));
    }

    #[test]
    fn primary_expert_per_domain() {
        assert_eq!(ExpertKind::for_domain(DomainType::PythonMfp), ExpertKind::Mfp);
        assert_eq!(ExpertKind::LoadApi.file_name(), "loadapi-pattern-expert.md");
    }
}
