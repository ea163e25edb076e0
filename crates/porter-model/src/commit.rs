//! Commits selected for migration and their coarse categories

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse commit category assigned during discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitCategory {
    /// Message mentions a fix, bug or error
    BugFix,
    /// Message mentions adding or creating something new
    FeatureAddition,
    /// Only structured-data or configuration files changed
    ConfigUpdate,
    /// Message mentions an update, upgrade or version bump
    DependencyUpdate,
    /// Only documentation files changed
    DocUpdate,
    /// Default category
    CodeChange,
}

impl CommitCategory {
    /// All categories in declaration order
    pub const ALL: [Self; 6] = [
        Self::BugFix,
        Self::FeatureAddition,
        Self::ConfigUpdate,
        Self::DependencyUpdate,
        Self::DocUpdate,
        Self::CodeChange,
    ];

    /// Human readable label
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BugFix => "Bug Fix",
            Self::FeatureAddition => "Feature Addition",
            Self::ConfigUpdate => "Configuration Update",
            Self::DependencyUpdate => "Dependency Update",
            Self::DocUpdate => "Documentation Update",
            Self::CodeChange => "Code Change",
        }
    }

    /// Migration risk associated with this category
    #[inline]
    #[must_use]
    pub const fn risk(self) -> RiskLevel {
        match self {
            Self::DocUpdate | Self::ConfigUpdate => RiskLevel::Low,
            Self::BugFix | Self::DependencyUpdate => RiskLevel::Medium,
            Self::FeatureAddition | Self::CodeChange => RiskLevel::High,
        }
    }
}

impl fmt::Display for CommitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Risk of replaying a commit onto another line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Documentation and configuration
    Low,
    /// Bug fixes and dependency changes
    Medium,
    /// New features and general code changes
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        })
    }
}

/// A commit present on the source line but absent from the target line
///
/// The hash is the natural key. Category is assigned once at discovery and
/// never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit hash as reported by version control
    pub hash: String,
    /// Subject line
    pub message: String,
    /// Category assigned during discovery
    pub category: CommitCategory,
    /// Changed paths in version-control order
    pub files_changed: Vec<String>,
    /// Short description of the business change
    pub business_logic_summary: String,
}

impl Commit {
    /// Create a commit with no changed files
    #[must_use]
    pub fn new(
        hash: impl Into<String>,
        message: impl Into<String>,
        category: CommitCategory,
    ) -> Self {
        Self {
            hash: hash.into(),
            message: message.into(),
            category,
            files_changed: Vec::new(),
            business_logic_summary: String::new(),
        }
    }

    /// With changed files
    #[inline]
    #[must_use]
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files_changed = files;
        self
    }

    /// With business logic summary
    #[inline]
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.business_logic_summary = summary.into();
        self
    }

    /// Abbreviated hash for log lines
    #[inline]
    #[must_use]
    pub fn short_hash(&self) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(8)
            .map_or(self.hash.len(), |(i, _)| i);
        &self.hash[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_levels_follow_category() {
        assert_eq!(CommitCategory::DocUpdate.risk(), RiskLevel::Low);
        assert_eq!(CommitCategory::ConfigUpdate.risk(), RiskLevel::Low);
        assert_eq!(CommitCategory::BugFix.risk(), RiskLevel::Medium);
        assert_eq!(CommitCategory::DependencyUpdate.risk(), RiskLevel::Medium);
        assert_eq!(CommitCategory::FeatureAddition.risk(), RiskLevel::High);
        assert_eq!(CommitCategory::CodeChange.risk(), RiskLevel::High);
    }

    #[test]
    fn short_hash_truncates() {
        let commit = Commit::new("0123456789abcdef", "msg", CommitCategory::CodeChange);
        assert_eq!(commit.short_hash(), "01234567");

        let short = Commit::new("abc", "msg", CommitCategory::CodeChange);
        assert_eq!(short.short_hash(), "abc");
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&CommitCategory::FeatureAddition).unwrap();
        assert_eq!(json, "\"feature_addition\"");
    }
}
