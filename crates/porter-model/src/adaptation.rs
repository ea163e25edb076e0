//! Per-file adaptation output: proposed content, change notes and conflicts

use crate::domain::{ComponentKind, DomainType};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique conflict identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConflictId(pub Ulid);

impl ConflictId {
    /// Generate new conflict ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ConflictId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Level of an advisory change note
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NoteLevel {
    /// A fix that was applied automatically
    Applied,
    /// Informational hint
    Note,
    /// Divergence needing attention; adaptation proceeded best-effort
    Warning,
    /// Content could not be interpreted
    Error,
}

/// Advisory or warning string attached to an adaptation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNote {
    /// Note level
    pub level: NoteLevel,
    /// Note text
    pub text: String,
}

impl ChangeNote {
    /// Applied fix
    #[must_use]
    pub fn applied(text: impl Into<String>) -> Self {
        Self { level: NoteLevel::Applied, text: text.into() }
    }

    /// Informational note
    #[must_use]
    pub fn note(text: impl Into<String>) -> Self {
        Self { level: NoteLevel::Note, text: text.into() }
    }

    /// Warning
    #[must_use]
    pub fn warning(text: impl Into<String>) -> Self {
        Self { level: NoteLevel::Warning, text: text.into() }
    }

    /// Error
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self { level: NoteLevel::Error, text: text.into() }
    }
}

impl fmt::Display for ChangeNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            NoteLevel::Applied => f.write_str(&self.text),
            NoteLevel::Note => write!(f, "NOTE: {}", self.text),
            NoteLevel::Warning => write!(f, "WARNING: {}", self.text),
            NoteLevel::Error => write!(f, "ERROR: {}", self.text),
        }
    }
}

/// Conflict severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Localized divergence
    Medium,
    /// Affects several files or blocks the migration
    High,
    /// Breaks the target outright
    Critical,
}

impl Severity {
    /// Assess severity from conflict traits
    ///
    /// Critical wins; multi-file or blocking conflicts are high; anything
    /// else is medium.
    #[inline]
    #[must_use]
    pub const fn assess(critical: bool, affects_multiple_files: bool, blocks_migration: bool) -> Self {
        if critical {
            Self::Critical
        } else if affects_multiple_files || blocks_migration {
            Self::High
        } else {
            Self::Medium
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        })
    }
}

/// How many files a conflict touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictScope {
    /// One file
    SingleFile,
    /// A handful of files
    MultiFile,
    /// More than [`ConflictScope::BROAD_THRESHOLD`] files
    Broad,
}

impl ConflictScope {
    /// File count above which a conflict is broad
    pub const BROAD_THRESHOLD: usize = 5;

    /// Scope from number of affected files
    #[inline]
    #[must_use]
    pub const fn from_file_count(count: usize) -> Self {
        if count > Self::BROAD_THRESHOLD {
            Self::Broad
        } else if count > 1 {
            Self::MultiFile
        } else {
            Self::SingleFile
        }
    }
}

/// Kind of adaptation conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Structure diverges from the target convention (e.g. wrong base type)
    PatternMismatch,
    /// Component is not registered where the target expects it
    MissingRegistration,
    /// A mandatory method or declaration has no safe default
    MissingRequiredMember,
    /// Header or column list disagrees with its counterpart
    HeaderMismatch,
    /// Content cannot be parsed
    InvalidStructure,
}

impl ConflictType {
    /// Snake-case label
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PatternMismatch => "pattern_mismatch",
            Self::MissingRegistration => "missing_registration",
            Self::MissingRequiredMember => "missing_required_member",
            Self::HeaderMismatch => "header_mismatch",
            Self::InvalidStructure => "invalid_structure",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An adaptation the engine cannot decide unambiguously
///
/// Owned by exactly one [`Adaptation`] and closed by exactly one resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Unique ID
    pub id: ConflictId,
    /// Conflict kind
    pub conflict_type: ConflictType,
    /// Severity
    pub severity: Severity,
    /// Repository domain
    pub domain: DomainType,
    /// File whose adaptation raised the conflict
    pub file_path: String,
    /// Every file involved (the conflicting file first)
    pub files: Vec<String>,
    /// Named patterns affected (`module_registration`, `sql_view_pattern`, ...)
    pub affected_patterns: Vec<String>,
    /// What is wrong
    pub description: String,
}

impl Conflict {
    /// Create a conflict for one file, assessing severity from its traits
    #[must_use]
    pub fn new(
        conflict_type: ConflictType,
        domain: DomainType,
        file_path: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let file_path = file_path.into();
        let affected_patterns = Self::patterns_for(&file_path);
        Self {
            id: ConflictId::new(),
            conflict_type,
            severity: Severity::Medium,
            domain,
            files: vec![file_path.clone()],
            file_path,
            affected_patterns,
            description: description.into(),
        }
    }

    /// Mark as critical
    #[inline]
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.severity = Severity::Critical;
        self
    }

    /// Mark as blocking the migration
    #[inline]
    #[must_use]
    pub fn blocking(mut self) -> Self {
        self.severity = self.severity.max(Severity::assess(false, false, true));
        self
    }

    /// Add related files; severity rises to high when several files are involved
    #[must_use]
    pub fn with_related_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        for file in files {
            if !self.files.contains(&file) {
                self.files.push(file);
            }
        }
        let multi = self.files.len() > 1;
        self.severity = self
            .severity
            .max(Severity::assess(false, multi, false));
        self
    }

    /// Scope derived from affected files
    #[inline]
    #[must_use]
    pub fn scope(&self) -> ConflictScope {
        ConflictScope::from_file_count(self.files.len())
    }

    /// Named patterns a file path participates in
    #[must_use]
    pub fn patterns_for(path: &str) -> Vec<String> {
        let mut patterns = Vec::new();
        if path.contains("Module") {
            patterns.push("module_registration".to_string());
        }
        if path.contains("LoadApi") {
            patterns.push("loadapi_pattern".to_string());
        }
        if path.ends_with(".sql") {
            patterns.push("sql_view_pattern".to_string());
        }
        if path.ends_with(".json") {
            patterns.push("config_pattern".to_string());
        }
        if path.ends_with(".tsv") {
            patterns.push("template_header_pattern".to_string());
        }
        patterns
    }
}

/// Adapted form of one changed file of one commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adaptation {
    /// Path relative to the repository root
    pub file_path: String,
    /// Structural role of the file
    pub component_kind: ComponentKind,
    /// Content to write; `None` removes the file
    pub proposed_content: Option<String>,
    /// Advisory and warning notes
    pub change_notes: Vec<ChangeNote>,
    /// Undecidable divergences escalated to experts
    pub conflicts: Vec<Conflict>,
}

impl Adaptation {
    /// Adaptation carrying content with no notes
    #[must_use]
    pub fn new(
        file_path: impl Into<String>,
        component_kind: ComponentKind,
        proposed_content: Option<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            component_kind,
            proposed_content,
            change_notes: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// File removal
    #[must_use]
    pub fn removal(file_path: impl Into<String>) -> Self {
        Self::new(file_path, ComponentKind::NoAdaptation, None)
    }

    /// Whether the file is removed
    #[inline]
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.proposed_content.is_none()
    }

    /// Whether proposed content contains a needle
    #[inline]
    #[must_use]
    pub fn content_contains(&self, needle: &str) -> bool {
        self.proposed_content
            .as_deref()
            .is_some_and(|c| c.contains(needle))
    }

    /// Proposed content or empty string
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        self.proposed_content.as_deref().unwrap_or_default()
    }

    /// Whether any warning or error note is attached
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.change_notes
            .iter()
            .any(|n| matches!(n.level, NoteLevel::Warning | NoteLevel::Error))
    }

    /// File name without directories
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.file_path.rsplit('/').next().unwrap_or(&self.file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_assessment_order() {
        assert_eq!(Severity::assess(true, true, true), Severity::Critical);
        assert_eq!(Severity::assess(false, true, false), Severity::High);
        assert_eq!(Severity::assess(false, false, true), Severity::High);
        assert_eq!(Severity::assess(false, false, false), Severity::Medium);
    }

    #[test]
    fn scope_thresholds() {
        assert_eq!(ConflictScope::from_file_count(1), ConflictScope::SingleFile);
        assert_eq!(ConflictScope::from_file_count(2), ConflictScope::MultiFile);
        assert_eq!(ConflictScope::from_file_count(5), ConflictScope::MultiFile);
        assert_eq!(ConflictScope::from_file_count(6), ConflictScope::Broad);
    }

    #[test]
    fn related_files_raise_severity() {
        let conflict = Conflict::new(
            ConflictType::MissingRegistration,
            DomainType::JavaAlgorithm,
            "src/NewModule.java",
            "not registered",
        );
        assert_eq!(conflict.severity, Severity::Medium);
        assert_eq!(conflict.affected_patterns, vec!["module_registration"]);

        let conflict = conflict.with_related_files(vec!["src/GroupModule.java".to_string()]);
        assert_eq!(conflict.severity, Severity::High);
        assert_eq!(conflict.scope(), ConflictScope::MultiFile);
    }

    #[test]
    fn critical_is_not_lowered_by_related_files() {
        let conflict = Conflict::new(
            ConflictType::InvalidStructure,
            DomainType::SqlConfig,
            "config/module_input.json",
            "invalid json",
        )
        .critical()
        .with_related_files(vec!["a".into(), "b".into()]);
        assert_eq!(conflict.severity, Severity::Critical);
        assert_eq!(conflict.affected_patterns, vec!["config_pattern"]);
    }

    #[test]
    fn note_display_prefixes() {
        assert_eq!(ChangeNote::warning("x").to_string(), "WARNING: x");
        assert_eq!(ChangeNote::note("y").to_string(), "NOTE: y");
        assert_eq!(ChangeNote::applied("z").to_string(), "z");
    }

    #[test]
    fn removal_has_no_content() {
        let adaptation = Adaptation::removal("docs/old.md");
        assert!(adaptation.is_removal());
        assert_eq!(adaptation.content(), "");
        assert_eq!(adaptation.file_name(), "old.md");
    }
}
