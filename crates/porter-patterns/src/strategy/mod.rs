//! Pattern strategy trait and shared adaptation helpers
//!
//! Provides the [`PatternStrategy`] trait: one implementation per
//! [`DomainType`], selected through the [`StrategyRegistry`](crate::StrategyRegistry).

use crate::error::PatternResult;
use crate::parser::{ParsedSource, ParserRegistry, SymbolKind};
use crate::tree::SourceTree;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use porter_model::{Adaptation, ComponentKind, DomainType, PatternProfile};
use tracing::{debug, warn};

mod config;
mod java;
mod loadapi;
mod mfp;

pub use config::{ConfigStrategy, OBJECT_CONFIGS};
pub use java::{JavaAlgorithmStrategy, GROUP_PARENT, MODULE_PARENTS, VALIDATION_PARENT};
pub use loadapi::{LoadApiStrategy, NORMALIZE, PROVIDER_FILE, VALIDATE_ROW};
pub use mfp::MfpStrategy;

/// Concurrent file reads during analysis
pub const READ_CONCURRENCY: usize = 16;

/// Everything a strategy needs to adapt one changed file
#[derive(Debug, Clone, Copy)]
pub struct AdaptRequest<'a> {
    /// File content at the migrated commit
    pub content: &'a str,
    /// Parse of `content`
    pub parsed: &'a ParsedSource,
    /// Target branch profile (the adaptation goal)
    pub target: &'a PatternProfile,
    /// Every parsed file changed by the same commit, including this one
    pub commit_files: &'a [ParsedSource],
}

impl<'a> AdaptRequest<'a> {
    /// Create request
    #[must_use]
    pub fn new(
        content: &'a str,
        parsed: &'a ParsedSource,
        target: &'a PatternProfile,
        commit_files: &'a [ParsedSource],
    ) -> Self {
        Self {
            content,
            parsed,
            target,
            commit_files,
        }
    }

    /// Path of the file being adapted
    #[inline]
    #[must_use]
    pub fn path(&self) -> &'a str {
        &self.parsed.path
    }

    /// Primary declared name or file stem
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.parsed
            .structure
            .primary
            .as_deref()
            .unwrap_or_else(|| self.parsed.stem())
    }
}

/// Per-domain pattern analysis and adaptation
///
/// Strategies see files only through [`ParsedSource`]; raw content is used
/// for edits, never to discover structure.
#[async_trait]
pub trait PatternStrategy: Send + Sync + std::fmt::Debug {
    /// Domain handled
    fn domain(&self) -> DomainType;

    /// Parsers used by this strategy
    fn parsers(&self) -> &ParserRegistry;

    /// Whether a path takes part in analysis and adaptation
    fn is_relevant(&self, path: &str) -> bool {
        self.parsers().supports(path)
    }

    /// Structural role of a parsed file
    fn classify(&self, parsed: &ParsedSource) -> ComponentKind;

    /// Adapt one changed file to the target profile
    fn adapt(&self, request: &AdaptRequest<'_>) -> Adaptation;

    /// Follow-up notes for a commit's adaptations
    fn implementation_notes(&self, adaptations: &[Adaptation]) -> Vec<String>;

    /// Parse a file with this strategy's parsers
    ///
    /// # Errors
    ///
    /// Returns the parser error, or `UnsupportedFile` when no parser matches.
    fn parse(&self, path: &str, content: &str) -> PatternResult<ParsedSource> {
        self.parsers().parse(path, content)
    }

    /// Build a profile of a source tree
    ///
    /// File reads run concurrently; results are consumed in path order so
    /// the profile is deterministic.
    ///
    /// # Errors
    ///
    /// Returns an error when the tree cannot be listed or a file cannot be
    /// read. Unparsable files are logged and skipped.
    async fn analyze_patterns(&self, tree: &dyn SourceTree) -> PatternResult<PatternProfile> {
        let files: Vec<String> = tree
            .list_files()
            .await?
            .into_iter()
            .filter(|p| self.is_relevant(p))
            .collect();
        debug!(tree = %tree.label(), candidates = files.len(), "analyzing patterns");

        let reads: Vec<_> = files
            .iter()
            .map(|path| async move { (path, tree.read_file(path).await) })
            .collect();
        let contents: Vec<_> = stream::iter(reads)
            .buffered(READ_CONCURRENCY)
            .collect()
            .await;

        let mut profile = PatternProfile::new(self.domain(), tree.label());
        for (path, content) in contents {
            let Some(content) = content? else {
                continue;
            };
            profile.files_scanned += 1;
            let parsed = match self.parse(path, &content) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(path = %path, error = %e, "skipping unparsable file");
                    continue;
                }
            };
            let kind = self.classify(&parsed);
            if kind.is_adapted() {
                profile.insert(kind, parsed.to_component());
            }
        }

        debug!(
            tree = %tree.label(),
            scanned = profile.files_scanned,
            components = profile.len(),
            "pattern profile built"
        );
        Ok(profile)
    }
}

/// Whether any directory segment of `path` equals `dir`
pub(crate) fn in_dir(path: &str, dir: &str) -> bool {
    let mut segments: Vec<&str> = path.split('/').collect();
    segments.pop();
    segments.contains(&dir)
}

/// File name of a path
pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Insert `line` after the first line satisfying `anchor`, or at the top
pub(crate) fn insert_after(content: &str, anchor: impl Fn(&str) -> bool, line: &str) -> String {
    let mut lines: Vec<&str> = content.lines().collect();
    match lines.iter().position(|l| anchor(l)) {
        Some(idx) => {
            lines.insert(idx + 1, "");
            lines.insert(idx + 2, line);
        }
        None => lines.insert(0, line),
    }
    rejoin(content, &lines)
}

/// Insert `line` before 1-based line `line_no`, matching its indentation
pub(crate) fn insert_before(content: &str, line_no: usize, line: &str) -> String {
    let mut lines: Vec<String> = content.lines().map(ToString::to_string).collect();
    let idx = line_no.saturating_sub(1).min(lines.len());
    let indent: String = lines
        .get(idx)
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).collect())
        .unwrap_or_default();
    lines.insert(idx, format!("{indent}{line}"));
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    rejoin(content, &refs)
}

fn rejoin(original: &str, lines: &[&str]) -> String {
    let mut out = lines.join("\n");
    if original.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Line of the first class declaration
pub(crate) fn class_line(parsed: &ParsedSource) -> Option<usize> {
    parsed.symbols_of(SymbolKind::Class).next().map(|s| s.line)
}

/// Registrations declared by commit files of a kind
pub(crate) fn commit_registrations<'a>(
    strategy: &'a dyn PatternStrategy,
    files: &'a [ParsedSource],
    kind: ComponentKind,
) -> impl Iterator<Item = &'a str> + 'a {
    files
        .iter()
        .filter(move |f| strategy.classify(f) == kind)
        .flat_map(|f| f.structure.registrations.iter().map(String::as_str))
}

/// Standard warning-driven note shared by every strategy
pub(crate) const MANUAL_IMPLEMENTATION_NOTE: &str =
    "Manual implementation required for missing methods or patterns";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::default_parsers;
    use crate::tree::DirectoryTree;
    use tempfile::TempDir;

    #[test]
    fn in_dir_ignores_file_name() {
        assert!(in_dir("algo/args/StoreArgs.java", "args"));
        assert!(!in_dir("algo/args.java", "args"));
        assert!(in_dir("service/forecast.py", "service"));
    }

    #[test]
    fn insert_after_anchor_adds_blank_line() {
        let out = insert_after(
            "package a;\nclass X {}\n",
            |l| l.starts_with("package "),
            "import b;",
        );
        assert_eq!(out, "package a;\n\nimport b;\nclass X {}\n");

        let out = insert_after("class X {}", |l| l.starts_with("package "), "import b;");
        assert_eq!(out, "import b;\nclass X {}");
    }

    #[test]
    fn insert_before_keeps_indentation() {
        let out = insert_before("a\n    class X {}\n", 2, "@Component");
        assert_eq!(out, "a\n    @Component\n    class X {}\n");
    }

    #[tokio::test]
    async fn analyze_skips_irrelevant_and_unclassified_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(
            root.join("src/StoreModule.java"),
            "@Component\npublic class StoreModule extends AbstractModule {}\n",
        )
        .unwrap();
        std::fs::write(root.join("src/Util.java"), "public class Util {}\n").unwrap();
        std::fs::write(root.join("README.md"), "docs").unwrap();

        let strategy = JavaAlgorithmStrategy::new();
        let profile = strategy
            .analyze_patterns(&DirectoryTree::new(root))
            .await
            .unwrap();

        assert_eq!(profile.files_scanned, 2);
        assert_eq!(profile.count(ComponentKind::Module), 1);
        assert_eq!(profile.len(), 1);
        assert!(default_parsers().supports("src/Util.java"));
    }
}
