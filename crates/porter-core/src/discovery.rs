//! Commit discovery and categorization
//!
//! Discovery lists the non-merge commits reachable from the source branch
//! but not from the target, oldest first so the list is the replay order, and enriches each with its
//! changed files, a category and a business-logic summary.
//!
//! Categorization is a pure function of the message and the changed paths.
//! Message keywords win over file heuristics; keywords match the start of a
//! word, so `Fixes` counts as a fix but `prefix` does not.

use crate::error::{MigrationError, MigrationResult};
use porter_model::{Commit, CommitCategory, ComponentKind, RiskLevel};
use porter_patterns::PatternStrategy;
use porter_vcs::VersionControl;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Message keywords per category, checked in order
const MESSAGE_KEYWORDS: [(CommitCategory, &[&str]); 3] = [
    (CommitCategory::BugFix, &["fix", "bug", "error"]),
    (CommitCategory::FeatureAddition, &["add", "new", "create"]),
    (CommitCategory::DependencyUpdate, &["update", "upgrade", "version"]),
];

/// Extensions of structured-data and configuration files
const CONFIG_EXTENSIONS: [&str; 6] = ["sql", "json", "yaml", "yml", "properties", "toml"];

/// Extensions of documentation files
const DOC_EXTENSIONS: [&str; 4] = ["md", "txt", "rst", "adoc"];

/// Message phrases that signal work spanning several repositories
pub const CROSS_REPO_MARKERS: [&str; 4] = [
    "coordinated",
    "cross-repo",
    "multiple repositories",
    "integration",
];

/// Issue code recorded for commits needing cross-repository sync
pub const CROSS_REPO_ISSUE: &str = "cross_repository_sync_required";

fn words(message: &str) -> impl Iterator<Item = String> + '_ {
    message
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit_once('.')
        .map(|(stem, ext)| (stem, ext.to_lowercase()))
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ext)
}

fn is_config_file(path: &str) -> bool {
    extension(path).is_some_and(|ext| CONFIG_EXTENSIONS.contains(&ext.as_str()))
}

fn is_doc_file(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path).to_lowercase();
    name.starts_with("readme")
        || extension(path).is_some_and(|ext| DOC_EXTENSIONS.contains(&ext.as_str()))
}

/// Category of a commit from its message and changed paths
///
/// Message keywords take priority; otherwise a commit touching only
/// configuration files is a config update and one touching only
/// documentation is a doc update.
#[must_use]
pub fn categorize(message: &str, files: &[String]) -> CommitCategory {
    let message_words: Vec<String> = words(message).collect();
    for (category, keywords) in MESSAGE_KEYWORDS {
        if message_words
            .iter()
            .any(|w| keywords.iter().any(|k| w.starts_with(k)))
        {
            return category;
        }
    }

    if files.is_empty() {
        CommitCategory::CodeChange
    } else if files.iter().all(|f| is_config_file(f)) {
        CommitCategory::ConfigUpdate
    } else if files.iter().all(|f| is_doc_file(f)) {
        CommitCategory::DocUpdate
    } else {
        CommitCategory::CodeChange
    }
}

/// One-line description of the business change
#[must_use]
pub fn business_logic_summary(
    message: &str,
    category: CommitCategory,
    kinds: &BTreeSet<ComponentKind>,
) -> String {
    let subject = message.lines().next().unwrap_or_default().trim();
    let touched: Vec<&str> = kinds
        .iter()
        .filter(|k| k.is_adapted())
        .map(|k| k.label())
        .collect();
    if touched.is_empty() {
        format!("{category}: {subject}")
    } else {
        format!("{category}: {subject} (touches {})", touched.join(", "))
    }
}

/// Whether a commit message signals cross-repository work
#[must_use]
pub fn requires_cross_repo_sync(message: &str) -> bool {
    let lower = message.to_lowercase();
    CROSS_REPO_MARKERS.iter().any(|m| lower.contains(m))
}

/// Implementation pattern a commit follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationPattern {
    /// A LoadAPI class together with package registration
    NewInputIntegration,
    /// A new algorithm module
    NewModuleCreation,
    /// A SQL view
    SqlViewCreation,
    /// Anything else
    Standard,
}

impl ImplementationPattern {
    /// Pattern followed by a set of changed paths
    #[must_use]
    pub fn identify(files: &[String]) -> Self {
        let name = |f: &String| f.rsplit('/').next().unwrap_or(f).to_string();
        let loader = files.iter().any(|f| name(f).contains("LoadApi"));
        let init = files.iter().any(|f| name(f) == "__init__.py");
        if loader && init {
            Self::NewInputIntegration
        } else if files
            .iter()
            .any(|f| f.ends_with(".java") && name(f).contains("Module"))
        {
            Self::NewModuleCreation
        } else if files
            .iter()
            .any(|f| f.ends_with(".sql") && f.to_lowercase().contains("view"))
        {
            Self::SqlViewCreation
        } else {
            Self::Standard
        }
    }

    /// Description with the rule it follows
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::NewInputIntegration => "Rule 1: New Input Integration - LoadAPI registration pattern",
            Self::NewModuleCreation => "Rule 3: New Module Creation - Module and Args pattern",
            Self::SqlViewCreation => "Rule 10: SQL Template Rules - View creation pattern",
            Self::Standard => "Standard implementation pattern following repository conventions",
        }
    }
}

impl fmt::Display for ImplementationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Commits per risk level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Low-risk commits
    pub low: usize,
    /// Medium-risk commits
    pub medium: usize,
    /// High-risk commits
    pub high: usize,
}

impl RiskAssessment {
    /// Tally commits by category risk
    #[must_use]
    pub fn of(commits: &[Commit]) -> Self {
        let mut assessment = Self::default();
        for commit in commits {
            match commit.category.risk() {
                RiskLevel::Low => assessment.low += 1,
                RiskLevel::Medium => assessment.medium += 1,
                RiskLevel::High => assessment.high += 1,
            }
        }
        assessment
    }

    /// Overall level: high if high outnumbers medium, medium if medium outnumbers low
    #[must_use]
    pub fn overall(&self) -> RiskLevel {
        if self.high > self.medium {
            RiskLevel::High
        } else if self.medium > self.low {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Discovery output with its derived analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// Discovered commits, oldest first
    pub commits: Vec<Commit>,
    /// Pattern per commit hash, in commit order
    pub patterns: Vec<(String, ImplementationPattern)>,
    /// Risk tally
    pub risk: RiskAssessment,
    /// Hashes of commits that need cross-repository sync
    pub cross_repo: Vec<String>,
}

impl DiscoveryReport {
    /// Analyze discovered commits
    #[must_use]
    pub fn new(commits: Vec<Commit>) -> Self {
        let patterns = commits
            .iter()
            .map(|c| (c.hash.clone(), ImplementationPattern::identify(&c.files_changed)))
            .collect();
        let cross_repo = commits
            .iter()
            .filter(|c| requires_cross_repo_sync(&c.message))
            .map(|c| c.hash.clone())
            .collect();
        Self {
            risk: RiskAssessment::of(&commits),
            commits,
            patterns,
            cross_repo,
        }
    }

    /// Commits per category, in category order
    #[must_use]
    pub fn by_category(&self) -> Vec<(CommitCategory, usize)> {
        CommitCategory::ALL
            .iter()
            .map(|&cat| (cat, self.commits.iter().filter(|c| c.category == cat).count()))
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    /// Recommendations for the analysis document
    #[must_use]
    pub fn recommendations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.risk.high > 0 {
            out.push(format!(
                "{} high-risk commits: review adaptations carefully before merging",
                self.risk.high
            ));
        }
        if self.commits.iter().any(|c| c.category == CommitCategory::FeatureAddition) {
            out.push("New features detected: verify registration in providers and group modules".to_string());
        }
        if self.commits.iter().any(|c| c.category == CommitCategory::ConfigUpdate) {
            out.push("Configuration changes detected: check header consistency across SQL, templates and loaders".to_string());
        }
        if !self.cross_repo.is_empty() {
            out.push("Coordinate with related repositories before merging".to_string());
        }
        out.push("Run the full test suite on the target branch after migration".to_string());
        out
    }
}

/// Finds the commits to migrate
pub struct CommitDiscoverer {
    vcs: Arc<dyn VersionControl>,
    strategy: Option<Arc<dyn PatternStrategy>>,
    fetch: bool,
}

impl fmt::Debug for CommitDiscoverer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitDiscoverer")
            .field("work_dir", &self.vcs.work_dir())
            .field("strategy", &self.strategy.as_ref().map(|s| s.domain()))
            .field("fetch", &self.fetch)
            .finish()
    }
}

impl CommitDiscoverer {
    /// Create discoverer
    #[must_use]
    pub fn new(vcs: Arc<dyn VersionControl>) -> Self {
        Self {
            vcs,
            strategy: None,
            fetch: false,
        }
    }

    /// Classify changed files with a strategy for the business summary
    #[inline]
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn PatternStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Fetch remotes before listing history
    #[inline]
    #[must_use]
    pub fn with_fetch(mut self, fetch: bool) -> Self {
        self.fetch = fetch;
        self
    }

    /// Commits on `source` absent from `target`, oldest first
    ///
    /// # Errors
    ///
    /// Returns a discovery error when any history query fails.
    pub async fn discover(&self, source: &str, target: &str) -> MigrationResult<Vec<Commit>> {
        if self.fetch {
            self.vcs
                .fetch_all()
                .await
                .map_err(|e| MigrationError::discovery("fetching remotes", e))?;
        }

        let entries = self
            .vcs
            .log_range(target, source)
            .await
            .map_err(|e| MigrationError::discovery(format!("listing {target}..{source}"), e))?;

        let mut seen = HashSet::new();
        let mut commits = Vec::with_capacity(entries.len());
        for entry in entries {
            if !seen.insert(entry.hash.clone()) {
                continue;
            }
            let files = self
                .vcs
                .changed_files(&entry.hash)
                .await
                .map_err(|e| MigrationError::discovery(format!("reading files of {}", entry.hash), e))?;
            let category = categorize(&entry.subject, &files);
            let kinds = self.touched_kinds(&entry.hash, &files).await;
            let summary = business_logic_summary(&entry.subject, category, &kinds);
            debug!(commit = %entry.hash, category = %category, files = files.len(), "discovered commit");
            commits.push(
                Commit::new(entry.hash, entry.subject, category)
                    .with_files(files)
                    .with_summary(summary),
            );
        }

        info!(source, target, commits = commits.len(), "commit discovery complete");
        Ok(commits)
    }

    async fn touched_kinds(&self, hash: &str, files: &[String]) -> BTreeSet<ComponentKind> {
        let mut kinds = BTreeSet::new();
        let Some(strategy) = &self.strategy else {
            return kinds;
        };
        for path in files.iter().filter(|p| strategy.is_relevant(p)) {
            match self.vcs.read_file(hash, path).await {
                Ok(Some(content)) => match strategy.parse(path, &content) {
                    Ok(parsed) => {
                        kinds.insert(strategy.classify(&parsed));
                    }
                    Err(e) => debug!(path = %path, error = %e, "not classified"),
                },
                Ok(None) => {}
                Err(e) => debug!(path = %path, error = %e, "not classified"),
            }
        }
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_patterns::JavaAlgorithmStrategy;
    use porter_test_utils::{fixtures, FakeVcs, RepoBuilder};
    use proptest::prelude::*;

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn message_keywords_take_priority() {
        assert_eq!(categorize("Fix null header", &files(&["a.sql"])), CommitCategory::BugFix);
        assert_eq!(categorize("Create price view", &files(&["a.md"])), CommitCategory::FeatureAddition);
        assert_eq!(categorize("Upgrade driver", &files(&["pom.xml"])), CommitCategory::DependencyUpdate);
        assert_eq!(categorize("Fixes #12", &[]), CommitCategory::BugFix);
    }

    #[test]
    fn keywords_match_word_starts_only() {
        assert_eq!(categorize("Rename prefix helper", &files(&["a.java"])), CommitCategory::CodeChange);
    }

    #[test]
    fn file_heuristics_apply_without_keywords() {
        assert_eq!(
            categorize("Tune thresholds", &files(&["sql/view.sql", "config/module_input.json"])),
            CommitCategory::ConfigUpdate
        );
        assert_eq!(categorize("Tidy", &files(&["README", "docs/guide.md"])), CommitCategory::DocUpdate);
        assert_eq!(categorize("Tidy", &files(&["docs/guide.md", "Main.java"])), CommitCategory::CodeChange);
        assert_eq!(categorize("Tidy", &[]), CommitCategory::CodeChange);
    }

    #[test]
    fn implementation_patterns() {
        assert_eq!(
            ImplementationPattern::identify(&files(&["loaders/StoreLoadApi.py", "loaders/__init__.py"])),
            ImplementationPattern::NewInputIntegration
        );
        assert_eq!(
            ImplementationPattern::identify(&files(&["src/PriceModule.java"])),
            ImplementationPattern::NewModuleCreation
        );
        assert_eq!(
            ImplementationPattern::identify(&files(&["sql/views/store_view.sql"])),
            ImplementationPattern::SqlViewCreation
        );
        assert_eq!(ImplementationPattern::identify(&files(&["a.txt"])), ImplementationPattern::Standard);
    }

    #[test]
    fn overall_risk_levels() {
        let commit = |cat| Commit::new("h", "m", cat);
        let high = RiskAssessment::of(&[commit(CommitCategory::FeatureAddition), commit(CommitCategory::BugFix), commit(CommitCategory::CodeChange)]);
        assert_eq!(high.overall(), RiskLevel::High);
        let medium = RiskAssessment::of(&[commit(CommitCategory::BugFix), commit(CommitCategory::FeatureAddition)]);
        assert_eq!(medium.overall(), RiskLevel::Medium);
        let low = RiskAssessment::of(&[commit(CommitCategory::DocUpdate)]);
        assert_eq!(low.overall(), RiskLevel::Low);
    }

    #[test]
    fn cross_repo_markers() {
        assert!(requires_cross_repo_sync("Coordinated release with loaders"));
        assert!(requires_cross_repo_sync("Store INTEGRATION"));
        assert!(!requires_cross_repo_sync("Add price module"));
    }

    #[test]
    fn summary_lists_touched_kinds() {
        let kinds: BTreeSet<_> = [ComponentKind::Module, ComponentKind::NoAdaptation].into_iter().collect();
        assert_eq!(
            business_logic_summary("Add price module\n\nbody", CommitCategory::FeatureAddition, &kinds),
            "Feature Addition: Add price module (touches Module Class)"
        );
        assert_eq!(
            business_logic_summary("Tidy", CommitCategory::CodeChange, &BTreeSet::new()),
            "Code Change: Tidy"
        );
    }

    #[tokio::test]
    async fn discovers_source_only_commits_in_order() {
        let vcs = Arc::new(RepoBuilder::java_three_commits());
        let discoverer = CommitDiscoverer::new(vcs.clone())
            .with_strategy(Arc::new(JavaAlgorithmStrategy::new()));
        let commits = discoverer.discover("feature", "develop").await.unwrap();

        let subjects: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(subjects, vec!["Add store load module", "Add price module", "Add rank module"]);
        assert!(commits.iter().all(|c| c.category == CommitCategory::FeatureAddition));
        assert!(commits[0].business_logic_summary.contains("Module Class"));
        assert_eq!(vcs.fetches(), 0);
    }

    #[tokio::test]
    async fn fetch_is_optional() {
        let vcs = Arc::new(RepoBuilder::java_three_commits());
        CommitDiscoverer::new(vcs.clone())
            .with_fetch(true)
            .discover("feature", "develop")
            .await
            .unwrap();
        assert_eq!(vcs.fetches(), 1);
    }

    #[tokio::test]
    async fn missing_branch_is_a_discovery_error() {
        let vcs = Arc::new(FakeVcs::new());
        let err = CommitDiscoverer::new(vcs)
            .discover("nope", "main")
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Discovery { .. }));
    }

    #[tokio::test]
    async fn already_migrated_commits_are_excluded() {
        let vcs = RepoBuilder::new("develop", "feature")
            .source_commit("Add a", &[("a.sql", Some(&fixtures::sql_view("a", &["x"])))])
            .build();
        vcs.branch_from("develop-next", "feature");
        let vcs = Arc::new(vcs);
        let commits = CommitDiscoverer::new(vcs)
            .discover("feature", "develop-next")
            .await
            .unwrap();
        assert!(commits.is_empty());
    }

    proptest! {
        #[test]
        fn categorization_is_pure(message in ".{0,40}", paths in proptest::collection::vec("[a-z]{1,6}\\.(sql|md|java|json|py)", 0..5)) {
            prop_assert_eq!(categorize(&message, &paths), categorize(&message, &paths));
        }
    }
}
