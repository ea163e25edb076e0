//! Adaptation Engine: per-commit file adaptation
//!
//! Each changed file is read at the migrated commit itself. A path absent at
//! that revision is replayed as a removal. Files outside the strategy's
//! parsers are carried over unchanged. Read failures skip the file; parse
//! failures carry it over unchanged with an error note. Both are recorded
//! as issues and never stop the commit.

use crate::error::MigrationError;
use porter_model::{Adaptation, ChangeNote, Commit, ComponentKind, Conflict, PatternProfile};
use porter_patterns::{AdaptRequest, ParsedSource, PatternStrategy};
use porter_vcs::VersionControl;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Adaptations of one commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitAdaptation {
    /// Commit hash
    pub commit: String,
    /// One adaptation per changed file that could be read
    pub adaptations: Vec<Adaptation>,
    /// Files skipped or carried over because of read or parse failures
    pub issues: Vec<String>,
    /// Follow-up notes from the strategy
    pub implementation_notes: Vec<String>,
}

impl CommitAdaptation {
    /// Every conflict raised by the adaptations
    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.adaptations.iter().flat_map(|a| a.conflicts.iter())
    }

    /// Adaptations that changed or annotated a component
    pub fn adapted(&self) -> impl Iterator<Item = &Adaptation> {
        self.adaptations
            .iter()
            .filter(|a| a.component_kind.is_adapted())
    }
}

struct SourceFile {
    path: String,
    content: String,
    parsed: Option<ParsedSource>,
}

/// Adapts commits to the target profile
pub struct AdaptationEngine {
    strategy: Arc<dyn PatternStrategy>,
    vcs: Arc<dyn VersionControl>,
}

impl fmt::Debug for AdaptationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptationEngine")
            .field("domain", &self.strategy.domain())
            .field("work_dir", &self.vcs.work_dir())
            .finish()
    }
}

impl AdaptationEngine {
    /// Create engine
    #[must_use]
    pub fn new(strategy: Arc<dyn PatternStrategy>, vcs: Arc<dyn VersionControl>) -> Self {
        Self { strategy, vcs }
    }

    /// Strategy in use
    #[inline]
    #[must_use]
    pub fn strategy(&self) -> &Arc<dyn PatternStrategy> {
        &self.strategy
    }

    /// Adapt every changed file of a commit
    pub async fn adapt_commit(&self, commit: &Commit, target: &PatternProfile) -> CommitAdaptation {
        let mut issues = Vec::new();
        let mut removals = Vec::new();
        let mut sources = Vec::new();

        for path in &commit.files_changed {
            match self.vcs.read_file(&commit.hash, path).await {
                Ok(Some(content)) => {
                    let parsed = if self.strategy.is_relevant(path) {
                        match self.strategy.parse(path, &content) {
                            Ok(parsed) => Some(parsed),
                            Err(e) => {
                                let err = MigrationError::Adaptation {
                                    path: path.clone(),
                                    message: e.to_string(),
                                };
                                warn!(commit = %commit.short_hash(), error = %err, "carrying file over unchanged");
                                issues.push(err.to_string());
                                None
                            }
                        }
                    } else {
                        None
                    };
                    sources.push(SourceFile {
                        path: path.clone(),
                        content,
                        parsed,
                    });
                }
                Ok(None) => removals.push(path.clone()),
                Err(e) => {
                    let err = MigrationError::Adaptation {
                        path: path.clone(),
                        message: e.to_string(),
                    };
                    warn!(commit = %commit.short_hash(), error = %err, "skipping file");
                    issues.push(err.to_string());
                }
            }
        }

        let commit_files: Vec<ParsedSource> = sources.iter().filter_map(|s| s.parsed.clone()).collect();
        let mut adaptations = Vec::with_capacity(sources.len() + removals.len());
        for source in &sources {
            let adaptation = match &source.parsed {
                Some(parsed) => self.strategy.adapt(&AdaptRequest::new(
                    &source.content,
                    parsed,
                    target,
                    &commit_files,
                )),
                None => {
                    let mut carried = Adaptation::new(
                        source.path.clone(),
                        ComponentKind::NoAdaptation,
                        Some(source.content.clone()),
                    );
                    if self.strategy.is_relevant(&source.path) {
                        carried
                            .change_notes
                            .push(ChangeNote::error("Could not parse file; carried over unchanged"));
                    }
                    carried
                }
            };
            debug!(
                path = %adaptation.file_path,
                kind = %adaptation.component_kind,
                notes = adaptation.change_notes.len(),
                conflicts = adaptation.conflicts.len(),
                "file adapted"
            );
            adaptations.push(adaptation);
        }
        adaptations.extend(removals.into_iter().map(Adaptation::removal));

        // Keep the commit's own file order
        adaptations.sort_by_key(|a| {
            commit
                .files_changed
                .iter()
                .position(|p| *p == a.file_path)
                .unwrap_or(usize::MAX)
        });

        let implementation_notes = self.strategy.implementation_notes(&adaptations);
        CommitAdaptation {
            commit: commit.hash.clone(),
            adaptations,
            issues,
            implementation_notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::CommitDiscoverer;
    use porter_model::{CommitCategory, DomainType, NoteLevel};
    use porter_patterns::{JavaAlgorithmStrategy, LoadApiStrategy};
    use porter_test_utils::{fixtures, RepoBuilder};

    async fn only_commit(vcs: Arc<porter_test_utils::FakeVcs>) -> Commit {
        let commits = CommitDiscoverer::new(vcs).discover("feature", "develop").await.unwrap();
        assert_eq!(commits.len(), 1);
        commits.into_iter().next().unwrap()
    }

    #[tokio::test]
    async fn loader_without_validation_gets_a_warning() {
        let vcs = Arc::new(
            RepoBuilder::new("develop", "feature")
                .source_commit(
                    "Add store loader",
                    &[(
                        "loaders/StoreLoadApi.py",
                        Some(&fixtures::loader_without_validate_row("StoreLoadApi")),
                    )],
                )
                .build(),
        );
        let commit = only_commit(vcs.clone()).await;
        let engine = AdaptationEngine::new(Arc::new(LoadApiStrategy::new()), vcs);
        let result = engine
            .adapt_commit(&commit, &PatternProfile::new(DomainType::PythonLoadApi, "develop"))
            .await;

        assert_eq!(result.adaptations.len(), 1);
        let adaptation = &result.adaptations[0];
        assert_eq!(adaptation.component_kind, ComponentKind::DataLoader);
        assert!(adaptation.has_warnings());
        assert!(result.conflicts().count() >= 1);
        assert!(result.issues.is_empty());
    }

    #[tokio::test]
    async fn deleted_and_foreign_files() {
        let vcs = Arc::new(
            RepoBuilder::new("develop", "feature")
                .target_files("Seed", &[("docs/old.md", "old\n")])
                .source_commit(
                    "Tidy docs",
                    &[("docs/old.md", None), ("docs/new.md", Some("new\n"))],
                )
                .build(),
        );
        let commit = only_commit(vcs.clone()).await;
        let engine = AdaptationEngine::new(Arc::new(JavaAlgorithmStrategy::new()), vcs);
        let result = engine
            .adapt_commit(&commit, &PatternProfile::new(DomainType::JavaAlgorithm, "develop"))
            .await;

        let removed = result.adaptations.iter().find(|a| a.file_path == "docs/old.md").unwrap();
        assert!(removed.is_removal());
        let carried = result.adaptations.iter().find(|a| a.file_path == "docs/new.md").unwrap();
        assert_eq!(carried.component_kind, ComponentKind::NoAdaptation);
        assert_eq!(carried.content(), "new\n");
        assert_eq!(result.adapted().count(), 0);
    }

    #[tokio::test]
    async fn unreadable_files_become_issues() {
        let vcs = Arc::new(RepoBuilder::java_three_commits());
        let commit = Commit::new("0000000", "Ghost", CommitCategory::CodeChange)
            .with_files(vec!["src/Ghost.java".into()]);
        let engine = AdaptationEngine::new(Arc::new(JavaAlgorithmStrategy::new()), vcs);
        let result = engine
            .adapt_commit(&commit, &PatternProfile::new(DomainType::JavaAlgorithm, "develop"))
            .await;
        assert!(result.adaptations.is_empty());
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].contains("src/Ghost.java"));
    }

    #[tokio::test]
    async fn conforming_modules_need_no_warnings() {
        let vcs = Arc::new(RepoBuilder::java_three_commits());
        let commits = CommitDiscoverer::new(vcs.clone()).discover("feature", "develop").await.unwrap();
        let engine = AdaptationEngine::new(Arc::new(JavaAlgorithmStrategy::new()), vcs);
        let result = engine
            .adapt_commit(&commits[0], &PatternProfile::new(DomainType::JavaAlgorithm, "develop"))
            .await;
        let module = &result.adaptations[0];
        assert_eq!(module.component_kind, ComponentKind::Module);
        assert!(!module
            .change_notes
            .iter()
            .any(|n| n.level == NoteLevel::Error));
    }
}
