//! Workflow Manager: the only component that mutates the repository
//!
//! Owns the run's [`WorkflowState`] and issues every version-control
//! mutation one at a time through `&mut self`. In a dry run each step
//! advances the state without touching the repository.

use super::state::{ImplementedCommit, Phase, WorkflowState};
use crate::cancel::CancelToken;
use crate::error::{MigrationError, MigrationResult, RollbackOutcome, RollbackStep};
use parking_lot::RwLock;
use porter_model::{Adaptation, Commit, MigrationRequest, NoteLevel};
use porter_vcs::{CurrentRef, MergeOutcome, VcsResult, VersionControl};
use std::fmt;
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Issue codes recorded by the manager
pub mod issue {
    /// A source commit produced no change on the feature branch
    pub const COMMIT_SKIPPED: &str = "commit_skipped";
    /// An adaptation path escapes the working tree
    pub const UNSAFE_PATH: &str = "unsafe_path";
    /// Feature branch history differs from the implemented commits
    pub const REVIEW_MISMATCH: &str = "review_mismatch";
    /// Feature branch could not be deleted after merging
    pub const CLEANUP_FAILED: &str = "cleanup_failed";
    /// Work spans several repositories
    pub const CROSS_REPOSITORY: &str = crate::discovery::CROSS_REPO_ISSUE;
}

/// Commit message for a migrated commit
#[must_use]
pub fn migration_commit_message(
    commit: &Commit,
    request: &MigrationRequest,
    adaptations: &[Adaptation],
) -> String {
    let mut message = format!(
        "[MIGRATION] Implement {}\n\n\
         Original commit: {}\n\
         Migrated from: {}\n\
         Target branch: {}\n\n\
         Pattern adaptations applied:\n",
        commit.message, commit.hash, request.source_branch, request.target_branch
    );
    let mut any = false;
    for adaptation in adaptations.iter().filter(|a| !a.change_notes.is_empty()) {
        let notes: Vec<String> = adaptation
            .change_notes
            .iter()
            .filter(|n| n.level != NoteLevel::Note)
            .map(ToString::to_string)
            .collect();
        if notes.is_empty() {
            continue;
        }
        any = true;
        message.push_str(&format!("- {}: {}\n", adaptation.file_path, notes.join("; ")));
    }
    if !any {
        message.push_str("- none\n");
    }
    message
}

/// Merge commit message
#[must_use]
pub fn merge_message(request: &MigrationRequest, commits: usize) -> String {
    format!(
        "Merge migration: {} → {} ({commits} commits)",
        request.source_branch, request.target_branch
    )
}

fn is_safe_relative(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// Drives the repository through the migration phases
pub struct WorkflowManager {
    vcs: Arc<dyn VersionControl>,
    request: MigrationRequest,
    remote: String,
    push: bool,
    cancel: CancelToken,
    state: Arc<RwLock<WorkflowState>>,
    original_ref: Option<CurrentRef>,
    target_tip: Option<String>,
    mutated: bool,
}

impl fmt::Debug for WorkflowManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowManager")
            .field("work_dir", &self.vcs.work_dir())
            .field("request", &self.request)
            .field("remote", &self.remote)
            .field("push", &self.push)
            .field("mutated", &self.mutated)
            .finish_non_exhaustive()
    }
}

impl WorkflowManager {
    /// Create manager for one run
    #[must_use]
    pub fn new(vcs: Arc<dyn VersionControl>, request: MigrationRequest, state: WorkflowState) -> Self {
        Self {
            vcs,
            request,
            remote: crate::config::DEFAULT_REMOTE.to_string(),
            push: false,
            cancel: CancelToken::new(),
            state: Arc::new(RwLock::new(state)),
            original_ref: None,
            target_tip: None,
            mutated: false,
        }
    }

    /// Push the target to a remote after merging
    #[inline]
    #[must_use]
    pub fn with_push(mut self, remote: impl Into<String>, push: bool) -> Self {
        self.remote = remote.into();
        self.push = push;
        self
    }

    /// Use a cancellation token
    #[inline]
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn dry_run(&self) -> bool {
        self.request.options.dry_run
    }

    /// Snapshot of the state
    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.state.read().clone()
    }

    /// Shared handle for observers
    #[must_use]
    pub fn state_handle(&self) -> Arc<RwLock<WorkflowState>> {
        Arc::clone(&self.state)
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.read().phase
    }

    /// Enter a phase
    pub fn advance(&self, phase: Phase) {
        self.state.write().advance(phase);
    }

    /// Raise progress within the current phase
    pub fn set_progress(&self, progress: u8) {
        self.state.write().set_progress(progress);
    }

    /// Record a non-fatal issue
    pub fn record_issue(&self, code: &str, message: impl Into<String>) {
        self.state.write().record_issue(code, message);
    }

    /// Fail if cancellation was requested
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Cancelled`] naming the current phase.
    pub fn checkpoint(&self) -> MigrationResult<()> {
        if self.cancel.is_cancelled() {
            Err(MigrationError::Cancelled {
                phase: self.phase().to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Remember where HEAD and the target are, for rollback
    ///
    /// # Errors
    ///
    /// Returns a version-control error when either cannot be read.
    pub async fn record_start(&mut self) -> MigrationResult<()> {
        let current = self
            .vcs
            .current_ref()
            .await
            .map_err(|e| MigrationError::vcs("reading current branch", e))?;
        let tip = self
            .vcs
            .resolve(&self.request.target_branch)
            .await
            .map_err(|e| MigrationError::vcs(format!("resolving {}", self.request.target_branch), e))?;
        debug!(original = %current, target_tip = %tip, "recorded starting position");
        self.original_ref = Some(current);
        self.target_tip = Some(tip);
        Ok(())
    }

    async fn mutate<T, F>(&mut self, operation: impl Into<String>, f: F) -> MigrationResult<T>
    where
        F: std::future::Future<Output = VcsResult<T>>,
    {
        self.mutated = true;
        f.await.map_err(|e| MigrationError::vcs(operation, e))
    }

    /// Create the feature branch from the target and check it out
    ///
    /// # Errors
    ///
    /// Returns a version-control error when the branch cannot be created.
    pub async fn create_feature_branch(&mut self, commit_count: usize) -> MigrationResult<String> {
        self.checkpoint()?;
        let name = self.request.feature_branch_name(commit_count);
        if self.dry_run() {
            info!(branch = %name, "dry run: would create feature branch");
        } else {
            let vcs = Arc::clone(&self.vcs);
            let target = self.request.target_branch.clone();
            self.mutate(format!("creating branch {name}"), vcs.create_branch(&name, &target))
                .await?;
            self.state.write().feature_branch = Some(name.clone());
            info!(branch = %name, from = %target, "feature branch created");
        }
        self.advance(Phase::FeatureBranchCreated);
        Ok(name)
    }

    /// Make sure the feature branch is checked out with a clean tree
    ///
    /// # Errors
    ///
    /// Returns a version-control error when checkout or cleanup fails.
    pub async fn prepare_target(&mut self) -> MigrationResult<()> {
        self.checkpoint()?;
        let branch = self.state.read().feature_branch.clone();
        if let Some(branch) = branch {
            let vcs = Arc::clone(&self.vcs);
            let current = vcs
                .current_ref()
                .await
                .map_err(|e| MigrationError::vcs("reading current branch", e))?;
            if !current.is_branch(&branch) {
                self.mutate(format!("checking out {branch}"), vcs.checkout(&branch)).await?;
            }
            let clean = vcs
                .is_clean()
                .await
                .map_err(|e| MigrationError::vcs("reading status", e))?;
            if !clean {
                warn!(branch = %branch, "working tree not clean; resetting");
                self.mutate("resetting working tree", vcs.reset_hard("HEAD")).await?;
                self.mutate("removing untracked files", vcs.clean_untracked()).await?;
            }
        }
        self.advance(Phase::TargetPrepared);
        Ok(())
    }

    async fn write_adaptations(&mut self, adaptations: &[Adaptation]) -> MigrationResult<usize> {
        self.mutated = true;
        let root = self.vcs.work_dir().to_path_buf();
        let mut written = 0;
        for adaptation in adaptations {
            if !is_safe_relative(&adaptation.file_path) {
                self.record_issue(
                    issue::UNSAFE_PATH,
                    format!("{} is outside the working tree; not written", adaptation.file_path),
                );
                continue;
            }
            let full = root.join(&adaptation.file_path);
            match &adaptation.proposed_content {
                Some(content) => {
                    if let Some(parent) = full.parent() {
                        tokio::fs::create_dir_all(parent)
                            .await
                            .map_err(|e| MigrationError::io(parent, e))?;
                    }
                    tokio::fs::write(&full, content)
                        .await
                        .map_err(|e| MigrationError::io(&full, e))?;
                }
                None => match tokio::fs::remove_file(&full).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(MigrationError::io(&full, e)),
                },
            }
            written += 1;
        }
        Ok(written)
    }

    /// Apply one commit's adaptations and commit them
    ///
    /// A commit that changes nothing is skipped and recorded as an issue.
    ///
    /// # Errors
    ///
    /// Returns an error on cancellation or when writing, staging or
    /// committing fails.
    pub async fn apply_commit(
        &mut self,
        index: usize,
        total: usize,
        commit: &Commit,
        adaptations: &[Adaptation],
    ) -> MigrationResult<()> {
        self.checkpoint()?;
        self.state.write().current_commit = Some(commit.hash.clone());
        info!(
            commit = %commit.short_hash(),
            position = index + 1,
            total,
            "implementing commit"
        );

        if self.dry_run() {
            self.state.write().implemented.push(ImplementedCommit {
                original: commit.hash.clone(),
                migrated: None,
                message: commit.message.clone(),
                files: adaptations.len(),
            });
        } else {
            let files = self.write_adaptations(adaptations).await?;
            let vcs = Arc::clone(&self.vcs);
            let clean = vcs
                .is_clean()
                .await
                .map_err(|e| MigrationError::vcs("reading status", e))?;
            if clean {
                self.record_issue(
                    issue::COMMIT_SKIPPED,
                    format!("{} produced no changes: {}", commit.short_hash(), commit.message),
                );
                self.state.write().skipped.push(commit.hash.clone());
            } else {
                self.mutate("staging changes", vcs.stage_all()).await?;
                let message = migration_commit_message(commit, &self.request, adaptations);
                let hash = self
                    .mutate(format!("committing {}", commit.short_hash()), vcs.commit(&message))
                    .await?;
                debug!(original = %commit.short_hash(), migrated = %hash, "commit created");
                self.state.write().implemented.push(ImplementedCommit {
                    original: commit.hash.clone(),
                    migrated: Some(hash),
                    message: commit.message.clone(),
                    files,
                });
            }
        }

        self.set_progress(WorkflowState::commit_progress(index + 1, total));
        Ok(())
    }

    /// Every commit applied
    pub fn finish_implementation(&self) {
        self.state.write().current_commit = None;
        self.advance(Phase::CommitsImplemented);
    }

    /// Record commits needing cross-repository coordination
    pub fn check_cross_repository(&self, commits: &[&Commit]) {
        for commit in commits {
            self.record_issue(
                issue::CROSS_REPOSITORY,
                format!(
                    "{} mentions cross-repository work; sync related repositories: {}",
                    commit.short_hash(),
                    commit.message
                ),
            );
        }
        self.set_progress(90);
    }

    /// Compare the feature branch history with the implemented commits
    ///
    /// # Errors
    ///
    /// Returns a version-control error when the history cannot be listed.
    pub async fn review(&mut self) -> MigrationResult<()> {
        self.checkpoint()?;
        if !self.dry_run() {
            let log = self
                .vcs
                .log_range(&self.request.target_branch, "HEAD")
                .await
                .map_err(|e| MigrationError::vcs("listing feature branch history", e))?;
            let expected: Vec<String> = self
                .state
                .read()
                .implemented
                .iter()
                .filter_map(|c| c.migrated.clone())
                .collect();
            let found: Vec<String> = log.into_iter().map(|e| e.hash).collect();
            if found != expected {
                self.record_issue(
                    issue::REVIEW_MISMATCH,
                    format!(
                        "feature branch has {} commits, expected {}",
                        found.len(),
                        expected.len()
                    ),
                );
            }
        }
        self.advance(Phase::Reviewed);
        Ok(())
    }

    /// Merge the feature branch into the target
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::MergeConflict`] after aborting a
    /// conflicting merge, or a version-control error.
    pub async fn merge(&mut self) -> MigrationResult<()> {
        self.checkpoint()?;
        let Some(branch) = self.state.read().feature_branch.clone() else {
            return Err(MigrationError::Report("no feature branch to merge".to_string()));
        };
        let vcs = Arc::clone(&self.vcs);
        let target = self.request.target_branch.clone();
        let count = self.state.read().implemented.len();
        let message = merge_message(&self.request, count);

        self.mutate(format!("checking out {target}"), vcs.checkout(&target)).await?;
        let outcome = self
            .mutate(format!("merging {branch}"), vcs.merge_no_ff(&branch, &message))
            .await?;
        if let MergeOutcome::Conflicted(paths) = outcome {
            if let Err(e) = vcs.abort_merge().await {
                warn!(error = %e, "merge abort failed");
            }
            return Err(MigrationError::MergeConflict { branch, paths });
        }
        info!(branch = %branch, target = %target, commits = count, "feature branch merged");
        self.advance(Phase::Merged);
        Ok(())
    }

    /// Delete the merged feature branch; failure is only a warning
    pub async fn delete_feature_branch(&mut self) {
        let branch = self.state.read().feature_branch.clone();
        if let Some(branch) = branch {
            let vcs = Arc::clone(&self.vcs);
            match self.mutate(format!("deleting {branch}"), vcs.delete_branch(&branch)).await {
                Ok(()) => {
                    self.state.write().feature_branch = None;
                    info!(branch = %branch, "feature branch deleted");
                }
                Err(e) => self.record_issue(issue::CLEANUP_FAILED, e.to_string()),
            }
        }
        self.advance(Phase::FeatureBranchDeleted);
    }

    /// Push the target branch when configured
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::PushFailure`] when the push is rejected.
    pub async fn push(&mut self) -> MigrationResult<()> {
        if !self.push {
            debug!("push disabled");
            return Ok(());
        }
        self.checkpoint()?;
        self.mutated = true;
        let target = self.request.target_branch.clone();
        self.vcs
            .push(&self.remote, &target)
            .await
            .map_err(|source| MigrationError::PushFailure {
                remote: self.remote.clone(),
                branch: target.clone(),
                source,
            })?;
        info!(remote = %self.remote, branch = %target, "target pushed");
        Ok(())
    }

    /// Finish the run
    pub fn complete(&self) {
        self.advance(Phase::Completed);
    }

    fn step(steps: &mut Vec<RollbackStep>, action: String, result: VcsResult<()>) {
        if let Err(e) = &result {
            warn!(action = %action, error = %e, "rollback step failed");
        }
        steps.push(RollbackStep {
            action,
            error: result.err().map(|e| e.to_string()),
        });
    }

    /// Best-effort rollback after a fatal error
    ///
    /// Discards working-tree changes, resets the target to its recorded
    /// tip, deletes the feature branch and returns to the original ref.
    /// Failed steps are recorded and never abort the remaining ones.
    pub async fn rollback(&mut self) -> RollbackOutcome {
        if !self.mutated || self.dry_run() {
            self.state.write().fail(Vec::new());
            return RollbackOutcome::NotNeeded;
        }
        warn!("rolling back");
        let vcs = Arc::clone(&self.vcs);
        let target = self.request.target_branch.clone();
        let mut steps = Vec::new();

        Self::step(&mut steps, "discard working tree changes".into(), vcs.reset_hard("HEAD").await);
        Self::step(&mut steps, "remove untracked files".into(), vcs.clean_untracked().await);
        Self::step(&mut steps, format!("checkout {target}"), vcs.checkout(&target).await);
        if let Some(tip) = self.target_tip.clone() {
            Self::step(&mut steps, format!("reset {target} to {tip}"), vcs.reset_hard(&tip).await);
        }
        let branch = self.state.read().feature_branch.clone();
        if let Some(branch) = branch {
            let result = vcs.delete_branch(&branch).await;
            if result.is_ok() {
                self.state.write().feature_branch = None;
            }
            Self::step(&mut steps, format!("delete branch {branch}"), result);
        }
        if let Some(original) = self.original_ref.clone() {
            if !original.is_branch(&target) {
                let rev = original.revision().to_string();
                Self::step(&mut steps, format!("checkout {rev}"), vcs.checkout(&rev).await);
            }
        }

        self.state.write().fail(steps.clone());
        let outcome = RollbackOutcome::from_steps(steps);
        info!(outcome = %outcome, "rollback finished");
        outcome
    }
}
