//! Migration engine: runs one request end to end
//!
//! # Workflow
//! 1. Setup: registry lookup, repository and branch checks, clean tree
//! 2. Analysis: commit discovery, target and source pattern profiles
//! 3. Planning: adaptation, expert resolution and validation of every
//!    commit, before anything is mutated
//! 4. Execution: feature branch, one commit per migrated commit
//! 5. Finalization: cross-repository check, compliance, review, merge,
//!    branch cleanup, push
//!
//! Fatal errors trigger the manager's rollback; the outcome is reported
//! next to the original error in a [`RunFailure`].

use crate::adaptation::{AdaptationEngine, CommitAdaptation};
use crate::cancel::CancelToken;
use crate::config::{RepositoryConfig, RepositoryRegistry};
use crate::discovery::{CommitDiscoverer, DiscoveryReport};
use crate::error::{ConfigProblem, MigrationError, MigrationResult, RollbackOutcome, RunFailure};
use crate::report::{ReportOutcome, ReportWriter, RunRecord};
use crate::workflow::{Phase, WorkflowManager, WorkflowState};
use chrono::Utc;
use porter_experts::ExpertCoordinator;
use porter_model::{Commit, MigrationRequest, PatternProfile, Resolution, RunId};
use porter_patterns::{RevisionTree, StrategyRegistry};
use porter_validation::{
    CommitValidation, PatternCompliance, RuleCatalog, ValidationContext, ValidationFramework,
    ViolationSeverity,
};
use porter_vcs::{GitCli, VersionControl};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// Issue codes recorded by the engine
pub mod issue {
    /// Source and target already agree
    pub const NO_COMMITS: &str = "no_commits";
    /// A file was skipped or carried over unchanged
    pub const ADAPTATION_SKIPPED: &str = "adaptation_skipped";
    /// No expert was confident enough
    pub const UNRESOLVED_CONFLICT: &str = "unresolved_conflict";
    /// Average compliance below the configured threshold
    pub const LOW_COMPLIANCE: &str = "validation_below_threshold";
    /// High-severity violation tolerated because validation is skipped
    pub const VALIDATION_SKIPPED: &str = "validation_skipped";
}

/// Everything decided about one commit before execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitPlan {
    /// The source commit
    pub commit: Commit,
    /// Its adapted files
    pub adaptation: CommitAdaptation,
    /// One resolution per conflict, in conflict order
    pub resolutions: Vec<Resolution>,
    /// Rule results
    pub validation: CommitValidation,
    /// Structural pattern check
    pub pattern_compliance: PatternCompliance,
}

/// How a successful run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Merged into the target
    Completed,
    /// Dry run finished after review
    DryRun,
    /// Source had no commits missing from the target
    NothingToMigrate,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "SUCCESS",
            Self::DryRun => "DRY RUN",
            Self::NothingToMigrate => "NOTHING TO MIGRATE",
        })
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationOutcome {
    /// Run identifier
    pub run_id: RunId,
    /// How the run ended
    pub status: RunStatus,
    /// Final workflow state
    pub state: WorkflowState,
    /// Mean compliance across validated commits
    pub average_compliance: Option<f64>,
    /// Where reports were written, if they were
    pub report_dir: Option<PathBuf>,
}

impl MigrationOutcome {
    /// Commits recorded as migrated
    #[must_use]
    pub fn migrated_count(&self) -> usize {
        self.state.implemented.len()
    }
}

/// Runs migrations against registered repositories
pub struct MigrationEngine {
    registry: RepositoryRegistry,
    strategies: StrategyRegistry,
    experts: Arc<ExpertCoordinator>,
    catalog: RuleCatalog,
    vcs: Option<Arc<dyn VersionControl>>,
    cancel: CancelToken,
    write_reports: bool,
}

impl fmt::Debug for MigrationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationEngine")
            .field("repositories", &self.registry.ids().collect::<Vec<_>>())
            .field("domains", &self.strategies.domains())
            .field("rules", &self.catalog.len())
            .field("vcs_override", &self.vcs.is_some())
            .field("write_reports", &self.write_reports)
            .finish_non_exhaustive()
    }
}

impl MigrationEngine {
    /// Engine with default strategies, built-in rules and fallback experts
    #[must_use]
    pub fn new(registry: RepositoryRegistry) -> Self {
        Self {
            registry,
            strategies: StrategyRegistry::with_defaults(),
            experts: Arc::new(ExpertCoordinator::with_fallbacks()),
            catalog: RuleCatalog::with_builtin_rules(),
            vcs: None,
            cancel: CancelToken::new(),
            write_reports: true,
        }
    }

    /// Engine with experts loaded from the configured experts directory
    pub async fn load(registry: RepositoryRegistry) -> Self {
        let experts = ExpertCoordinator::load(&registry.settings().experts_dir).await;
        Self::new(registry).with_experts(experts)
    }

    /// With an expert panel
    #[inline]
    #[must_use]
    pub fn with_experts(mut self, experts: ExpertCoordinator) -> Self {
        self.experts = Arc::new(experts);
        self
    }

    /// With a strategy registry
    #[inline]
    #[must_use]
    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }

    /// With a rule catalog
    #[inline]
    #[must_use]
    pub fn with_catalog(mut self, catalog: RuleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Use this version control instead of `git` in the configured path
    #[inline]
    #[must_use]
    pub fn with_vcs(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    /// Use a cancellation token
    #[inline]
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Enable or disable report files
    #[inline]
    #[must_use]
    pub fn with_reports(mut self, write_reports: bool) -> Self {
        self.write_reports = write_reports;
        self
    }

    /// Token that cancels running migrations
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The expert panel
    #[must_use]
    pub fn experts(&self) -> &ExpertCoordinator {
        &self.experts
    }

    /// Run one migration
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] for any fatal error, carrying the rollback
    /// outcome separately from the error itself.
    pub async fn run(&self, request: MigrationRequest) -> Result<MigrationOutcome, RunFailure> {
        let run_id = RunId::from_millis(Utc::now().timestamp_millis());
        let span = info_span!(
            "migration",
            run = %run_id,
            repository = %request.repository_id,
            source = %request.source_branch,
            target = %request.target_branch,
        );
        self.run_inner(run_id, request).instrument(span).await
    }

    async fn run_inner(&self, run_id: RunId, request: MigrationRequest) -> Result<MigrationOutcome, RunFailure> {
        info!(dry_run = request.options.dry_run, "starting migration");
        let state = WorkflowState::new(run_id.clone());

        let repo = match self.registry.get(&request.repository_id).and_then(|repo| {
            repo.check_path()?;
            Ok(repo.clone())
        }) {
            Ok(repo) => repo,
            Err(error) => {
                error!(error = %error, "configuration rejected");
                let mut state = state;
                state.fail(Vec::new());
                return Err(RunFailure {
                    run_id,
                    error,
                    rollback: RollbackOutcome::NotNeeded,
                    state,
                    report_dir: None,
                });
            }
        };

        let settings = self.registry.settings();
        let vcs: Arc<dyn VersionControl> = match &self.vcs {
            Some(vcs) => Arc::clone(vcs),
            None => Arc::new(GitCli::new(&repo.path).with_timeout(settings.command_timeout())),
        };
        let mut manager = WorkflowManager::new(Arc::clone(&vcs), request.clone(), state)
            .with_push(repo.remote.clone(), settings.push)
            .with_cancel(self.cancel.clone());
        let mut record = RunRecord::new(run_id.clone(), request.clone(), repo.clone());

        // a cancel drops the in-flight step, killing any running git process
        let cancel = self.cancel.clone();
        let finished = tokio::select! {
            biased;
            result = self.execute(&mut manager, &mut record, vcs, &repo) => Some(result),
            () = cancel.cancelled() => None,
        };
        let result = finished.unwrap_or_else(|| {
            warn!(phase = %manager.phase(), "cancelled while a step was in flight");
            Err(MigrationError::Cancelled {
                phase: manager.phase().to_string(),
            })
        });
        match result {
            Ok(status) => {
                let state = manager.state();
                let report_dir = self.persist_reports(&record, &state, ReportOutcome::Success(status)).await;
                info!(
                    status = %status,
                    phase = %state.phase,
                    migrated = state.implemented.len(),
                    issues = state.issues.len(),
                    "migration finished"
                );
                Ok(MigrationOutcome {
                    run_id,
                    status,
                    average_compliance: record.average_compliance(),
                    state,
                    report_dir,
                })
            }
            Err(error) => {
                error!(phase = %manager.phase(), error = %error, "migration failed");
                let rollback = manager.rollback().await;
                let state = manager.state();
                let report_dir = if record.preflight_passed {
                    self.persist_reports(&record, &state, ReportOutcome::Failure { error: &error, rollback: &rollback })
                        .await
                } else {
                    None
                };
                Err(RunFailure {
                    run_id,
                    error,
                    rollback,
                    state,
                    report_dir,
                })
            }
        }
    }

    async fn persist_reports(
        &self,
        record: &RunRecord,
        state: &WorkflowState,
        outcome: ReportOutcome<'_>,
    ) -> Option<PathBuf> {
        if !self.write_reports {
            return None;
        }
        let writer = ReportWriter::new(&self.registry.settings().output_dir);
        match writer.write(record, state, &self.experts, outcome).await {
            Ok(dir) => {
                info!(dir = %dir.display(), "reports written");
                Some(dir)
            }
            Err(e) => {
                warn!(error = %e, "report generation failed");
                None
            }
        }
    }

    async fn preflight(
        &self,
        vcs: &dyn VersionControl,
        request: &MigrationRequest,
        repo: &RepositoryConfig,
    ) -> MigrationResult<()> {
        let inaccessible = |message: String| {
            MigrationError::configuration(ConfigProblem::InaccessibleRepository, message)
        };
        match vcs.is_repository().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(inaccessible(format!("{} is not a repository", repo.path.display())));
            }
            Err(e) => return Err(inaccessible(e.to_string())),
        }

        for branch in [&request.source_branch, &request.target_branch] {
            let exists = vcs
                .branch_exists(branch)
                .await
                .map_err(|e| inaccessible(e.to_string()))?;
            if !exists {
                return Err(MigrationError::configuration(
                    ConfigProblem::MissingBranch,
                    format!("branch '{branch}' not found in {}", request.repository_id),
                ));
            }
        }

        if !request.options.dry_run {
            let clean = vcs.is_clean().await.map_err(|e| inaccessible(e.to_string()))?;
            if !clean {
                return Err(MigrationError::configuration(
                    ConfigProblem::DirtyWorkingTree,
                    "commit or stash local changes, or use --dry-run",
                ));
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        manager: &mut WorkflowManager,
        record: &mut RunRecord,
        vcs: Arc<dyn VersionControl>,
        repo: &RepositoryConfig,
    ) -> MigrationResult<RunStatus> {
        let request = record.request.clone();
        let settings = self.registry.settings();

        // Setup
        manager.checkpoint()?;
        self.preflight(vcs.as_ref(), &request, repo).await?;
        manager.record_start().await?;
        record.preflight_passed = true;

        // Analysis
        manager.checkpoint()?;
        manager.advance(Phase::Analysis);
        let strategy = self.strategies.for_domain(repo.domain)?;
        let commits = CommitDiscoverer::new(Arc::clone(&vcs))
            .with_strategy(Arc::clone(&strategy))
            .with_fetch(settings.fetch)
            .discover(&request.source_branch, &request.target_branch)
            .await?;
        let discovery = DiscoveryReport::new(commits);
        record.discovery = Some(discovery.clone());

        let target_profile = strategy
            .analyze_patterns(&RevisionTree::new(Arc::clone(&vcs), request.target_branch.clone()))
            .await?;
        let source_profile = strategy
            .analyze_patterns(&RevisionTree::new(Arc::clone(&vcs), request.source_branch.clone()))
            .await?;
        info!(
            commits = discovery.commits.len(),
            target_components = target_profile.len(),
            source_components = source_profile.len(),
            risk = %discovery.risk.overall(),
            "analysis complete"
        );
        record.target_profile = Some(target_profile.clone());
        record.source_profile = Some(source_profile);
        record.guidance = self.experts.guidance(repo.domain);

        if discovery.commits.is_empty() {
            manager.record_issue(
                issue::NO_COMMITS,
                format!(
                    "No commits to migrate: {} has nothing missing from {}",
                    request.source_branch, request.target_branch
                ),
            );
            return Ok(RunStatus::NothingToMigrate);
        }

        // Planning
        manager.checkpoint()?;
        manager.advance(Phase::Planning);
        let context = ValidationContext::new(
            request.repository_id.clone(),
            repo.domain,
            request.source_branch.clone(),
            request.target_branch.clone(),
        )
        .with_base_branches(repo.base_branch_names());
        let framework = ValidationFramework::new(self.catalog.clone());
        let adapter = AdaptationEngine::new(Arc::clone(&strategy), Arc::clone(&vcs));
        for commit in &discovery.commits {
            manager.checkpoint()?;
            let plan = self
                .plan_commit(manager, &adapter, &framework, &context, commit, &target_profile, &request)
                .await?;
            record.plans.push(plan);
        }
        record.validation = Some(framework.report());

        // Execution
        let total = record.plans.len();
        manager.create_feature_branch(total).await?;
        manager.prepare_target().await?;
        for (index, plan) in record.plans.iter().enumerate() {
            manager
                .apply_commit(index, total, &plan.commit, &plan.adaptation.adaptations)
                .await?;
        }
        manager.finish_implementation();

        // Finalization
        let cross_repo: Vec<&Commit> = discovery
            .commits
            .iter()
            .filter(|c| discovery.cross_repo.contains(&c.hash))
            .collect();
        manager.check_cross_repository(&cross_repo);

        manager.checkpoint()?;
        if let Some(average) = record.average_compliance() {
            if average < settings.compliance_threshold {
                manager.record_issue(
                    issue::LOW_COMPLIANCE,
                    format!(
                        "average compliance {:.1}% is below {:.1}%",
                        average * 100.0,
                        settings.compliance_threshold * 100.0
                    ),
                );
            }
        }
        manager.advance(Phase::Validated);
        manager.review().await?;

        if request.options.dry_run {
            info!("dry run complete; no changes were made");
            return Ok(RunStatus::DryRun);
        }

        manager.merge().await?;
        manager.delete_feature_branch().await;
        manager.push().await?;
        manager.complete();
        Ok(RunStatus::Completed)
    }

    #[allow(clippy::too_many_arguments)]
    async fn plan_commit(
        &self,
        manager: &WorkflowManager,
        adapter: &AdaptationEngine,
        framework: &ValidationFramework,
        context: &ValidationContext,
        commit: &Commit,
        target_profile: &PatternProfile,
        request: &MigrationRequest,
    ) -> MigrationResult<CommitPlan> {
        let adaptation = adapter.adapt_commit(commit, target_profile).await;
        for skipped in &adaptation.issues {
            manager.record_issue(issue::ADAPTATION_SKIPPED, skipped.clone());
        }

        let conflicts: Vec<_> = adaptation.conflicts().cloned().collect();
        let resolutions = self.experts.resolve_all(&conflicts);
        for (conflict, resolution) in conflicts.iter().zip(&resolutions) {
            if resolution.manual_resolution_required {
                let unresolved = MigrationError::UnresolvedConflict {
                    conflict_type: conflict.conflict_type.to_string(),
                    path: conflict.file_path.clone(),
                };
                manager.record_issue(issue::UNRESOLVED_CONFLICT, unresolved.to_string());
            }
        }

        let validation = framework.validate(commit, &adaptation.adaptations, context);
        let pattern_compliance = framework.pattern_compliance(&adaptation.adaptations);
        if validation.has_high_violation() {
            let violations: Vec<String> = validation
                .violations
                .iter()
                .filter(|v| v.severity == ViolationSeverity::High)
                .map(|v| format!("{}: {}", v.rule_code, v.message))
                .collect();
            if request.options.skip_validation {
                manager.record_issue(
                    issue::VALIDATION_SKIPPED,
                    format!("{} has high-severity violations: {}", commit.short_hash(), violations.join("; ")),
                );
            } else {
                return Err(MigrationError::ValidationFailure {
                    commit: commit.hash.clone(),
                    violations,
                });
            }
        }

        info!(
            commit = %commit.short_hash(),
            files = adaptation.adaptations.len(),
            conflicts = conflicts.len(),
            compliance = ?validation.overall_compliance,
            "commit planned"
        );
        Ok(CommitPlan {
            commit: commit.clone(),
            adaptation,
            resolutions,
            validation,
            pattern_compliance,
        })
    }
}
