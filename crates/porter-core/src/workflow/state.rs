//! Workflow phases and the live run state

use crate::error::RollbackStep;
use chrono::{DateTime, Utc};
use porter_model::RunId;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Workflow phase, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Configuration and repository checks
    Setup,
    /// Discovery and pattern analysis
    Analysis,
    /// Adaptation, expert resolution and validation planning
    Planning,
    /// Feature branch created from the target
    FeatureBranchCreated,
    /// Feature branch checked out and clean
    TargetPrepared,
    /// Every commit applied
    CommitsImplemented,
    /// Compliance recorded
    Validated,
    /// Feature branch history checked
    Reviewed,
    /// Feature branch merged into the target
    Merged,
    /// Feature branch removed
    FeatureBranchDeleted,
    /// Run finished
    Completed,
    /// Run stopped on a fatal error
    Failed,
}

impl Phase {
    /// Position in the success path; `Failed` sits outside it
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Setup => 0,
            Self::Analysis => 1,
            Self::Planning => 2,
            Self::FeatureBranchCreated => 3,
            Self::TargetPrepared => 4,
            Self::CommitsImplemented => 5,
            Self::Validated => 6,
            Self::Reviewed => 7,
            Self::Merged => 8,
            Self::FeatureBranchDeleted => 9,
            Self::Completed => 10,
            Self::Failed => u8::MAX,
        }
    }

    /// Progress percentage reached when the phase is entered
    #[must_use]
    pub const fn progress(self) -> u8 {
        match self {
            Self::Setup | Self::Failed => 0,
            Self::Analysis => 3,
            Self::Planning => 6,
            Self::FeatureBranchCreated => 10,
            Self::TargetPrepared => 15,
            Self::CommitsImplemented => 85,
            Self::Validated => 95,
            Self::Reviewed => 97,
            Self::Merged => 98,
            Self::FeatureBranchDeleted => 99,
            Self::Completed => 100,
        }
    }

    /// Phases during which the feature branch exists in a real run
    #[must_use]
    pub const fn has_feature_branch(self) -> bool {
        matches!(
            self,
            Self::FeatureBranchCreated
                | Self::TargetPrepared
                | Self::CommitsImplemented
                | Self::Validated
                | Self::Reviewed
                | Self::Merged
        )
    }

    /// Snake-case label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Analysis => "analysis",
            Self::Planning => "planning",
            Self::FeatureBranchCreated => "feature_branch_created",
            Self::TargetPrepared => "target_prepared",
            Self::CommitsImplemented => "commits_implemented",
            Self::Validated => "validated",
            Self::Reviewed => "reviewed",
            Self::Merged => "merged",
            Self::FeatureBranchDeleted => "feature_branch_deleted",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Non-fatal problem recorded during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Phase it was raised in
    pub phase: Phase,
    /// Stable code (`adaptation_skipped`, `commit_skipped`, ...)
    pub code: String,
    /// Details
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.phase, self.code, self.message)
    }
}

/// A migrated commit on the feature branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementedCommit {
    /// Source commit hash
    pub original: String,
    /// New commit hash; `None` in a dry run
    pub migrated: Option<String>,
    /// Source commit subject
    pub message: String,
    /// Files written or removed
    pub files: usize,
}

/// One phase transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Phase entered
    pub phase: Phase,
    /// Progress at that point
    pub progress: u8,
    /// When
    pub at: DateTime<Utc>,
}

/// Live state of one run
///
/// Phase rank never decreases except for the move to [`Phase::Failed`];
/// progress never decreases at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Run identifier
    pub run_id: RunId,
    /// Current phase
    pub phase: Phase,
    /// Percentage in [0, 100]
    pub progress: u8,
    /// Commit being applied
    pub current_commit: Option<String>,
    /// Feature branch, once created
    pub feature_branch: Option<String>,
    /// Migrated commits in application order
    pub implemented: Vec<ImplementedCommit>,
    /// Source commits that produced no change
    pub skipped: Vec<String>,
    /// Non-fatal problems
    pub issues: Vec<Issue>,
    /// Rollback steps taken after a failure
    pub rollbacks: Vec<RollbackStep>,
    /// Every phase and progress change
    pub history: Vec<Transition>,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    /// Fresh state in [`Phase::Setup`]
    #[must_use]
    pub fn new(run_id: RunId) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            phase: Phase::Setup,
            progress: 0,
            current_commit: None,
            feature_branch: None,
            implemented: Vec::new(),
            skipped: Vec::new(),
            issues: Vec::new(),
            rollbacks: Vec::new(),
            history: vec![Transition {
                phase: Phase::Setup,
                progress: 0,
                at: now,
            }],
            started_at: now,
            finished_at: None,
        }
    }

    /// Enter a phase at its nominal progress
    ///
    /// Moving backwards is ignored with a warning.
    pub fn advance(&mut self, phase: Phase) {
        if self.phase == Phase::Failed || phase == Phase::Failed || phase.rank() < self.phase.rank() {
            warn!(from = %self.phase, to = %phase, "ignoring backward phase transition");
            return;
        }
        self.phase = phase;
        self.set_progress(phase.progress());
        if phase == Phase::Completed {
            self.finished_at = Some(Utc::now());
        }
        info!(phase = %phase, progress = self.progress, "phase reached");
    }

    /// Raise progress within the current phase
    pub fn set_progress(&mut self, progress: u8) {
        let progress = progress.min(100).max(self.progress);
        // 100 is reserved for completion
        let progress = if self.phase == Phase::Completed { progress } else { progress.min(99) };
        self.progress = progress;
        self.history.push(Transition {
            phase: self.phase,
            progress,
            at: Utc::now(),
        });
    }

    /// Progress after `done` of `total` commits
    #[must_use]
    pub fn commit_progress(done: usize, total: usize) -> u8 {
        if total == 0 {
            return Phase::TargetPrepared.progress();
        }
        let span = usize::from(Phase::CommitsImplemented.progress() - Phase::TargetPrepared.progress());
        let step = span * done.min(total) / total;
        Phase::TargetPrepared
            .progress()
            .saturating_add(u8::try_from(step).unwrap_or(0))
    }

    /// Record a non-fatal issue
    pub fn record_issue(&mut self, code: &str, message: impl Into<String>) {
        let issue = Issue {
            phase: self.phase,
            code: code.to_string(),
            message: message.into(),
        };
        warn!(phase = %issue.phase, code, message = %issue.message, "issue recorded");
        self.issues.push(issue);
    }

    /// Enter [`Phase::Failed`] with the rollback steps taken
    pub fn fail(&mut self, rollbacks: Vec<RollbackStep>) {
        self.phase = Phase::Failed;
        self.rollbacks = rollbacks;
        self.current_commit = None;
        self.finished_at = Some(Utc::now());
        self.history.push(Transition {
            phase: Phase::Failed,
            progress: self.progress,
            at: Utc::now(),
        });
    }

    /// Issues with a code
    pub fn issues_with(&self, code: &str) -> impl Iterator<Item = &Issue> + '_ {
        let code = code.to_string();
        self.issues.iter().filter(move |i| i.code == code)
    }

    /// Run duration so far, or in total once finished
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state() -> WorkflowState {
        WorkflowState::new(RunId::from_millis(1))
    }

    #[test]
    fn phases_move_forward_only() {
        let mut s = state();
        s.advance(Phase::Planning);
        s.advance(Phase::Analysis);
        assert_eq!(s.phase, Phase::Planning);
        assert_eq!(s.progress, 6);
    }

    #[test]
    fn hundred_only_when_completed() {
        let mut s = state();
        s.advance(Phase::FeatureBranchDeleted);
        s.set_progress(100);
        assert_eq!(s.progress, 99);
        s.advance(Phase::Completed);
        assert_eq!(s.progress, 100);
        assert!(s.finished_at.is_some());
    }

    #[test]
    fn failure_is_terminal() {
        let mut s = state();
        s.advance(Phase::TargetPrepared);
        s.fail(vec![]);
        s.advance(Phase::Completed);
        assert_eq!(s.phase, Phase::Failed);
        assert_eq!(s.progress, 15);
    }

    #[test]
    fn commit_progress_spans_execution() {
        assert_eq!(WorkflowState::commit_progress(0, 3), 15);
        assert_eq!(WorkflowState::commit_progress(1, 3), 38);
        assert_eq!(WorkflowState::commit_progress(3, 3), 85);
        assert_eq!(WorkflowState::commit_progress(0, 0), 15);
    }

    #[test]
    fn feature_branch_window() {
        assert!(!Phase::Planning.has_feature_branch());
        assert!(Phase::FeatureBranchCreated.has_feature_branch());
        assert!(Phase::Merged.has_feature_branch());
        assert!(!Phase::FeatureBranchDeleted.has_feature_branch());
    }

    proptest! {
        #[test]
        fn progress_never_decreases(steps in proptest::collection::vec(0u8..=11, 1..30)) {
            let phases = [
                Phase::Setup, Phase::Analysis, Phase::Planning, Phase::FeatureBranchCreated,
                Phase::TargetPrepared, Phase::CommitsImplemented, Phase::Validated, Phase::Reviewed,
                Phase::Merged, Phase::FeatureBranchDeleted, Phase::Completed, Phase::Failed,
            ];
            let mut s = state();
            for step in steps {
                s.advance(phases[usize::from(step)]);
            }
            let progress: Vec<u8> = s.history.iter().map(|t| t.progress).collect();
            prop_assert!(progress.windows(2).all(|w| w[0] <= w[1]));
            prop_assert!(s.history.iter().all(|t| t.progress < 100 || t.phase == Phase::Completed));
        }
    }
}
