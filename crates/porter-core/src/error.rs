//! Error types for the migration core
//!
//! Mirrors the run's failure taxonomy:
//! - configuration problems, raised before any mutation
//! - discovery failures from version-control queries
//! - per-file adaptation failures (recovered, recorded as issues)
//! - unresolved conflicts (recovered, flagged for manual resolution)
//! - validation failures (fatal only on high-severity violations)
//! - merge conflicts and push failures at finalization

use crate::workflow::WorkflowState;
use porter_model::RunId;
use porter_patterns::PatternError;
use porter_vcs::VcsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// What is wrong with the configuration or repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigProblem {
    /// Registry document unreadable or malformed
    InvalidDocument,
    /// Repository id not in the registry
    UnknownRepository,
    /// Working path missing or not a repository
    InaccessibleRepository,
    /// Source or target branch does not exist
    MissingBranch,
    /// Uncommitted changes in a non-dry run
    DirtyWorkingTree,
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidDocument => "invalid configuration",
            Self::UnknownRepository => "unknown repository",
            Self::InaccessibleRepository => "repository inaccessible",
            Self::MissingBranch => "missing branch",
            Self::DirtyWorkingTree => "working tree not clean",
        })
    }
}

/// Migration errors
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Configuration or repository preconditions failed
    #[error("{problem}: {message}")]
    Configuration {
        /// Problem class
        problem: ConfigProblem,
        /// Details
        message: String,
    },

    /// History query failed
    #[error("commit discovery failed while {context}: {source}")]
    Discovery {
        /// What was being queried
        context: String,
        /// Underlying error
        #[source]
        source: VcsError,
    },

    /// One file could not be read or parsed
    #[error("adaptation of {path} failed: {message}")]
    Adaptation {
        /// Repository path
        path: String,
        /// Reason
        message: String,
    },

    /// No expert was confident enough
    #[error("unresolved {conflict_type} conflict in {path}")]
    UnresolvedConflict {
        /// Conflict type label
        conflict_type: String,
        /// Conflicting file
        path: String,
    },

    /// Compliance requirements not met
    #[error("validation failed for commit {commit}: {}", violations.join("; "))]
    ValidationFailure {
        /// Commit hash
        commit: String,
        /// Violated rule codes with messages
        violations: Vec<String>,
    },

    /// Final merge stopped on conflicts; the merge was aborted
    #[error("merge of {branch} conflicts on {}; resolve manually and retry", paths.join(", "))]
    MergeConflict {
        /// Feature branch
        branch: String,
        /// Conflicting paths
        paths: Vec<String>,
    },

    /// Push rejected or failed
    #[error("push of {branch} to {remote} failed: {source}; check remote access and retry")]
    PushFailure {
        /// Remote name
        remote: String,
        /// Branch pushed
        branch: String,
        /// Underlying error
        #[source]
        source: VcsError,
    },

    /// A version-control mutation failed
    #[error("{operation} failed: {source}")]
    Vcs {
        /// Operation attempted
        operation: String,
        /// Underlying error
        #[source]
        source: VcsError,
    },

    /// Pattern analysis failed
    #[error("pattern analysis failed: {0}")]
    Pattern(#[from] PatternError),

    /// Run interrupted
    #[error("migration cancelled during {phase}")]
    Cancelled {
        /// Phase at cancellation
        phase: String,
    },

    /// Filesystem error
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Report could not be produced
    #[error("report generation failed: {0}")]
    Report(String),
}

impl MigrationError {
    /// Create configuration error
    pub fn configuration(problem: ConfigProblem, message: impl Into<String>) -> Self {
        Self::Configuration {
            problem,
            message: message.into(),
        }
    }

    /// Create discovery error
    pub fn discovery(context: impl Into<String>, source: VcsError) -> Self {
        Self::Discovery {
            context: context.into(),
            source,
        }
    }

    /// Create version-control mutation error
    pub fn vcs(operation: impl Into<String>, source: VcsError) -> Self {
        Self::Vcs {
            operation: operation.into(),
            source,
        }
    }

    /// Create I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the run must stop and roll back
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Adaptation { .. } | Self::UnresolvedConflict { .. })
    }

    /// Whether retrying may succeed without changes
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::PushFailure { .. } => true,
            Self::Vcs { source, .. } | Self::Discovery { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Whether a person has to resolve something before retrying
    #[inline]
    #[must_use]
    pub fn requires_manual_resolution(&self) -> bool {
        matches!(
            self,
            Self::MergeConflict { .. } | Self::UnresolvedConflict { .. } | Self::ValidationFailure { .. }
        )
    }

    /// Configuration problem class, if this is a configuration error
    #[inline]
    #[must_use]
    pub fn config_problem(&self) -> Option<ConfigProblem> {
        match self {
            Self::Configuration { problem, .. } => Some(*problem),
            _ => None,
        }
    }
}

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// One rollback action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackStep {
    /// What was attempted
    pub action: String,
    /// Failure message, if it failed
    pub error: Option<String>,
}

impl RollbackStep {
    /// Whether the action succeeded
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of the best-effort rollback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "steps", rename_all = "snake_case")]
pub enum RollbackOutcome {
    /// Nothing had been mutated
    NotNeeded,
    /// Every step succeeded
    Completed(Vec<RollbackStep>),
    /// At least one step failed
    Incomplete(Vec<RollbackStep>),
}

impl RollbackOutcome {
    /// Outcome from executed steps
    #[must_use]
    pub fn from_steps(steps: Vec<RollbackStep>) -> Self {
        if steps.is_empty() {
            Self::NotNeeded
        } else if steps.iter().all(RollbackStep::succeeded) {
            Self::Completed(steps)
        } else {
            Self::Incomplete(steps)
        }
    }

    /// Whether the repository is back where it started
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Incomplete(_))
    }

    /// Executed steps
    #[must_use]
    pub fn steps(&self) -> &[RollbackStep] {
        match self {
            Self::NotNeeded => &[],
            Self::Completed(steps) | Self::Incomplete(steps) => steps,
        }
    }
}

impl fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotNeeded => f.write_str("rollback not needed"),
            Self::Completed(steps) => write!(f, "rollback completed ({} steps)", steps.len()),
            Self::Incomplete(steps) => {
                let failed = steps.iter().filter(|s| !s.succeeded()).count();
                write!(f, "rollback incomplete ({failed} of {} steps failed)", steps.len())
            }
        }
    }
}

/// A fatal run error with its rollback outcome, reported separately
#[derive(Error, Debug)]
#[error("{error} ({rollback})")]
pub struct RunFailure {
    /// Run identifier
    pub run_id: RunId,
    /// The original error
    #[source]
    pub error: MigrationError,
    /// What rollback achieved
    pub rollback: RollbackOutcome,
    /// Workflow state at failure
    pub state: WorkflowState,
    /// Where reports were written, if they were
    pub report_dir: Option<PathBuf>,
}
