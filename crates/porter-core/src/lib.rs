//! Porter Core - cross-branch migration orchestration
//!
//! Replays the commits a source branch has and a target branch lacks, each
//! adapted to the target's conventions, on a dedicated feature branch that
//! is merged back with `--no-ff`.
//!
//! - [`config`]: repository registry and run settings (TOML or YAML)
//! - [`discovery`]: commit discovery, categorization and risk
//! - [`adaptation`]: per-file adaptation through a domain strategy
//! - [`workflow`]: phase state machine, branch operations and rollback
//! - [`engine`]: the end-to-end run
//! - [`report`]: per-run markdown and JSON artifacts
//!
//! Every mutation happens after planning: discovery, adaptation, expert
//! resolution and validation are all complete before the feature branch is
//! created, so a plan that fails validation leaves the repository untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use porter_core::{MigrationEngine, RepositoryRegistry};
//! use porter_model::MigrationRequest;
//!
//! let registry = RepositoryRegistry::load(Path::new("config/repositories.toml")).await?;
//! let engine = MigrationEngine::load(registry).await;
//! match engine.run(MigrationRequest::new("algo", "feature", "develop")).await {
//!     Ok(outcome) => println!("{} commits migrated", outcome.migrated_count()),
//!     Err(failure) => eprintln!("{} ({})", failure.error, failure.rollback),
//! }
//! ```

#![warn(missing_docs)]

pub mod adaptation;
pub mod cancel;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod report;
pub mod workflow;

pub use adaptation::{AdaptationEngine, CommitAdaptation};
pub use cancel::CancelToken;
pub use config::{MigrationSettings, RepositoryConfig, RepositoryRegistry};
pub use discovery::{categorize, CommitDiscoverer, DiscoveryReport, ImplementationPattern, RiskAssessment};
pub use engine::{CommitPlan, MigrationEngine, MigrationOutcome, RunStatus};
pub use error::{
    ConfigProblem, MigrationError, MigrationResult, RollbackOutcome, RollbackStep, RunFailure,
};
pub use report::{ReportOutcome, ReportWriter, RunRecord};
pub use workflow::{Phase, WorkflowManager, WorkflowState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
