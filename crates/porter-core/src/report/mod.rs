//! Per-run report artifacts
//!
//! Everything lands in `<output_dir>/<run id>/`. Writing is best effort:
//! the engine logs failures and never lets them replace a migration error.

pub mod markdown;

use crate::config::RepositoryConfig;
use crate::discovery::DiscoveryReport;
use crate::engine::{CommitPlan, RunStatus};
use crate::error::{MigrationError, MigrationResult, RollbackOutcome};
use crate::workflow::WorkflowState;
use porter_experts::{ConflictReport, DomainGuidance, ExpertCoordinator, KnowledgeSummary};
use porter_model::{MigrationRequest, PatternProfile, RunId};
use porter_patterns::render_profile;
use porter_validation::ValidationReport;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything gathered about a run, filled in phase by phase
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    /// Run identifier
    pub run_id: RunId,
    /// The request
    pub request: MigrationRequest,
    /// Repository entry used
    pub repository: RepositoryConfig,
    /// Repository and branch checks passed
    #[serde(skip)]
    pub preflight_passed: bool,
    /// Discovered commits and their analysis
    pub discovery: Option<DiscoveryReport>,
    /// Source branch profile
    pub source_profile: Option<PatternProfile>,
    /// Target branch profile
    pub target_profile: Option<PatternProfile>,
    /// One plan per discovered commit
    pub plans: Vec<CommitPlan>,
    /// Aggregate validation
    pub validation: Option<ValidationReport>,
    /// Guidance from the domain's primary expert
    pub guidance: Option<DomainGuidance>,
}

impl RunRecord {
    /// Empty record for a run
    #[must_use]
    pub fn new(run_id: RunId, request: MigrationRequest, repository: RepositoryConfig) -> Self {
        Self {
            run_id,
            request,
            repository,
            preflight_passed: false,
            discovery: None,
            source_profile: None,
            target_profile: None,
            plans: Vec::new(),
            validation: None,
            guidance: None,
        }
    }

    /// Mean compliance across validated commits
    #[must_use]
    pub fn average_compliance(&self) -> Option<f64> {
        self.validation.as_ref().and_then(|v| v.average_compliance)
    }
}

/// How the run ended, for report wording
#[derive(Debug, Clone, Copy)]
pub enum ReportOutcome<'a> {
    /// Finished without a fatal error
    Success(RunStatus),
    /// Stopped on a fatal error
    Failure {
        /// The error
        error: &'a MigrationError,
        /// Rollback result
        rollback: &'a RollbackOutcome,
    },
}

#[derive(Serialize)]
struct JsonReport<'a> {
    run_id: &'a RunId,
    status: String,
    record: &'a RunRecord,
    state: &'a WorkflowState,
    conflicts: ConflictReport,
    knowledge: KnowledgeSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rollback: Option<&'a RollbackOutcome>,
}

/// Writes run artifacts
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    /// Writer rooted at an output directory
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory for a run
    #[must_use]
    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.output_dir.join(run_id.as_str())
    }

    /// Write every artifact; returns the run directory
    ///
    /// # Errors
    ///
    /// Returns an I/O error for the first file that cannot be written, or a
    /// report error if the JSON document cannot be serialized.
    pub async fn write(
        &self,
        record: &RunRecord,
        state: &WorkflowState,
        experts: &ExpertCoordinator,
        outcome: ReportOutcome<'_>,
    ) -> MigrationResult<PathBuf> {
        let dir = self.run_dir(&record.run_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| MigrationError::io(&dir, e))?;

        let conflicts = experts.conflict_report();
        let knowledge = experts.knowledge_summary();

        let mut documents: Vec<(&str, String)> = vec![
            ("migration-analysis.md", markdown::migration_analysis(record)),
            ("business-logic-analysis.md", markdown::business_logic(record)),
            ("pattern-adaptation-mapping.md", markdown::adaptation_mapping(record)),
            ("rules-validation-report.md", markdown::rules_validation(record.validation.as_ref())),
            (
                "expert-knowledge.md",
                markdown::expert_knowledge(&knowledge, &conflicts, record.guidance.as_ref()),
            ),
            ("MIGRATION_REPORT.md", markdown::migration_report(record, state, &outcome)),
            ("WORKFLOW_SUMMARY.md", markdown::workflow_summary(record, state, &outcome)),
        ];
        if let Some(profile) = &record.source_profile {
            documents.push(("source-patterns.md", render_profile("Source Patterns", profile)));
        }
        if let Some(profile) = &record.target_profile {
            documents.push(("target-patterns.md", render_profile("Target Patterns", profile)));
        }

        let (status, error, rollback) = match outcome {
            ReportOutcome::Success(status) => (status.to_string(), None, None),
            ReportOutcome::Failure { error, rollback } => {
                ("FAILED".to_string(), Some(error.to_string()), Some(rollback))
            }
        };
        let json = JsonReport {
            run_id: &record.run_id,
            status,
            record,
            state,
            conflicts,
            knowledge,
            error,
            rollback,
        };
        let json = serde_json::to_string_pretty(&json)
            .map_err(|e| MigrationError::Report(format!("cannot serialize migration report: {e}")))?;
        documents.push(("migration-report.json", json));

        for (name, content) in documents {
            write_file(&dir.join(name), content).await?;
        }
        Ok(dir)
    }
}

async fn write_file(path: &Path, content: String) -> MigrationResult<()> {
    debug!(path = %path.display(), bytes = content.len(), "writing report");
    tokio::fs::write(path, content)
        .await
        .map_err(|e| MigrationError::io(path, e))
}
