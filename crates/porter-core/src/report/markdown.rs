//! Markdown documents for one run

use super::{ReportOutcome, RunRecord};
use crate::workflow::{Phase, WorkflowState};
use porter_experts::{ConflictReport, DomainGuidance, KnowledgeSummary, GENERAL_PRINCIPLES};
use porter_model::NoteLevel;
use porter_validation::ValidationReport;
use std::fmt::Write;

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "not evaluated".to_string(), |v| format!("{:.1}%", v * 100.0))
}

/// Commit and category analysis
#[must_use]
pub fn migration_analysis(record: &RunRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Migration Analysis\n");
    let _ = writeln!(out, "- **Repository**: {}", record.request.repository_id);
    let _ = writeln!(out, "- **Source**: {}", record.request.source_branch);
    let _ = writeln!(out, "- **Target**: {}", record.request.target_branch);
    let _ = writeln!(out, "- **Domain**: {}\n", record.repository.domain);

    let Some(discovery) = &record.discovery else {
        out.push_str("_Discovery did not run._\n");
        return out;
    };
    let _ = writeln!(out, "- **Commits to migrate**: {}\n", discovery.commits.len());
    if discovery.commits.is_empty() {
        out.push_str("_The target already contains every source commit._\n");
        return out;
    }

    out.push_str("## Categories\n\n");
    for (category, count) in discovery.by_category() {
        let _ = writeln!(out, "- {category} ({}): {count}", category.risk());
    }

    out.push_str("\n## Risk\n\n");
    let _ = writeln!(out, "- High: {}", discovery.risk.high);
    let _ = writeln!(out, "- Medium: {}", discovery.risk.medium);
    let _ = writeln!(out, "- Low: {}", discovery.risk.low);
    let _ = writeln!(out, "- **Overall**: {}", discovery.risk.overall());

    out.push_str("\n## Commits\n\n");
    out.push_str("| Commit | Category | Files | Pattern | Message |\n");
    out.push_str("|--------|----------|-------|---------|---------|\n");
    for (commit, (_, pattern)) in discovery.commits.iter().zip(&discovery.patterns) {
        let _ = writeln!(
            out,
            "| `{}` | {} | {} | {:?} | {} |",
            commit.short_hash(),
            commit.category,
            commit.files_changed.len(),
            pattern,
            commit.message.replace('|', "\\|"),
        );
    }

    if !discovery.cross_repo.is_empty() {
        out.push_str("\n## Cross-Repository Changes\n\n");
        for hash in &discovery.cross_repo {
            let _ = writeln!(out, "- `{hash}`");
        }
    }

    out.push_str("\n## Recommendations\n\n");
    for recommendation in discovery.recommendations() {
        let _ = writeln!(out, "- {recommendation}");
    }
    out
}

/// Business change per commit
#[must_use]
pub fn business_logic(record: &RunRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Business Logic Analysis\n");
    let Some(discovery) = &record.discovery else {
        out.push_str("_Discovery did not run._\n");
        return out;
    };
    for (commit, (_, pattern)) in discovery.commits.iter().zip(&discovery.patterns) {
        let _ = writeln!(out, "## {} {}\n", commit.short_hash(), commit.message);
        let _ = writeln!(out, "- **Category**: {}", commit.category);
        let _ = writeln!(out, "- **Summary**: {}", commit.business_logic_summary);
        let _ = writeln!(out, "- **Implementation**: {pattern}");
        if !commit.files_changed.is_empty() {
            out.push_str("- **Files**:\n");
            for file in &commit.files_changed {
                let _ = writeln!(out, "  - `{file}`");
            }
        }
        out.push('\n');
    }
    out
}

/// How each file was adapted and how its conflicts were resolved
#[must_use]
pub fn adaptation_mapping(record: &RunRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Pattern Adaptation Mapping\n");
    if record.plans.is_empty() {
        out.push_str("_No commits were planned._\n");
        return out;
    }
    for plan in &record.plans {
        let _ = writeln!(out, "## {} {}\n", plan.commit.short_hash(), plan.commit.message);
        for adaptation in &plan.adaptation.adaptations {
            let action = if adaptation.is_removal() { "removed" } else { adaptation.component_kind.label() };
            let _ = writeln!(out, "### `{}` ({action})\n", adaptation.file_path);
            for note in adaptation.change_notes.iter().filter(|n| n.level != NoteLevel::Note) {
                let _ = writeln!(out, "- {note}");
            }
            for conflict in &adaptation.conflicts {
                let _ = writeln!(
                    out,
                    "- Conflict `{}` ({}): {}",
                    conflict.conflict_type, conflict.severity, conflict.description
                );
                if let Some(resolution) = plan.resolutions.iter().find(|r| r.conflict_id == conflict.id) {
                    if resolution.manual_resolution_required {
                        out.push_str("  - **Manual resolution required**\n");
                    } else {
                        let _ = writeln!(
                            out,
                            "  - Resolution ({:.0}%, {}): {}",
                            resolution.confidence * 100.0,
                            resolution.contributing_experts.join(", "),
                            resolution.recommendation
                        );
                    }
                    if !resolution.alternatives.is_empty() {
                        let _ = writeln!(out, "  - Alternatives: {}", resolution.alternatives.join("; "));
                    }
                }
            }
            out.push('\n');
        }
        for issue in &plan.adaptation.issues {
            let _ = writeln!(out, "- Skipped: {issue}");
        }
        if !plan.adaptation.implementation_notes.is_empty() {
            out.push_str("**Implementation notes**\n\n");
            for note in &plan.adaptation.implementation_notes {
                let _ = writeln!(out, "- {note}");
            }
            out.push('\n');
        }
        if !plan.pattern_compliance.compliant {
            let _ = writeln!(out, "**Pattern compliance**: {:.0}%\n", plan.pattern_compliance.score * 100.0);
            for issue in &plan.pattern_compliance.issues {
                let _ = writeln!(out, "- {issue}");
            }
            out.push('\n');
        }
    }
    out
}

/// Rule compliance across commits
#[must_use]
pub fn rules_validation(report: Option<&ValidationReport>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Rules Validation Report\n");
    let Some(report) = report else {
        out.push_str("_Validation did not run._\n");
        return out;
    };
    let _ = writeln!(out, "- **Commits validated**: {}", report.total_validations);
    let _ = writeln!(out, "- **Average compliance**: {}\n", percent(report.average_compliance));

    out.push_str("## Rules\n\n");
    out.push_str("| Rule | Name | Category | Compliance | Violations | Not evaluated |\n");
    out.push_str("|------|------|----------|------------|------------|---------------|\n");
    for rule in &report.rules {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            rule.rule_code,
            rule.name,
            rule.category,
            percent(rule.compliance),
            rule.violations,
            rule.not_evaluated
        );
    }

    if !report.violations_by_category.is_empty() {
        out.push_str("\n## Violations by Category\n\n");
        for (category, count) in &report.violations_by_category {
            let _ = writeln!(out, "- {category}: {count}");
        }
    }
    if !report.most_common_violations.is_empty() {
        out.push_str("\n## Most Common Violations\n\n");
        for violation in &report.most_common_violations {
            let _ = writeln!(out, "- {}: {}", violation.rule_code, violation.count);
        }
    }

    for validation in report.validations.iter().filter(|v| !v.violations.is_empty()) {
        let _ = writeln!(out, "\n## Commit `{}`\n", validation.commit);
        for violation in &validation.violations {
            let _ = writeln!(
                out,
                "- **{}** ({}, {:.2}): {}",
                violation.rule_code, violation.severity, violation.score, violation.message
            );
        }
    }

    if !report.recommendations.is_empty() {
        out.push_str("\n## Recommendations\n\n");
        for recommendation in &report.recommendations {
            let _ = writeln!(out, "- {recommendation}");
        }
    }
    out
}

/// Expert panel, conflict handling and domain guidance
#[must_use]
pub fn expert_knowledge(
    knowledge: &KnowledgeSummary,
    conflicts: &ConflictReport,
    guidance: Option<&DomainGuidance>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Expert Knowledge\n");
    out.push_str("## Experts\n\n");
    for expert in &knowledge.experts {
        let source = if expert.fallback { "built-in" } else { "knowledge base" };
        let _ = writeln!(
            out,
            "- **{}** (`{}`, {}): {} patterns, {} rules, {source}",
            expert.name, expert.kind, expert.family, expert.pattern_count, expert.rule_count
        );
    }

    out.push_str("\n## Conflicts\n\n");
    let _ = writeln!(out, "- **Total**: {}", conflicts.total_conflicts);
    let _ = writeln!(out, "- **Resolved**: {}", conflicts.resolved_conflicts);
    for (conflict_type, count) in &conflicts.common_types {
        let _ = writeln!(out, "- `{conflict_type}`: {count}");
    }
    if !conflicts.expert_usage.is_empty() {
        out.push_str("\n### Expert Usage\n\n");
        for (expert, count) in &conflicts.expert_usage {
            let _ = writeln!(out, "- {expert}: {count}");
        }
    }

    if let Some(guidance) = guidance {
        let _ = writeln!(out, "\n## {} Guidance ({})\n", guidance.domain, guidance.expert);
        for (title, items) in [
            ("Patterns", &guidance.patterns),
            ("Rules", &guidance.rules),
            ("Common issues", &guidance.common_issues),
        ] {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "**{title}**\n");
            for item in items {
                let _ = writeln!(out, "- {item}");
            }
            out.push('\n');
        }
    }

    out.push_str("\n## General Principles\n\n");
    for principle in GENERAL_PRINCIPLES {
        let _ = writeln!(out, "- {principle}");
    }
    if !conflicts.recommendations.is_empty() {
        out.push_str("\n## Knowledge Recommendations\n\n");
        for recommendation in &conflicts.recommendations {
            let _ = writeln!(out, "- {recommendation}");
        }
    }
    out
}

fn status_label(outcome: &ReportOutcome<'_>) -> String {
    match outcome {
        ReportOutcome::Success(status) => status.to_string(),
        ReportOutcome::Failure { .. } => "FAILED".to_string(),
    }
}

/// Final human-readable run report
#[must_use]
pub fn migration_report(record: &RunRecord, state: &WorkflowState, outcome: &ReportOutcome<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Migration Report\n");
    let _ = writeln!(out, "- **Migration ID**: {}", record.run_id);
    let _ = writeln!(out, "- **Repository**: {}", record.request.repository_id);
    let _ = writeln!(
        out,
        "- **Branches**: {} → {}",
        record.request.source_branch, record.request.target_branch
    );
    let _ = writeln!(out, "- **Status**: {}", status_label(outcome));
    let _ = writeln!(out, "- **Phase**: {} ({}%)", state.phase, state.progress);
    let _ = writeln!(out, "- **Duration**: {}s", state.duration().num_seconds());
    let _ = writeln!(out, "- **Commits migrated**: {}", state.implemented.len());
    if let Some(branch) = &state.feature_branch {
        let _ = writeln!(out, "- **Feature branch**: {branch}");
    }
    let _ = writeln!(out, "- **Average compliance**: {}", percent(record.average_compliance()));
    let _ = writeln!(out, "- **Output**: {}\n", record.run_id);

    out.push_str("## Phases\n\n");
    let mut last = None;
    for transition in &state.history {
        if last == Some(transition.phase) {
            continue;
        }
        last = Some(transition.phase);
        let _ = writeln!(
            out,
            "- {} {} ({}%)",
            transition.at.format("%H:%M:%S"),
            transition.phase,
            transition.progress
        );
    }

    if !state.implemented.is_empty() {
        out.push_str("\n## Commits\n\n");
        for commit in &state.implemented {
            let migrated = commit.migrated.as_deref().unwrap_or("dry run");
            let _ = writeln!(out, "- `{}` → `{migrated}`: {} ({} files)", commit.original, commit.message, commit.files);
        }
    }
    if !state.skipped.is_empty() {
        out.push_str("\n## Skipped\n\n");
        for hash in &state.skipped {
            let _ = writeln!(out, "- `{hash}`");
        }
    }
    if !state.issues.is_empty() {
        out.push_str("\n## Issues\n\n");
        for issue in &state.issues {
            let _ = writeln!(out, "- {issue}");
        }
    }

    if let ReportOutcome::Failure { error, rollback } = outcome {
        out.push_str("\n## Errors\n\n");
        let _ = writeln!(out, "- {error}");
        let _ = writeln!(out, "\n## Rollback\n\n- {rollback}");
        for step in rollback.steps() {
            match &step.error {
                Some(e) => {
                    let _ = writeln!(out, "- {}: failed ({e})", step.action);
                }
                None => {
                    let _ = writeln!(out, "- {}: ok", step.action);
                }
            }
        }
    }
    out
}

/// Short summary with next steps
#[must_use]
pub fn workflow_summary(record: &RunRecord, state: &WorkflowState, outcome: &ReportOutcome<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Workflow Summary\n");
    let _ = writeln!(out, "- **Migration ID**: {}", record.run_id);
    let _ = writeln!(out, "- **Status**: {}", status_label(outcome));
    let _ = writeln!(out, "- **Final phase**: {}", state.phase);
    let _ = writeln!(out, "- **Progress**: {}%", state.progress);
    let _ = writeln!(out, "- **Issues**: {}\n", state.issues.len());

    out.push_str("## Next Steps\n\n");
    let target = &record.request.target_branch;
    match outcome {
        ReportOutcome::Success(_) if state.phase == Phase::Completed => {
            let _ = writeln!(out, "1. Review the merge commit on `{target}`");
            out.push_str("2. Run the full test suite\n");
            out.push_str("3. Address any recorded issues\n");
        }
        ReportOutcome::Success(_) if state.phase == Phase::Reviewed => {
            out.push_str("1. Review the pattern adaptation mapping\n");
            out.push_str("2. Re-run without `--dry-run` to apply the migration\n");
        }
        ReportOutcome::Success(_) => {
            let _ = writeln!(out, "1. Nothing to migrate; `{target}` is up to date");
        }
        ReportOutcome::Failure { error, rollback } => {
            let _ = writeln!(out, "1. Fix the cause: {error}");
            if error.requires_manual_resolution() {
                out.push_str("2. Resolve the conflicts manually before retrying\n");
            } else if error.is_retryable() {
                out.push_str("2. Retry the migration\n");
            } else {
                out.push_str("2. Re-run the migration once fixed\n");
            }
            if !rollback.is_success() {
                let _ = writeln!(out, "3. Rollback was incomplete: restore `{target}` by hand");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepositoryConfig;
    use crate::discovery::DiscoveryReport;
    use crate::engine::RunStatus;
    use crate::error::{MigrationError, RollbackOutcome, RollbackStep};
    use porter_model::{Commit, CommitCategory, DomainType, MigrationRequest, RunId};

    fn record() -> RunRecord {
        let mut record = RunRecord::new(
            RunId::from_millis(42),
            MigrationRequest::new("algo", "feature", "develop"),
            RepositoryConfig::new("/tmp/algo", DomainType::JavaAlgorithm),
        );
        record.discovery = Some(DiscoveryReport::new(vec![
            Commit::new("aaaaaaaa11", "Fix rounding | totals", CommitCategory::BugFix)
                .with_files(vec!["src/Calc.java".into()]),
            Commit::new("bbbbbbbb22", "Add coordinated sync with python model", CommitCategory::FeatureAddition),
        ]));
        record
    }

    #[test]
    fn analysis_lists_commits_and_risk() {
        let doc = migration_analysis(&record());
        assert!(doc.contains("- **Commits to migrate**: 2"));
        assert!(doc.contains("| `aaaaaaaa` | Bug Fix |"));
        assert!(doc.contains("Fix rounding \\| totals"));
        assert!(doc.contains("## Cross-Repository Changes"));
        assert!(doc.contains("- **Overall**: "));
    }

    #[test]
    fn mapping_shows_resolution_alternatives() {
        use crate::adaptation::CommitAdaptation;
        use crate::engine::CommitPlan;
        use porter_model::{Adaptation, ComponentKind, Conflict, ConflictType, ExpertOpinion, Resolution};
        use porter_validation::{CommitValidation, PatternCompliance};

        let commit = Commit::new("cccccccc33", "Add price module", CommitCategory::FeatureAddition);
        let conflict = Conflict::new(
            ConflictType::PatternMismatch,
            DomainType::JavaAlgorithm,
            "src/PriceModule.java",
            "parent differs",
        );
        let opinion = ExpertOpinion::new("Algorithm Pattern Expert", "extend AbstractModule", "r", 0.9)
            .with_alternatives(["Follow source branch patterns exactly", "Create hybrid approach"]);
        let mut adaptation = Adaptation::new("src/PriceModule.java", ComponentKind::Module, Some("class P {}".into()));
        adaptation.conflicts.push(conflict.clone());

        let mut r = record();
        r.plans.push(CommitPlan {
            adaptation: CommitAdaptation {
                commit: commit.hash.clone(),
                adaptations: vec![adaptation],
                issues: Vec::new(),
                implementation_notes: Vec::new(),
            },
            resolutions: vec![Resolution::from_opinion(conflict.id, &opinion)],
            validation: CommitValidation {
                commit: commit.hash.clone(),
                results: Vec::new(),
                overall_compliance: None,
                violations: Vec::new(),
                recommendations: Vec::new(),
            },
            pattern_compliance: PatternCompliance {
                compliant: true,
                issues: Vec::new(),
                score: 1.0,
            },
            commit,
        });

        let doc = adaptation_mapping(&r);
        assert!(doc.contains("Resolution (90%, Algorithm Pattern Expert): extend AbstractModule"));
        assert!(doc.contains("  - Alternatives: Follow source branch patterns exactly; Create hybrid approach"));
    }

    #[test]
    fn analysis_without_discovery() {
        let mut r = record();
        r.discovery = None;
        assert!(migration_analysis(&r).contains("_Discovery did not run._"));
    }

    #[test]
    fn missing_validation_is_explicit() {
        assert!(rules_validation(None).contains("_Validation did not run._"));
    }

    #[test]
    fn failure_report_keeps_error_and_rollback_apart() {
        let r = record();
        let mut state = WorkflowState::new(r.run_id.clone());
        state.advance(Phase::TargetPrepared);
        let error = MigrationError::PushFailure {
            remote: "origin".into(),
            branch: "develop".into(),
            source: porter_vcs::VcsError::command_failed("git push", Some(1), "rejected"),
        };
        let rollback = RollbackOutcome::from_steps(vec![RollbackStep {
            action: "delete branch".into(),
            error: Some("locked".into()),
        }]);
        state.fail(rollback.steps().to_vec());
        let outcome = ReportOutcome::Failure { error: &error, rollback: &rollback };

        let report = migration_report(&r, &state, &outcome);
        assert!(report.contains("- **Status**: FAILED"));
        assert!(report.contains("## Errors"));
        assert!(report.contains("- delete branch: failed (locked)"));

        let summary = workflow_summary(&r, &state, &outcome);
        assert!(summary.contains("2. Retry the migration"));
        assert!(summary.contains("3. Rollback was incomplete"));
    }

    #[test]
    fn dry_run_summary_suggests_real_run() {
        let r = record();
        let mut state = WorkflowState::new(r.run_id.clone());
        state.advance(Phase::Reviewed);
        let summary = workflow_summary(&r, &state, &ReportOutcome::Success(RunStatus::DryRun));
        assert!(summary.contains("- **Status**: DRY RUN"));
        assert!(summary.contains("without `--dry-run`"));
    }
}
