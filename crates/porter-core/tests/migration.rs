//! End-to-end runs of the migration engine against the in-memory repository

use porter_core::engine::issue;
use porter_core::{
    ConfigProblem, MigrationEngine, MigrationError, MigrationSettings, Phase, RepositoryConfig,
    RepositoryRegistry, RollbackOutcome, RunStatus,
};
use porter_model::{DomainType, MigrationOptions, MigrationRequest};
use porter_test_utils::{loader_without_validate_row, FakeVcs, RepoBuilder};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn registry(vcs: &FakeVcs, domain: DomainType, output: &Path, push: bool) -> RepositoryRegistry {
    RepositoryRegistry::new()
        .with_repository("repo", RepositoryConfig::new(vcs.path(), domain))
        .with_settings(
            MigrationSettings::new()
                .with_output_dir(output)
                .with_experts_dir(output.join("no-experts"))
                .with_push(push),
        )
}

fn engine(vcs: &Arc<FakeVcs>, domain: DomainType, output: &Path, push: bool) -> MigrationEngine {
    MigrationEngine::new(registry(vcs, domain, output, push)).with_vcs(vcs.clone())
}

fn request(options: MigrationOptions) -> MigrationRequest {
    MigrationRequest::new("repo", "feature", "develop").with_options(options)
}

#[tokio::test]
async fn three_commits_complete_and_merge() {
    let out = TempDir::new().unwrap();
    let vcs = Arc::new(RepoBuilder::java_three_commits());
    let outcome = engine(&vcs, DomainType::JavaAlgorithm, out.path(), true)
        .run(request(MigrationOptions::default()))
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.state.phase, Phase::Completed);
    assert_eq!(outcome.state.progress, 100);
    assert_eq!(outcome.migrated_count(), 3);
    assert!(outcome.state.implemented.iter().all(|c| c.migrated.is_some()));
    assert!(!outcome.state.issues.iter().any(|i| i.code == "review_mismatch"));

    // commits are discovered and replayed oldest first
    let replayed: Vec<&str> = outcome.state.implemented.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(replayed, vec!["Add store load module", "Add price module", "Add rank module"]);

    // merge commit on top of the target with the feature branch as second parent
    let subjects = vcs.subjects("develop");
    assert_eq!(subjects[0], "Merge migration: feature → develop (3 commits)");
    assert_eq!(vcs.parents("develop").len(), 2);
    assert!(!vcs
        .branch_names()
        .iter()
        .any(|b| b.starts_with("migration/")));
    assert_eq!(vcs.pushes(), vec![("origin".to_string(), "develop".to_string())]);
    assert_eq!(vcs.fetches(), 1);
    assert!(vcs
        .snapshot("develop")
        .contains_key("src/main/java/com/acme/algo/RankModule.java"));

    let dir = outcome.report_dir.expect("reports written");
    for name in ["MIGRATION_REPORT.md", "WORKFLOW_SUMMARY.md", "migration-report.json", "target-patterns.md"] {
        assert!(dir.join(name).is_file(), "{name} missing");
    }
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("migration-report.json")).unwrap()).unwrap();
    assert_eq!(json["record"]["plans"][0]["commit"]["message"], "Add store load module");
    let report = std::fs::read_to_string(dir.join("MIGRATION_REPORT.md")).unwrap();
    assert!(report.contains("- **Status**: SUCCESS"));
    assert!(report.contains("- **Commits migrated**: 3"));
}

#[tokio::test]
async fn progress_history_is_monotonic() {
    let out = TempDir::new().unwrap();
    let vcs = Arc::new(RepoBuilder::java_three_commits());
    let outcome = engine(&vcs, DomainType::JavaAlgorithm, out.path(), false)
        .run(request(MigrationOptions::default()))
        .await
        .unwrap();

    let progress: Vec<u8> = outcome.state.history.iter().map(|t| t.progress).collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
    let ranks: Vec<u8> = outcome.state.history.iter().map(|t| t.phase.rank()).collect();
    assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
    assert!(outcome.state.history.iter().any(|t| t.progress == 90));
    assert!(vcs.pushes().is_empty());
}

#[tokio::test]
async fn dry_run_stops_at_review_without_mutating() {
    let out = TempDir::new().unwrap();
    let vcs = Arc::new(RepoBuilder::java_three_commits());
    let before = vcs.mutations();
    let develop = vcs.tip("develop");

    let outcome = engine(&vcs, DomainType::JavaAlgorithm, out.path(), true)
        .run(request(MigrationOptions::default().with_dry_run(true)))
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::DryRun);
    assert_eq!(outcome.state.phase, Phase::Reviewed);
    assert!(outcome.state.progress < 100);
    assert_eq!(outcome.migrated_count(), 3);
    assert!(outcome.state.implemented.iter().all(|c| c.migrated.is_none()));
    assert_eq!(vcs.mutations(), before);
    assert_eq!(vcs.tip("develop"), develop);
    assert!(vcs.pushes().is_empty());
    assert!(!vcs
        .branch_names()
        .iter()
        .any(|b| b.starts_with("migration/")));
}

#[tokio::test]
async fn nothing_to_migrate_when_branches_agree() {
    let out = TempDir::new().unwrap();
    let vcs = Arc::new(RepoBuilder::new("develop", "feature").build());
    let outcome = engine(&vcs, DomainType::JavaAlgorithm, out.path(), true)
        .run(request(MigrationOptions::default()))
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::NothingToMigrate);
    assert_eq!(outcome.migrated_count(), 0);
    assert_eq!(outcome.state.issues_with(issue::NO_COMMITS).count(), 1);
    assert_eq!(vcs.mutations(), 0);
}

#[tokio::test]
async fn loader_without_row_validation_is_flagged() {
    let out = TempDir::new().unwrap();
    let loader = loader_without_validate_row("StoreLoadApi");
    let vcs = Arc::new(
        RepoBuilder::new("develop", "feature")
            .source_commit(
                "Add store load api",
                &[("loadapi/store/StoreLoadApi.py", Some(loader.as_str()))],
            )
            .build(),
    );
    let outcome = engine(&vcs, DomainType::PythonLoadApi, out.path(), false)
        .run(request(
            MigrationOptions::default()
                .with_dry_run(true)
                .with_skip_validation(true),
        ))
        .await
        .unwrap();
    assert_eq!(outcome.status, RunStatus::DryRun);

    let dir = outcome.report_dir.expect("reports written");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("migration-report.json")).unwrap()).unwrap();
    let plan = &json["record"]["plans"][0];

    let notes = plan["adaptation"]["adaptations"][0]["change_notes"].as_array().unwrap();
    assert!(notes
        .iter()
        .any(|n| n["level"] == "WARNING" && n["text"].as_str().unwrap().contains("validate_row")));

    let violations = plan["validation"]["violations"].as_array().unwrap();
    let rule = violations
        .iter()
        .find(|v| v["rule_code"] == "new_input_integration")
        .expect("new_input_integration violation");
    assert!(rule["score"].as_f64().unwrap() < 0.8);
}

#[tokio::test]
async fn push_failure_rolls_back_the_target() {
    let out = TempDir::new().unwrap();
    let vcs = Arc::new(RepoBuilder::java_three_commits());
    let develop = vcs.tip("develop");
    vcs.fail_push("remote rejected");

    let failure = engine(&vcs, DomainType::JavaAlgorithm, out.path(), true)
        .run(request(MigrationOptions::default()))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, MigrationError::PushFailure { .. }));
    assert!(failure.error.is_retryable());
    assert!(matches!(failure.rollback, RollbackOutcome::Completed(_)));
    assert_eq!(failure.state.phase, Phase::Failed);
    assert_eq!(vcs.tip("develop"), develop);
    assert!(vcs.head().is_branch("develop"));
    assert!(failure.report_dir.is_some());
}

#[tokio::test]
async fn merge_conflict_aborts_and_rolls_back() {
    let out = TempDir::new().unwrap();
    let vcs = Arc::new(RepoBuilder::java_three_commits());
    let develop = vcs.tip("develop");
    vcs.fail_next_merge(&["src/main/java/com/acme/algo/PriceModule.java"]);

    let failure = engine(&vcs, DomainType::JavaAlgorithm, out.path(), true)
        .run(request(MigrationOptions::default()))
        .await
        .unwrap_err();

    match &failure.error {
        MigrationError::MergeConflict { paths, .. } => {
            assert_eq!(paths, &vec!["src/main/java/com/acme/algo/PriceModule.java".to_string()]);
        }
        other => panic!("expected merge conflict, got {other}"),
    }
    assert!(failure.error.requires_manual_resolution());
    assert!(failure.rollback.is_success());
    assert_eq!(vcs.tip("develop"), develop);
    assert!(!vcs
        .branch_names()
        .iter()
        .any(|b| b.starts_with("migration/")));
    assert!(vcs.pushes().is_empty());
}

#[tokio::test]
async fn unknown_repository_is_a_configuration_error() {
    let out = TempDir::new().unwrap();
    let vcs = Arc::new(RepoBuilder::java_three_commits());
    let failure = engine(&vcs, DomainType::JavaAlgorithm, out.path(), true)
        .run(MigrationRequest::new("nope", "feature", "develop"))
        .await
        .unwrap_err();

    assert_eq!(failure.error.config_problem(), Some(ConfigProblem::UnknownRepository));
    assert_eq!(failure.rollback, RollbackOutcome::NotNeeded);
    assert!(failure.report_dir.is_none());
    assert_eq!(vcs.mutations(), 0);
}

#[tokio::test]
async fn missing_branch_fails_before_mutation() {
    let out = TempDir::new().unwrap();
    let vcs = Arc::new(RepoBuilder::java_three_commits());
    let failure = engine(&vcs, DomainType::JavaAlgorithm, out.path(), true)
        .run(MigrationRequest::new("repo", "hotfix", "develop"))
        .await
        .unwrap_err();

    assert_eq!(failure.error.config_problem(), Some(ConfigProblem::MissingBranch));
    assert_eq!(failure.rollback, RollbackOutcome::NotNeeded);
    assert_eq!(vcs.mutations(), 0);
}

#[tokio::test]
async fn dirty_working_tree_is_rejected() {
    let out = TempDir::new().unwrap();
    let vcs = Arc::new(RepoBuilder::java_three_commits());
    std::fs::write(vcs.path().join("scratch.txt"), "local edit").unwrap();

    let failure = engine(&vcs, DomainType::JavaAlgorithm, out.path(), true)
        .run(request(MigrationOptions::default()))
        .await
        .unwrap_err();

    assert_eq!(failure.error.config_problem(), Some(ConfigProblem::DirtyWorkingTree));
    assert_eq!(vcs.mutations(), 0);
    assert!(vcs.path().join("scratch.txt").exists());
}

#[tokio::test]
async fn cancellation_before_start_rolls_nothing_back() {
    let out = TempDir::new().unwrap();
    let vcs = Arc::new(RepoBuilder::java_three_commits());
    let engine = engine(&vcs, DomainType::JavaAlgorithm, out.path(), true);
    engine.cancel_token().cancel();

    let failure = engine.run(request(MigrationOptions::default())).await.unwrap_err();
    assert!(matches!(failure.error, MigrationError::Cancelled { .. }));
    assert_eq!(failure.rollback, RollbackOutcome::NotNeeded);
    assert_eq!(vcs.mutations(), 0);
}

#[tokio::test]
async fn cancellation_interrupts_a_stalled_push() {
    let out = TempDir::new().unwrap();
    let vcs = Arc::new(RepoBuilder::java_three_commits());
    let develop = vcs.tip("develop");
    vcs.stall_push();
    let engine = engine(&vcs, DomainType::JavaAlgorithm, out.path(), true);

    let cancel = engine.cancel_token();
    let watched = Arc::clone(&vcs);
    tokio::spawn(async move {
        while watched.stalled_pushes() == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        cancel.cancel();
    });

    let failure = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        engine.run(request(MigrationOptions::default())),
    )
    .await
    .expect("cancel interrupts the hung push")
    .unwrap_err();

    assert!(matches!(failure.error, MigrationError::Cancelled { .. }));
    assert!(matches!(failure.rollback, RollbackOutcome::Completed(_)));
    assert_eq!(failure.state.phase, Phase::Failed);
    assert_eq!(vcs.stalled_pushes(), 1);
    assert!(vcs.pushes().is_empty());
    assert_eq!(vcs.tip("develop"), develop);
    assert!(vcs.head().is_branch("develop"));
}
