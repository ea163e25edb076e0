//! Rule engine behaviour over realistic adaptations

use porter_model::{Adaptation, Commit, CommitCategory, ComponentKind, DomainType};
use porter_test_utils::{conforming_loader, loader_without_validate_row, sql_view, tsv_template};
use porter_validation::{
    mean_score, Assessment, Rule, RuleCatalog, RuleInput, RuleOutcome, RuleResult,
    ValidationContext, ValidationFramework, ViolationSeverity,
};
use proptest::prelude::*;

fn context() -> ValidationContext {
    ValidationContext::new("loadapi", DomainType::PythonLoadApi, "feature/stores", "develop")
        .with_base_branches(vec!["develop".into(), "master".into()])
}

fn loader_commit() -> Commit {
    Commit::new("f00dfeed", "Add store loader", CommitCategory::FeatureAddition)
        .with_files(vec!["loaders/StoreLoadApi.py".into()])
}

#[test]
fn loader_missing_row_validation_violates_input_integration() {
    let framework = ValidationFramework::with_builtin_rules();
    let adaptations = vec![Adaptation::new(
        "loaders/StoreLoadApi.py",
        ComponentKind::DataLoader,
        Some(loader_without_validate_row("StoreLoadApi")),
    )];

    let validation = framework.validate(&loader_commit(), &adaptations, &context());

    let result = validation.result("new_input_integration").unwrap();
    assert!(result.score().unwrap() < 0.8);
    let violation = validation.violation("new_input_integration").unwrap();
    assert_eq!(violation.severity, ViolationSeverity::Medium);
    assert_eq!(violation.message, "Missing validation method in LoadAPI");
    assert!(validation
        .recommendations
        .contains(&"Implement validate_row() method".to_string()));
}

#[test]
fn consistent_headers_across_loader_view_and_template() {
    let framework = ValidationFramework::with_builtin_rules();
    let columns = ["store_id", "region", "amount"];
    let adaptations = vec![
        Adaptation::new(
            "loaders/StoreLoadApi.py",
            ComponentKind::DataLoader,
            Some(conforming_loader("StoreLoadApi")),
        ),
        Adaptation::new(
            "views/store_input_view.sql",
            ComponentKind::QueryView,
            Some(sql_view("store_input_view", &columns)),
        ),
        Adaptation::new(
            "templates/store.tsv",
            ComponentKind::Template,
            Some(tsv_template(&columns, 2)),
        ),
    ];

    let validation = framework.validate(&loader_commit(), &adaptations, &context());
    let headers = validation.result("header_consistency_validation").unwrap();
    assert_eq!(headers.outcome, RuleOutcome::Evaluated(1.0));
    assert_eq!(validation.result("sql_template_rules").unwrap().score(), Some(1.0));
}

#[test]
fn header_drift_is_reported() {
    let framework = ValidationFramework::with_builtin_rules();
    let adaptations = vec![
        Adaptation::new(
            "loaders/StoreLoadApi.py",
            ComponentKind::DataLoader,
            Some(conforming_loader("StoreLoadApi")),
        ),
        Adaptation::new(
            "templates/store.tsv",
            ComponentKind::Template,
            Some(tsv_template(&["store_id", "region"], 1)),
        ),
    ];

    let validation = framework.validate(&loader_commit(), &adaptations, &context());
    let violation = validation.violation("header_consistency_validation").unwrap();
    assert!(violation.message.contains("templates/store.tsv"));
    assert!(violation.message.contains("amount"));
}

#[test]
fn unautomated_rules_never_count_as_compliant() {
    let framework = ValidationFramework::with_builtin_rules();
    let validation = framework.validate(&loader_commit(), &[], &context());

    let skipped: Vec<&str> = validation
        .not_evaluated()
        .map(|r| r.rule_code.as_str())
        .collect();
    for code in [
        "cross_repo_type_safety",
        "comprehensive_error_handling",
        "testing_framework",
        "complete_development_flow",
    ] {
        assert!(skipped.contains(&code), "{code} was scored");
    }
}

fn unstable_score(_: &RuleInput<'_>) -> RuleResult<Assessment> {
    Ok(Assessment::Scored {
        score: f64::NAN,
        message: None,
        recommendations: Vec::new(),
    })
}

#[test]
fn non_finite_scores_count_as_failures() {
    let mut catalog = RuleCatalog::with_builtin_rules();
    catalog
        .register(Rule::new(91, "custom_unstable", "Unstable", &["anything"], unstable_score))
        .unwrap();
    let framework = ValidationFramework::new(catalog);
    let validation = framework.validate(&loader_commit(), &[], &context());

    let result = validation.result("custom_unstable").unwrap();
    assert_eq!(result.outcome, RuleOutcome::Evaluated(0.0));
    assert!(result.message.starts_with("Validation error"));
    assert_eq!(result.recommendations, vec!["Manual validation required".to_string()]);

    let violation = validation.violation("custom_unstable").unwrap();
    assert_eq!(violation.severity, ViolationSeverity::High);
    let overall = validation.overall_compliance.unwrap();
    assert!(overall.is_finite() && (0.0..=1.0).contains(&overall));
}

fn kind() -> impl Strategy<Value = ComponentKind> {
    prop::sample::select(vec![
        ComponentKind::Module,
        ComponentKind::ValidationUnit,
        ComponentKind::ParameterObject,
        ComponentKind::DataLoader,
        ComponentKind::Registry,
        ComponentKind::QueryView,
        ComponentKind::Template,
        ComponentKind::ConfigEntry,
    ])
}

fn fragment() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "@Component",
        "extends AbstractModule",
        "extends Args",
        "def validate_row",
        "MASTER_HEADER = ['a', 'b']",
        "OPENROWSET",
        "WITH (a INT)",
        "normalized denormalized",
        "get_sku_to_sku_id_map",
        "/** doc */",
        "static",
        "Row",
        "a\tb",
    ])
    .prop_map(str::to_string)
}

fn adaptation() -> impl Strategy<Value = Adaptation> {
    (kind(), prop::collection::vec(fragment(), 0..5), 0..4_usize).prop_map(|(kind, parts, ext)| {
        let extension = ["java", "py", "sql", "tsv"][ext];
        Adaptation::new(
            format!("src/Generated{}.{extension}", parts.len()),
            kind,
            Some(parts.join("\n")),
        )
    })
}

proptest! {
    #[test]
    fn scores_stay_in_unit_interval(adaptations in prop::collection::vec(adaptation(), 0..6)) {
        let framework = ValidationFramework::with_builtin_rules();
        let validation = framework.validate(&loader_commit(), &adaptations, &context());

        for result in &validation.results {
            if let Some(score) = result.score() {
                prop_assert!((0.0..=1.0).contains(&score), "{} scored {score}", result.rule_code);
            }
        }
        match (validation.overall_compliance, mean_score(&validation.results)) {
            (Some(overall), Some(mean)) => prop_assert!((overall - mean).abs() < 1e-6),
            (overall, mean) => prop_assert_eq!(overall, mean),
        }
        for violation in &validation.violations {
            prop_assert!(violation.score < 0.8);
        }
    }
}
