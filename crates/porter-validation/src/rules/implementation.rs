//! Core implementation rules (1-10)

use super::OBJECT_MAP_HELPERS;
use crate::error::RuleResult;
use crate::rule::{Assessment, RuleInput};
use porter_model::ComponentKind;
use porter_patterns::{MODULE_PARENTS, VALIDATION_PARENT};

/// Rule 1: a new loader is registered, validated and wired into configuration
pub(super) fn new_input_integration(input: &RuleInput<'_>) -> RuleResult<Assessment> {
    if !input.has_kind(ComponentKind::DataLoader) {
        return Ok(Assessment::not_applicable("No data loader in this commit"));
    }
    let mut assessment = Assessment::compliant();
    if !input.all_of_kind(ComponentKind::DataLoader, |c| c.contains("def validate_row")) {
        assessment = assessment.penalize(
            0.6,
            Some("Missing validation method in LoadAPI"),
            "Implement validate_row() method",
        );
    }
    if !input.all_of_kind(ComponentKind::DataLoader, |c| c.contains("MASTER_HEADER")) {
        assessment = assessment.penalize(
            0.6,
            Some("Missing MASTER_HEADER definition"),
            "Define MASTER_HEADER with column names",
        );
    }
    if !input.has_kind(ComponentKind::Registry) {
        assessment = assessment.penalize(
            0.7,
            Some("LoadAPI is not registered"),
            "Update __init__.py files to register new LoadAPI",
        );
    }
    if !input.has_kind(ComponentKind::ConfigEntry) {
        assessment = assessment.penalize(
            0.8,
            None,
            "Update module_input.json with new sync configuration",
        );
    }
    Ok(assessment)
}

/// Rule 3: modules are components extending a module base
pub(super) fn new_module_creation(input: &RuleInput<'_>) -> RuleResult<Assessment> {
    if !input.has_kind(ComponentKind::Module) {
        return Ok(Assessment::not_applicable("No module in this commit"));
    }
    let mut assessment = Assessment::compliant();
    if !input.all_of_kind(ComponentKind::Module, |c| c.contains("@Component")) {
        assessment = assessment.penalize(
            0.3,
            Some("Missing @Component annotation on module class"),
            "Add @Component annotation to module class",
        );
    }
    let extends_module_base = |content: &str| {
        MODULE_PARENTS
            .iter()
            .any(|parent| content.contains(&format!("extends {parent}")))
    };
    if !input.all_of_kind(ComponentKind::Module, extends_module_base) {
        assessment = assessment.penalize(
            0.4,
            Some("Module does not extend proper base class"),
            "Extend AbstractModule or AbstractUtilModuleGroup",
        );
    }
    Ok(assessment)
}

/// Rule 7: loaders denormalize through ObjectMaps and keep data shapes apart
pub(super) fn data_consistency(input: &RuleInput<'_>) -> RuleResult<Assessment> {
    if !input.has_kind(ComponentKind::DataLoader) {
        return Ok(Assessment::not_applicable("No data loader in this commit"));
    }
    let mut assessment = Assessment::compliant();
    if !input.any_content_contains(&OBJECT_MAP_HELPERS[..3]) {
        assessment = assessment.penalize(
            0.7,
            Some("Not using ObjectMap functions for denormalization"),
            "Use ObjectMap functions instead of custom denormalization",
        );
    }
    let mixed = input
        .adaptations
        .iter()
        .any(|a| a.content_contains("normalized") && a.content_contains("denormalized"));
    if mixed {
        assessment = assessment.penalize(
            0.5,
            Some("Potential mixing of normalized and denormalized data"),
            "Separate normalized and denormalized data handling",
        );
    }
    Ok(assessment)
}

/// Rule 8: validation modules are components with a `validate` method
pub(super) fn validation_naming(input: &RuleInput<'_>) -> RuleResult<Assessment> {
    let kind = ComponentKind::ValidationUnit;
    if !input.has_kind(kind) {
        return Ok(Assessment::not_applicable("No validation module in this commit"));
    }
    let mut assessment = Assessment::compliant();
    if !input.all_of_kind(kind, |c| c.contains("@Component")) {
        assessment = assessment.penalize(
            0.4,
            Some("Missing @Component annotation on validation module"),
            "Add @Component annotation to validation class",
        );
    }
    if !input.all_of_kind(kind, |c| c.contains("public void validate(")) {
        assessment = assessment.penalize(
            0.5,
            Some("Missing validate() method in validation module"),
            "Implement validate() method",
        );
    }
    let extends = format!("extends {VALIDATION_PARENT}");
    if !input.all_of_kind(kind, |c| c.contains(&extends)) {
        assessment = assessment.penalize(
            0.3,
            Some("Validation module does not extend AbstractValidationModule"),
            "Extend AbstractValidationModule",
        );
    }
    Ok(assessment)
}

/// Rule 10: views read through OPENROWSET with an explicit column list
pub(super) fn sql_template(input: &RuleInput<'_>) -> RuleResult<Assessment> {
    let views: Vec<_> = input
        .of_kind(ComponentKind::QueryView)
        .filter(|a| a.file_path.ends_with(".sql"))
        .collect();
    if views.is_empty() {
        return Ok(Assessment::not_applicable("No SQL view in this commit"));
    }
    let mut assessment = Assessment::compliant();
    if !views.iter().all(|a| a.content().contains("OPENROWSET")) {
        assessment = assessment.penalize(
            0.6,
            Some("SQL view does not use OPENROWSET"),
            "Use OPENROWSET for bulk data reads",
        );
    }
    if !views
        .iter()
        .all(|a| a.content().to_uppercase().contains("WITH"))
    {
        assessment = assessment.penalize(
            0.7,
            Some("Missing WITH clause for column definitions"),
            "Add WITH clause defining all columns",
        );
    }
    Ok(assessment)
}
