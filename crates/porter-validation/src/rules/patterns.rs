//! Pattern and class management rules

use super::OBJECT_MAP_HELPERS;
use crate::error::{RuleResult, ValidationError};
use crate::rule::{Assessment, RuleInput};
use once_cell::sync::Lazy;
use porter_model::ComponentKind;
use porter_patterns::{default_parsers, ParserRegistry};
use std::collections::BTreeSet;

static PARSERS: Lazy<ParserRegistry> = Lazy::new(default_parsers);

const HEADER_SOURCES: [ComponentKind; 3] = [
    ComponentKind::DataLoader,
    ComponentKind::QueryView,
    ComponentKind::Template,
];

const HEADER_CHECKS: [&str; 3] = [
    "Verify MASTER_HEADER matches SQL view WITH clause",
    "Ensure SQL view columns match template headers",
    "Validate export query SELECT matches template structure",
];

/// Rule 16: parameter objects extend `Args`
pub(super) fn args_standards(input: &RuleInput<'_>) -> RuleResult<Assessment> {
    let kind = ComponentKind::ParameterObject;
    if !input.has_kind(kind) {
        return Ok(Assessment::not_applicable("No parameter object in this commit"));
    }
    let mut assessment = Assessment::compliant();
    if !input.all_of_kind(kind, |c| c.contains("extends Args")) {
        assessment = assessment.penalize(
            0.4,
            Some("Args class does not extend Args base class"),
            "Extend Args base class",
        );
    }
    if !input.of_kind(kind).any(|a| a.content_contains("@Autowired")) {
        assessment = assessment.penalize(
            0.8,
            None,
            "Consider using @Autowired for dependency injection",
        );
    }
    Ok(assessment)
}

/// Rule 25: Java classes carry JavaDoc, utilities stay static
pub(super) fn utility_classes(input: &RuleInput<'_>) -> RuleResult<Assessment> {
    let has_java_class = [
        ComponentKind::Module,
        ComponentKind::ValidationUnit,
        ComponentKind::ParameterObject,
    ]
    .into_iter()
    .any(|kind| input.has_kind(kind));
    if !has_java_class {
        return Ok(Assessment::not_applicable("No Java class in this commit"));
    }
    let mut assessment = Assessment::compliant();
    if !input.any_content_contains(&["/**"]) {
        assessment = assessment.penalize(0.8, None, "Add comprehensive JavaDoc documentation");
    }
    if !input.any_content_contains(&["static"]) {
        assessment = assessment.penalize(
            0.9,
            None,
            "Consider using static methods for utility functions",
        );
    }
    Ok(assessment)
}

/// Rule 26: loaders map ids through ObjectMaps
pub(super) fn object_maps(input: &RuleInput<'_>) -> RuleResult<Assessment> {
    if !input.has_kind(ComponentKind::DataLoader) {
        return Ok(Assessment::not_applicable("No data loader in this commit"));
    }
    let lookups = [OBJECT_MAP_HELPERS[0], OBJECT_MAP_HELPERS[1], OBJECT_MAP_HELPERS[3]];
    if input.any_content_contains(&lookups) {
        return Ok(Assessment::compliant());
    }
    Ok(Assessment::compliant().penalize(
        0.6,
        Some("Not using ObjectMap functions for data mapping"),
        "Use ObjectMap functions instead of custom mapping logic",
    ))
}

/// Rule 39: every header declared in the commit names the same columns
///
/// Loader `MASTER_HEADER`s, view `WITH` columns and template header lines
/// are compared case-insensitively as sets.
pub(super) fn header_consistency(input: &RuleInput<'_>) -> RuleResult<Assessment> {
    let mut sources: Vec<(&str, BTreeSet<String>)> = Vec::new();
    for adaptation in input
        .adaptations
        .iter()
        .filter(|a| HEADER_SOURCES.contains(&a.component_kind) && !a.is_removal())
        .filter(|a| PARSERS.supports(&a.file_path))
    {
        let parsed = PARSERS
            .parse(&adaptation.file_path, adaptation.content())
            .map_err(|e| ValidationError::rule_failed("header_consistency_validation", e.to_string()))?;
        let header: BTreeSet<String> = parsed
            .structure
            .header
            .iter()
            .map(|column| column.trim().to_lowercase())
            .filter(|column| !column.is_empty())
            .collect();
        if !header.is_empty() {
            sources.push((adaptation.file_path.as_str(), header));
        }
    }

    let [(first_path, first), rest @ ..] = sources.as_slice() else {
        return Ok(Assessment::not_evaluated(
            "No header sources in this commit",
            HEADER_CHECKS,
        ));
    };
    if rest.is_empty() {
        return Ok(Assessment::not_evaluated(
            format!("Only {first_path} declares a header; nothing to compare against"),
            HEADER_CHECKS,
        ));
    }

    let mut assessment = Assessment::compliant();
    for (path, header) in rest {
        if header == first {
            continue;
        }
        let missing: Vec<&str> = first.difference(header).map(String::as_str).collect();
        let extra: Vec<&str> = header.difference(first).map(String::as_str).collect();
        let message = format!(
            "Header of {path} differs from {first_path} (missing: [{}], extra: [{}])",
            missing.join(", "),
            extra.join(", ")
        );
        assessment = assessment.penalize(
            0.6,
            Some(message.as_str()),
            &format!("Align the header of {path} with {first_path}"),
        );
    }
    Ok(assessment)
}

/// Rule 44: a changed Row class comes with its File class
pub(super) fn file_class_sync(input: &RuleInput<'_>) -> RuleResult<Assessment> {
    let row_changed = input
        .of_kind(ComponentKind::Module)
        .any(|a| a.content_contains("Row"));
    if !row_changed {
        return Ok(Assessment::not_applicable("No Row class changed in this commit"));
    }
    let file_class_changed = input
        .adaptations
        .iter()
        .any(|a| a.file_name().contains("File") && a.file_path.ends_with(".java"));
    if file_class_changed {
        return Ok(Assessment::compliant());
    }
    let mut assessment = Assessment::compliant();
    for recommendation in [
        "Update corresponding File class when Row class fields change",
        "Ensure File class headers array matches Row class fields",
        "Update File class write methods for new fields",
    ] {
        assessment = assessment.penalize(
            0.6,
            Some("Row class changed without a matching File class update"),
            recommendation,
        );
    }
    Ok(assessment)
}

/// Rule 45: new Args fields are registered post deployment
pub(super) fn post_deployment_parameters(input: &RuleInput<'_>) -> RuleResult<Assessment> {
    if !input.has_kind(ComponentKind::ParameterObject) {
        return Ok(Assessment::not_applicable("No parameter object in this commit"));
    }
    let registered = input
        .adaptations
        .iter()
        .any(|a| a.file_path.ends_with("post_deployment.sql") && !a.is_removal());
    if registered {
        return Ok(Assessment::compliant());
    }
    let mut assessment = Assessment::compliant();
    for recommendation in [
        "Register new Args fields in post_deployment.sql",
        "Add parameter entries to master.a_description table",
        "Verify parameter names match exactly between Args class and database",
    ] {
        assessment = assessment.penalize(
            0.7,
            Some("Post-deployment parameter registration required"),
            recommendation,
        );
    }
    Ok(assessment)
}
