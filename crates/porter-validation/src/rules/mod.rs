//! Built-in rule catalog
//!
//! Rules that need a human (cross-repository type alignment, genuine test
//! execution, process checkpoints) report [`Assessment::NotEvaluated`]
//! instead of a score.
//!
//! [`Assessment::NotEvaluated`]: crate::rule::Assessment::NotEvaluated

mod coordination;
mod implementation;
mod patterns;
mod process;

use crate::rule::Rule;

/// ObjectMap helpers loaders should use for id lookups
pub(crate) const OBJECT_MAP_HELPERS: [&str; 4] = [
    "get_store_to_store_id_map",
    "get_sku_to_sku_id_map",
    "get_style_code_to_style_id_map",
    "get_wh_to_wh_id_map",
];

/// Every built-in rule in catalog order
#[must_use]
pub fn builtin_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            1,
            "new_input_integration",
            "New Input Integration",
            &[
                "Add entries in LoadAPI __init__.py files",
                "Add validations for new input",
                "Update sync query & view creation configs",
            ],
            implementation::new_input_integration,
        ),
        Rule::new(
            3,
            "new_module_creation",
            "New Module Creation",
            &[
                "Add submodule entry in relevant group module",
                "Submodule must extend AbstractModule",
            ],
            implementation::new_module_creation,
        ),
        Rule::new(
            7,
            "data_consistency_structure",
            "Data Consistency Structure",
            &[
                "MASTER_HEADER denormalized, stored data normalized",
                "Never mix normalized & denormalized data",
            ],
            implementation::data_consistency,
        ),
        Rule::new(
            8,
            "validation_naming",
            "Validation Naming",
            &[
                "Validation modules extend AbstractValidationModule",
                "Must have @Component annotation",
            ],
            implementation::validation_naming,
        ),
        Rule::new(
            10,
            "sql_template_rules",
            "SQL Template Rules",
            &["Use OPENROWSET for bulk reads", "WITH clause matches template headers"],
            implementation::sql_template,
        ),
        Rule::new(
            11,
            "cross_repo_type_safety",
            "Cross-Repository Type Safety",
            &[
                "Maintain consistent data types across repositories",
                "Test integration & version alignment",
            ],
            coordination::cross_repo_type_safety,
        ),
        Rule::new(
            14,
            "branch_commit_merge",
            "Branch Commit Merge",
            &[
                "Branch from correct base branches per environment",
                "Format: feature/{req-id}-{description}",
            ],
            coordination::branch_commit_merge,
        ),
        Rule::new(
            16,
            "args_input_table_standards",
            "Args Input Table Standards",
            &[
                "Args class extends Args base class",
                "Args store configurable business parameters",
            ],
            patterns::args_standards,
        ),
        Rule::new(
            21,
            "comprehensive_error_handling",
            "Comprehensive Error Handling",
            &[
                "Implement error handling at all levels",
                "Rollback procedures for all operations",
            ],
            process::error_handling,
        ),
        Rule::new(
            22,
            "testing_framework",
            "Testing Framework",
            &[
                "Implement testing at all levels",
                "Minimum 80% coverage for new modules",
            ],
            process::testing_framework,
        ),
        Rule::new(
            24,
            "complete_development_flow",
            "Complete Development Flow",
            &[
                "10-step development process with mandatory checkpoints",
                "Repository coordination first",
            ],
            process::development_flow,
        ),
        Rule::new(
            25,
            "utility_class_management",
            "Utility Class Management",
            &[
                "Static methods only",
                "Clear, descriptive method names",
                "Comprehensive JavaDoc",
            ],
            patterns::utility_classes,
        ),
        Rule::new(
            26,
            "objectmaps_usage",
            "ObjectMaps Usage",
            &[
                "Use ObjectMap functions for denormalization",
                "Never custom-denormalize",
            ],
            patterns::object_maps,
        ),
        Rule::new(
            39,
            "header_consistency_validation",
            "Header Consistency Validation",
            &["Headers must match across LoadAPI → SQL view → Export query → Template"],
            patterns::header_consistency,
        ),
        Rule::new(
            44,
            "mandatory_file_class_synchronization",
            "Mandatory File Class Synchronization",
            &["When Row class fields change, corresponding File class MUST be updated"],
            patterns::file_class_sync,
        ),
        Rule::new(
            45,
            "post_deployment_parameter_registration",
            "Post Deployment Parameter Registration",
            &["New Args fields MUST be registered in post_deployment.sql"],
            patterns::post_deployment_parameters,
        ),
    ]
}
