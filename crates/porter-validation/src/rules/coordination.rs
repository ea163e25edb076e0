//! Repository coordination rules (11-15)

use crate::error::RuleResult;
use crate::rule::{Assessment, RuleInput};

/// Rule 11: types line up across repositories
///
/// Needs the other repositories' sources, which a single-repository run
/// never has.
pub(super) fn cross_repo_type_safety(_input: &RuleInput<'_>) -> RuleResult<Assessment> {
    Ok(Assessment::not_evaluated(
        "Cross-repository type safety requires manual verification",
        ["Verify data types match across repositories (Java String ↔ Python str ↔ SQL types)"],
    ))
}

/// Rule 14: the target line is one of the configured base branches
pub(super) fn branch_commit_merge(input: &RuleInput<'_>) -> RuleResult<Assessment> {
    let context = input.context;
    if context.base_branches.is_empty() {
        return Ok(Assessment::not_evaluated(
            "No base branches configured for this repository",
            ["Configure base branches per environment"],
        ));
    }
    let target = context.target_branch.as_str();
    let on_base = context
        .base_branches
        .iter()
        .any(|base| target.contains(base.as_str()) || base.contains(target));
    if on_base {
        return Ok(Assessment::compliant());
    }
    Ok(Assessment::compliant().penalize(
        0.7,
        Some("Not on correct base branch for environment"),
        &format!(
            "Ensure branch starts from correct base branch ({})",
            context.base_branches.join(" or ")
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::ValidationContext;
    use porter_model::{Commit, CommitCategory, DomainType};

    fn assess(target: &str, bases: &[&str]) -> Assessment {
        let commit = Commit::new("abc", "m", CommitCategory::CodeChange);
        let context = ValidationContext::new("repo", DomainType::SqlConfig, "feature", target)
            .with_base_branches(bases.iter().map(ToString::to_string).collect());
        branch_commit_merge(&RuleInput::new(&commit, &[], &context)).unwrap()
    }

    #[test]
    fn target_on_base_branch() {
        assert_eq!(assess("develop", &["develop", "master"]).score(), Some(1.0));
    }

    #[test]
    fn target_off_base_branch() {
        assert_eq!(assess("hotfix/x", &["develop", "master"]).score(), Some(0.7));
    }

    #[test]
    fn unconfigured_bases_are_not_evaluated() {
        assert!(matches!(assess("develop", &[]), Assessment::NotEvaluated { .. }));
    }
}
