//! Run input

use serde::{Deserialize, Serialize};
use std::fmt;

/// Flags controlling a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Analyze and validate without mutating version control
    pub dry_run: bool,
    /// Emit detailed progress
    pub verbose: bool,
    /// Never abort on validation violations
    pub skip_validation: bool,
}

impl MigrationOptions {
    /// With dry run
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// With verbose output
    #[inline]
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// With validation skipping
    #[inline]
    #[must_use]
    pub fn with_skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }
}

/// Immutable input of one migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRequest {
    /// Repository identifier in the registry
    pub repository_id: String,
    /// Line the commits come from
    pub source_branch: String,
    /// Line the commits are replayed onto
    pub target_branch: String,
    /// Run flags
    pub options: MigrationOptions,
}

impl MigrationRequest {
    /// Create request with default options
    #[must_use]
    pub fn new(
        repository_id: impl Into<String>,
        source_branch: impl Into<String>,
        target_branch: impl Into<String>,
    ) -> Self {
        Self {
            repository_id: repository_id.into(),
            source_branch: source_branch.into(),
            target_branch: target_branch.into(),
            options: MigrationOptions::default(),
        }
    }

    /// With options
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: MigrationOptions) -> Self {
        self.options = options;
        self
    }

    /// Deterministic feature branch name for a given commit count
    #[must_use]
    pub fn feature_branch_name(&self, commit_count: usize) -> String {
        format!(
            "migration/{}-to-{}-{}-changes",
            sanitize_ref(&self.source_branch),
            sanitize_ref(&self.target_branch),
            commit_count
        )
    }
}

/// Replace characters that would nest or break a ref name component
fn sanitize_ref(branch: &str) -> String {
    branch
        .chars()
        .map(|c| match c {
            '/' | ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\' => '-',
            other => other,
        })
        .collect()
}

/// Identifier of one run, used to name the output directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Run ID from a unix timestamp in milliseconds
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self(format!("migration-{millis}"))
    }

    /// String form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
