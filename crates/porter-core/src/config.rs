//! Repository Registry and run settings
//!
//! Loaded from TOML or YAML (chosen by file extension):
//!
//! ```toml
//! [repositories.algo]
//! path = "../algo"
//! domain = "java-algorithm"
//! base_branches = { dev = "develop", prod = "master" }
//!
//! [migration]
//! output_dir = "migration-output"
//! command_timeout_secs = 120
//! ```
//!
//! Relative repository paths resolve against the document's directory.

use crate::error::{ConfigProblem, MigrationError, MigrationResult};
use porter_model::DomainType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default bound on each version-control invocation
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;

/// Default average compliance below which a run records a validation issue
pub const DEFAULT_COMPLIANCE_THRESHOLD: f64 = 0.8;

/// Default remote for pushes
pub const DEFAULT_REMOTE: &str = "origin";

fn default_remote() -> String {
    DEFAULT_REMOTE.to_string()
}

/// One migratable repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Working tree path
    pub path: PathBuf,
    /// Domain tag selecting strategy and primary expert
    pub domain: DomainType,
    /// Remote to push to
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Base branch per environment
    #[serde(default)]
    pub base_branches: BTreeMap<String, String>,
}

impl RepositoryConfig {
    /// Create repository entry
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, domain: DomainType) -> Self {
        Self {
            path: path.into(),
            domain,
            remote: default_remote(),
            base_branches: BTreeMap::new(),
        }
    }

    /// With push remote
    #[inline]
    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// With a base branch for an environment
    #[inline]
    #[must_use]
    pub fn with_base_branch(mut self, environment: impl Into<String>, branch: impl Into<String>) -> Self {
        self.base_branches.insert(environment.into(), branch.into());
        self
    }

    /// Distinct base branch names in environment order
    #[must_use]
    pub fn base_branch_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for branch in self.base_branches.values() {
            if !names.contains(branch) {
                names.push(branch.clone());
            }
        }
        names
    }

    /// Check the working path is an existing directory
    ///
    /// # Errors
    ///
    /// Returns an `InaccessibleRepository` configuration error otherwise.
    pub fn check_path(&self) -> MigrationResult<()> {
        if self.path.is_dir() {
            Ok(())
        } else {
            Err(MigrationError::configuration(
                ConfigProblem::InaccessibleRepository,
                format!("{} does not exist or is not a directory", self.path.display()),
            ))
        }
    }
}

/// Run-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Root of per-run report directories
    pub output_dir: PathBuf,
    /// Directory holding expert knowledge documents
    pub experts_dir: PathBuf,
    /// Bound on each version-control invocation
    pub command_timeout_secs: u64,
    /// Fetch all remotes before discovery
    pub fetch: bool,
    /// Push the target after merging
    pub push: bool,
    /// Average compliance expected of a run
    pub compliance_threshold: f64,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("migration-output"),
            experts_dir: PathBuf::from("experts"),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            fetch: true,
            push: true,
            compliance_threshold: DEFAULT_COMPLIANCE_THRESHOLD,
        }
    }
}

impl MigrationSettings {
    /// Create default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With output directory
    #[inline]
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// With experts directory
    #[inline]
    #[must_use]
    pub fn with_experts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.experts_dir = dir.into();
        self
    }

    /// With command timeout
    #[inline]
    #[must_use]
    pub fn with_command_timeout_secs(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs;
        self
    }

    /// With fetch before discovery
    #[inline]
    #[must_use]
    pub fn with_fetch(mut self, fetch: bool) -> Self {
        self.fetch = fetch;
        self
    }

    /// With push after merge
    #[inline]
    #[must_use]
    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    /// With compliance threshold
    #[inline]
    #[must_use]
    pub fn with_compliance_threshold(mut self, threshold: f64) -> Self {
        self.compliance_threshold = threshold;
        self
    }

    /// Command timeout as a duration
    #[inline]
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Repository id to configuration, plus run settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRegistry {
    /// Repositories by id
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryConfig>,
    /// Run settings
    #[serde(default)]
    pub migration: MigrationSettings,
}

impl RepositoryRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a repository
    #[must_use]
    pub fn with_repository(mut self, id: impl Into<String>, config: RepositoryConfig) -> Self {
        self.repositories.insert(id.into(), config);
        self
    }

    /// With settings
    #[inline]
    #[must_use]
    pub fn with_settings(mut self, settings: MigrationSettings) -> Self {
        self.migration = settings;
        self
    }

    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns an `InvalidDocument` configuration error.
    pub fn from_toml_str(content: &str) -> MigrationResult<Self> {
        toml::from_str(content)
            .map_err(|e| MigrationError::configuration(ConfigProblem::InvalidDocument, e.to_string()))
    }

    /// Parse a YAML document
    ///
    /// # Errors
    ///
    /// Returns an `InvalidDocument` configuration error.
    pub fn from_yaml_str(content: &str) -> MigrationResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| MigrationError::configuration(ConfigProblem::InvalidDocument, e.to_string()))
    }

    /// Load a registry file, resolving relative paths against its directory
    ///
    /// # Errors
    ///
    /// Returns an `InvalidDocument` configuration error when the file cannot
    /// be read, has an unsupported extension, or does not parse.
    pub async fn load(path: &Path) -> MigrationResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            MigrationError::configuration(
                ConfigProblem::InvalidDocument,
                format!("cannot read {}: {e}", path.display()),
            )
        })?;
        let registry = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content)?,
            Some("yaml" | "yml") => Self::from_yaml_str(&content)?,
            _ => {
                return Err(MigrationError::configuration(
                    ConfigProblem::InvalidDocument,
                    format!("{} must be .toml, .yaml or .yml", path.display()),
                ))
            }
        };
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(registry.resolve_paths(base))
    }

    /// Make relative repository, output and experts paths absolute under `base`
    #[must_use]
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for repository in self.repositories.values_mut() {
            resolve(&mut repository.path);
        }
        resolve(&mut self.migration.output_dir);
        resolve(&mut self.migration.experts_dir);
        self
    }

    /// Repository by id
    ///
    /// # Errors
    ///
    /// Returns an `UnknownRepository` configuration error naming the known ids.
    pub fn get(&self, id: &str) -> MigrationResult<&RepositoryConfig> {
        self.repositories.get(id).ok_or_else(|| {
            let known: Vec<&str> = self.repositories.keys().map(String::as_str).collect();
            MigrationError::configuration(
                ConfigProblem::UnknownRepository,
                format!("'{id}' is not configured (known: {})", known.join(", ")),
            )
        })
    }

    /// Run settings
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &MigrationSettings {
        &self.migration
    }

    /// Configured repository ids
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.repositories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOML: &str = r#"
[repositories.algo]
path = "repos/algo"
domain = "java-algorithm"
base_branches = { dev = "develop", prod = "master", uat = "develop" }

[repositories.loadapi]
path = "/srv/loadapi"
domain = "python-loadapi"
remote = "upstream"

[migration]
command_timeout_secs = 30
push = false
"#;

    #[test]
    fn toml_registry_with_defaults() {
        let registry = RepositoryRegistry::from_toml_str(TOML).unwrap();
        let algo = registry.get("algo").unwrap();
        assert_eq!(algo.domain, DomainType::JavaAlgorithm);
        assert_eq!(algo.remote, "origin");
        assert_eq!(algo.base_branch_names(), vec!["develop".to_string(), "master".to_string()]);
        assert_eq!(registry.get("loadapi").unwrap().remote, "upstream");

        let settings = registry.settings();
        assert_eq!(settings.command_timeout(), Duration::from_secs(30));
        assert!(!settings.push);
        assert!(settings.fetch);
        assert!((settings.compliance_threshold - DEFAULT_COMPLIANCE_THRESHOLD).abs() < f64::EPSILON);
    }

    #[test]
    fn yaml_registry() {
        let yaml = "repositories:\n  config:\n    path: /srv/config\n    domain: sql-config\n";
        let registry = RepositoryRegistry::from_yaml_str(yaml).unwrap();
        assert_eq!(registry.get("config").unwrap().domain, DomainType::SqlConfig);
        assert_eq!(registry.settings(), &MigrationSettings::default());
    }

    #[test]
    fn unknown_domain_is_invalid() {
        let err = RepositoryRegistry::from_toml_str("[repositories.x]\npath = \"x\"\ndomain = \"cobol\"\n")
            .unwrap_err();
        assert_eq!(err.config_problem(), Some(ConfigProblem::InvalidDocument));
    }

    #[test]
    fn unknown_repository_lists_known_ids() {
        let registry = RepositoryRegistry::from_toml_str(TOML).unwrap();
        let err = registry.get("mfp").unwrap_err();
        assert_eq!(err.config_problem(), Some(ConfigProblem::UnknownRepository));
        assert!(err.to_string().contains("algo, loadapi"));
    }

    #[test]
    fn relative_paths_resolve_against_document() {
        let registry = RepositoryRegistry::from_toml_str(TOML)
            .unwrap()
            .resolve_paths(Path::new("/etc/porter"));
        assert_eq!(registry.get("algo").unwrap().path, PathBuf::from("/etc/porter/repos/algo"));
        assert_eq!(registry.get("loadapi").unwrap().path, PathBuf::from("/srv/loadapi"));
        assert_eq!(registry.settings().output_dir, PathBuf::from("/etc/porter/migration-output"));
    }

    #[tokio::test]
    async fn load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repositories.toml");
        std::fs::write(&path, TOML).unwrap();
        let registry = RepositoryRegistry::load(&path).await.unwrap();
        assert_eq!(registry.get("algo").unwrap().path, dir.path().join("repos/algo"));

        let ini = dir.path().join("repositories.ini");
        std::fs::write(&ini, "x").unwrap();
        let err = RepositoryRegistry::load(&ini).await.unwrap_err();
        assert_eq!(err.config_problem(), Some(ConfigProblem::InvalidDocument));
    }

    #[test]
    fn bundled_sample_registry_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/repositories.toml");
        let registry = tokio_test::block_on(RepositoryRegistry::load(&path)).unwrap();
        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(ids, vec!["algorithm", "config", "loadapi", "mfp"]);
        assert_eq!(registry.get("loadapi").unwrap().domain, DomainType::PythonLoadApi);
        assert_eq!(registry.get("config").unwrap().remote, "upstream");
        assert!(registry.settings().experts_dir.ends_with("experts"));
    }

    #[test]
    fn missing_path_is_inaccessible() {
        let config = RepositoryConfig::new("/definitely/not/here", DomainType::PythonMfp);
        assert_eq!(
            config.check_path().unwrap_err().config_problem(),
            Some(ConfigProblem::InaccessibleRepository)
        );
    }
}
