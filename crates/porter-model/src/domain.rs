//! Repository domain types and component kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of repository domains
///
/// Selects the pattern analysis strategy and the primary expert. Always
/// configured explicitly, never inferred from a repository name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainType {
    /// Compiled object-oriented algorithm modules (Java)
    JavaAlgorithm,
    /// Interpreted data-loader services (Python)
    #[serde(rename = "python-loadapi")]
    PythonLoadApi,
    /// Interpreted planning service (Python)
    PythonMfp,
    /// SQL views, templates and JSON configuration
    SqlConfig,
}

impl DomainType {
    /// All domain types
    pub const ALL: [Self; 4] = [
        Self::JavaAlgorithm,
        Self::PythonLoadApi,
        Self::PythonMfp,
        Self::SqlConfig,
    ];

    /// Configuration tag
    #[inline]
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::JavaAlgorithm => "java-algorithm",
            Self::PythonLoadApi => "python-loadapi",
            Self::PythonMfp => "python-mfp",
            Self::SqlConfig => "sql-config",
        }
    }

    /// Language family used for expert domain matching
    #[inline]
    #[must_use]
    pub const fn family(self) -> LanguageFamily {
        match self {
            Self::JavaAlgorithm => LanguageFamily::Java,
            Self::PythonLoadApi | Self::PythonMfp => LanguageFamily::Python,
            Self::SqlConfig => LanguageFamily::Config,
        }
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error for an unrecognised domain tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDomain(pub String);

impl fmt::Display for UnknownDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown domain type '{}' (expected one of: java-algorithm, python-loadapi, python-mfp, sql-config)",
            self.0
        )
    }
}

impl std::error::Error for UnknownDomain {}

impl FromStr for DomainType {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownDomain(s.to_string()))
    }
}

/// Language family shared by several domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageFamily {
    /// Java sources
    Java,
    /// Python sources
    Python,
    /// SQL, TSV and JSON artifacts
    Config,
}

impl fmt::Display for LanguageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Java => "java",
            Self::Python => "python",
            Self::Config => "config",
        })
    }
}

/// Structural role of a file within its repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Algorithm module or group module
    Module,
    /// Validation module
    ValidationUnit,
    /// Parameter (Args) object
    ParameterObject,
    /// Data loader class
    DataLoader,
    /// Provider or package registration file
    Registry,
    /// Constants file
    Constants,
    /// SQL view or export query
    QueryView,
    /// Tabular template
    Template,
    /// JSON configuration entry file
    ConfigEntry,
    /// Service class
    Service,
    /// Route definitions
    Route,
    /// Utility functions
    Utility,
    /// File carried over unchanged
    NoAdaptation,
}

impl ComponentKind {
    /// Human readable label
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Module => "Module Class",
            Self::ValidationUnit => "Validation Class",
            Self::ParameterObject => "Args Class",
            Self::DataLoader => "LoadAPI Class",
            Self::Registry => "Registration File",
            Self::Constants => "Constants File",
            Self::QueryView => "SQL File",
            Self::Template => "TSV Template",
            Self::ConfigEntry => "JSON Config",
            Self::Service => "Service Class",
            Self::Route => "Route File",
            Self::Utility => "Utils File",
            Self::NoAdaptation => "Unchanged File",
        }
    }

    /// Whether this kind is adapted at all
    #[inline]
    #[must_use]
    pub const fn is_adapted(self) -> bool {
        !matches!(self, Self::NoAdaptation)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
