//! Error types for pattern analysis

use porter_model::DomainType;
use porter_vcs::VcsError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or parsing source trees
#[derive(Error, Debug)]
pub enum PatternError {
    /// Version-control read failed
    #[error("version control read failed: {0}")]
    Vcs(#[from] VcsError),

    /// Filesystem read failed
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File content could not be parsed
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Repository path
        path: String,
        /// Parser message
        message: String,
    },

    /// No parser handles the file
    #[error("no parser registered for {0}")]
    UnsupportedFile(String),

    /// No strategy registered for a domain
    #[error("no pattern strategy registered for domain '{0}'")]
    NoStrategy(DomainType),
}

impl PatternError {
    /// Create I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create parse error
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for pattern analysis
pub type PatternResult<T> = Result<T, PatternError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PatternError::parse("a.json", "expected value");
        assert_eq!(err.to_string(), "failed to parse a.json: expected value");

        let err = PatternError::NoStrategy(DomainType::PythonMfp);
        assert_eq!(
            err.to_string(),
            "no pattern strategy registered for domain 'python-mfp'"
        );
    }
}
