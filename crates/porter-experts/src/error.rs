//! Error types for expert loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading expert knowledge
#[derive(Error, Debug)]
pub enum ExpertError {
    /// Knowledge document could not be read
    #[error("failed to read expert document {path}: {source}")]
    Io {
        /// Document path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Document has no recognised sections and no rules
    #[error("expert document {0} contains no recognised knowledge")]
    EmptyKnowledge(PathBuf),
}

impl ExpertError {
    /// Create I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for expert loading
pub type ExpertResult<T> = Result<T, ExpertError>;
