//! Error types for version-control operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the version-control boundary
#[derive(Error, Debug)]
pub enum VcsError {
    /// The VCS binary could not be started
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully
    #[error("`git {command}` failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        /// Command line without the program name
        command: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Trimmed standard error
        stderr: String,
    },

    /// The command exceeded its timeout and was killed
    #[error("`git {command}` timed out after {secs}s")]
    Timeout {
        /// Command line without the program name
        command: String,
        /// Timeout in seconds
        secs: u64,
    },

    /// The command produced output that is not UTF-8
    #[error("output of `git {command}` is not valid UTF-8")]
    InvalidUtf8 {
        /// Command line without the program name
        command: String,
    },

    /// The configured working directory does not exist
    #[error("working directory not found: {0}")]
    WorkDirMissing(PathBuf),

    /// Working-tree I/O failed
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl VcsError {
    /// Create I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create command failure
    pub fn command_failed(command: impl Into<String>, code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            code,
            stderr: stderr.into().trim().to_string(),
        }
    }

    /// Whether retrying the same command may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether stderr of a failed command mentions a phrase (case-insensitive)
    #[must_use]
    pub fn mentions(&self, phrase: &str) -> bool {
        match self {
            Self::CommandFailed { stderr, .. } => stderr
                .to_ascii_lowercase()
                .contains(&phrase.to_ascii_lowercase()),
            _ => false,
        }
    }
}

/// Result type for version-control operations
pub type VcsResult<T> = Result<T, VcsError>;
