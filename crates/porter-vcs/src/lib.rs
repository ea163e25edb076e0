//! Porter VCS - the version-control collaborator boundary
//!
//! The migration core never reimplements version control; it consumes the
//! primitives of [`VersionControl`]:
//! - history: [`VersionControl::log_range`], [`VersionControl::changed_files`]
//! - trees: [`VersionControl::list_files`], [`VersionControl::read_file`]
//! - branches: create, checkout, delete, merge, push
//! - working tree: status, stage, commit, reset, clean
//!
//! [`GitCli`] drives the `git` binary. Every invocation runs in the
//! adapter's own working directory (never the process current directory)
//! and is bounded by a timeout.
//!
//! # Example
//!
//! ```rust,ignore
//! use porter_vcs::{GitCli, VersionControl};
//! use std::time::Duration;
//!
//! # async fn example() -> porter_vcs::VcsResult<()> {
//! let git = GitCli::new("/srv/repos/algo").with_timeout(Duration::from_secs(30));
//! for entry in git.log_range("master-ril", "caas-release").await? {
//!     println!("{} {}", entry.hash, entry.subject);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod git;
pub mod types;
pub mod vcs;

pub use error::{VcsError, VcsResult};
pub use git::GitCli;
pub use types::{CurrentRef, LogEntry, MergeOutcome, StatusEntry};
pub use vcs::VersionControl;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
