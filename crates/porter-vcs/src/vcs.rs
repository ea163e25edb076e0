//! The version-control capability consumed by the migration core

use crate::error::VcsResult;
use crate::types::{CurrentRef, LogEntry, MergeOutcome, StatusEntry};
use async_trait::async_trait;
use std::path::Path;

/// Version-control primitives bound to one working directory
///
/// Implementations must run every operation against [`work_dir`](Self::work_dir)
/// and must never change the process current directory. Mutating operations
/// are issued strictly one at a time by the caller.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Working directory all operations apply to
    fn work_dir(&self) -> &Path;

    /// Whether the working directory is inside a repository
    async fn is_repository(&self) -> VcsResult<bool>;

    /// Update remote-tracking refs
    async fn fetch_all(&self) -> VcsResult<()>;

    /// Whether a local or remote-tracking branch exists
    async fn branch_exists(&self, branch: &str) -> VcsResult<bool>;

    /// Where HEAD currently points
    async fn current_ref(&self) -> VcsResult<CurrentRef>;

    /// Resolve a revision to a full hash
    async fn resolve(&self, rev: &str) -> VcsResult<String>;

    /// Non-merge commits reachable from `include` but not from `exclude`, oldest first
    async fn log_range(&self, exclude: &str, include: &str) -> VcsResult<Vec<LogEntry>>;

    /// Paths touched by one commit, in version-control order
    async fn changed_files(&self, commit: &str) -> VcsResult<Vec<String>>;

    /// Every file path in a revision's tree
    async fn list_files(&self, rev: &str) -> VcsResult<Vec<String>>;

    /// File content at a revision; `None` when the path does not exist there
    async fn read_file(&self, rev: &str, path: &str) -> VcsResult<Option<String>>;

    /// Working-tree status
    async fn status(&self) -> VcsResult<Vec<StatusEntry>>;

    /// Create a branch at `start` and check it out
    async fn create_branch(&self, name: &str, start: &str) -> VcsResult<()>;

    /// Check out a branch or revision
    async fn checkout(&self, rev: &str) -> VcsResult<()>;

    /// Stage every change in the working tree
    async fn stage_all(&self) -> VcsResult<()>;

    /// Commit staged changes and return the new hash
    async fn commit(&self, message: &str) -> VcsResult<String>;

    /// Merge a branch into HEAD with a merge commit
    async fn merge_no_ff(&self, branch: &str, message: &str) -> VcsResult<MergeOutcome>;

    /// Abort an in-progress merge
    async fn abort_merge(&self) -> VcsResult<()>;

    /// Hard reset HEAD and the working tree to a revision
    async fn reset_hard(&self, rev: &str) -> VcsResult<()>;

    /// Remove untracked files and directories
    async fn clean_untracked(&self) -> VcsResult<()>;

    /// Force-delete a local branch
    async fn delete_branch(&self, name: &str) -> VcsResult<()>;

    /// Push a branch to a remote
    async fn push(&self, remote: &str, branch: &str) -> VcsResult<()>;

    /// Whether the working tree has no changes
    async fn is_clean(&self) -> VcsResult<bool> {
        Ok(self.status().await?.is_empty())
    }
}
