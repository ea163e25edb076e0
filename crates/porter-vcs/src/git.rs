//! `git` command-line adapter
//!
//! Each call spawns `git` with `current_dir` set to the adapter's working
//! directory, prompts disabled, and a timeout that kills the child on expiry.

use crate::error::{VcsError, VcsResult};
use crate::types::{CurrentRef, LogEntry, MergeOutcome, StatusEntry};
use crate::vcs::VersionControl;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace};

/// Default per-invocation timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Version control through the `git` binary
#[derive(Debug, Clone)]
pub struct GitCli {
    work_dir: PathBuf,
    program: String,
    timeout: Duration,
}

impl GitCli {
    /// Create adapter for a working directory
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            program: "git".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// With per-invocation timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// With a different program (e.g. an absolute path to git)
    #[inline]
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Configured timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a command and return its raw output regardless of exit status
    async fn output(&self, args: &[&str]) -> VcsResult<Output> {
        let command = args.join(" ");
        if !self.work_dir.is_dir() {
            return Err(VcsError::WorkDirMissing(self.work_dir.clone()));
        }
        trace!(dir = %self.work_dir.display(), %command, "git");

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(&self.work_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(VcsError::Spawn {
                program: self.program.clone(),
                source,
            }),
            Err(_) => Err(VcsError::Timeout {
                command,
                secs: self.timeout.as_secs(),
            }),
        }
    }

    /// Run a command, failing on non-zero exit, and return stdout
    async fn run(&self, args: &[&str]) -> VcsResult<String> {
        let output = self.output(args).await?;
        let command = args.join(" ");
        if !output.status.success() {
            return Err(VcsError::command_failed(
                command,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr),
            ));
        }
        String::from_utf8(output.stdout).map_err(|_| VcsError::InvalidUtf8 { command })
    }

    /// Run a command and report only whether it succeeded
    async fn succeeds(&self, args: &[&str]) -> VcsResult<bool> {
        Ok(self.output(args).await?.status.success())
    }
}

/// Parse `--format=%H%x09%s` log output
pub(crate) fn parse_log(stdout: &str) -> Vec<LogEntry> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let (hash, subject) = line.split_once('\t').unwrap_or((line, ""));
            LogEntry {
                hash: hash.trim().to_string(),
                subject: subject.trim().to_string(),
            }
        })
        .collect()
}

/// Parse newline-separated path listings
pub(crate) fn parse_paths(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[async_trait]
impl VersionControl for GitCli {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    async fn is_repository(&self) -> VcsResult<bool> {
        match self.output(&["rev-parse", "--is-inside-work-tree"]).await {
            Ok(output) => Ok(output.status.success()),
            Err(VcsError::WorkDirMissing(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn fetch_all(&self) -> VcsResult<()> {
        debug!("fetching all remotes");
        self.run(&["fetch", "--all", "--prune"]).await.map(drop)
    }

    async fn branch_exists(&self, branch: &str) -> VcsResult<bool> {
        let local = format!("refs/heads/{branch}");
        if self.succeeds(&["show-ref", "--verify", "--quiet", &local]).await? {
            return Ok(true);
        }
        let remote = self.run(&["branch", "-r", "--format=%(refname:short)"]).await?;
        Ok(remote
            .lines()
            .any(|r| r.trim().split_once('/').is_some_and(|(_, name)| name == branch)))
    }

    async fn current_ref(&self) -> VcsResult<CurrentRef> {
        let name = self.run(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let name = name.trim();
        if name == "HEAD" {
            let sha = self.resolve("HEAD").await?;
            Ok(CurrentRef::Detached(sha))
        } else {
            Ok(CurrentRef::Branch(name.to_string()))
        }
    }

    async fn resolve(&self, rev: &str) -> VcsResult<String> {
        let spec = format!("{rev}^{{commit}}");
        Ok(self.run(&["rev-parse", "--verify", &spec]).await?.trim().to_string())
    }

    async fn log_range(&self, exclude: &str, include: &str) -> VcsResult<Vec<LogEntry>> {
        let range = format!("{exclude}..{include}");
        let stdout = self
            .run(&["log", "--no-merges", "--reverse", "--format=%H%x09%s", &range])
            .await?;
        Ok(parse_log(&stdout))
    }

    async fn changed_files(&self, commit: &str) -> VcsResult<Vec<String>> {
        let stdout = self
            .run(&["show", "--no-renames", "--name-only", "--format=", commit])
            .await?;
        Ok(parse_paths(&stdout))
    }

    async fn list_files(&self, rev: &str) -> VcsResult<Vec<String>> {
        let stdout = self.run(&["ls-tree", "-r", "--name-only", rev]).await?;
        Ok(parse_paths(&stdout))
    }

    async fn read_file(&self, rev: &str, path: &str) -> VcsResult<Option<String>> {
        let object = format!("{rev}:{path}");
        if !self.succeeds(&["cat-file", "-e", &object]).await? {
            return Ok(None);
        }
        self.run(&["show", &object]).await.map(Some)
    }

    async fn status(&self) -> VcsResult<Vec<StatusEntry>> {
        let stdout = self.run(&["status", "--porcelain"]).await?;
        Ok(stdout.lines().filter_map(StatusEntry::parse).collect())
    }

    async fn create_branch(&self, name: &str, start: &str) -> VcsResult<()> {
        debug!(branch = name, start, "creating branch");
        self.run(&["checkout", "-q", "-b", name, start]).await.map(drop)
    }

    async fn checkout(&self, rev: &str) -> VcsResult<()> {
        self.run(&["checkout", "-q", rev]).await.map(drop)
    }

    async fn stage_all(&self) -> VcsResult<()> {
        self.run(&["add", "--all"]).await.map(drop)
    }

    async fn commit(&self, message: &str) -> VcsResult<String> {
        self.run(&["commit", "-q", "-m", message]).await?;
        self.resolve("HEAD").await
    }

    async fn merge_no_ff(&self, branch: &str, message: &str) -> VcsResult<MergeOutcome> {
        let output = self.output(&["merge", "--no-ff", "-m", message, branch]).await?;
        if output.status.success() {
            return Ok(MergeOutcome::Merged);
        }
        let unmerged = self.run(&["diff", "--name-only", "--diff-filter=U"]).await?;
        let paths = parse_paths(&unmerged);
        if paths.is_empty() {
            Err(VcsError::command_failed(
                format!("merge --no-ff {branch}"),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr),
            ))
        } else {
            Ok(MergeOutcome::Conflicted(paths))
        }
    }

    async fn abort_merge(&self) -> VcsResult<()> {
        self.run(&["merge", "--abort"]).await.map(drop)
    }

    async fn reset_hard(&self, rev: &str) -> VcsResult<()> {
        self.run(&["reset", "-q", "--hard", rev]).await.map(drop)
    }

    async fn clean_untracked(&self) -> VcsResult<()> {
        self.run(&["clean", "-q", "-fd"]).await.map(drop)
    }

    async fn delete_branch(&self, name: &str) -> VcsResult<()> {
        self.run(&["branch", "-q", "-D", name]).await.map(drop)
    }

    async fn push(&self, remote: &str, branch: &str) -> VcsResult<()> {
        debug!(remote, branch, "pushing");
        self.run(&["push", remote, branch]).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_log_splits_hash_and_subject() {
        let out = "abc123\tFix header parsing\ndef456\tAdd LoadApi for stores\n\n";
        assert_eq!(
            parse_log(out),
            vec![
                LogEntry { hash: "abc123".into(), subject: "Fix header parsing".into() },
                LogEntry { hash: "def456".into(), subject: "Add LoadApi for stores".into() },
            ]
        );
    }

    #[test]
    fn parse_log_tolerates_empty_subject() {
        assert_eq!(parse_log("abc\t\n")[0].subject, "");
        assert_eq!(parse_log("abc\n")[0].hash, "abc");
    }

    #[test]
    fn parse_paths_skips_blank_lines() {
        assert_eq!(parse_paths("\na.java\n  \nb/c.py\n"), vec!["a.java", "b/c.py"]);
    }

    #[tokio::test]
    async fn missing_work_dir_is_reported() {
        let git = GitCli::new("/definitely/not/a/porter/repo");
        assert!(matches!(git.status().await, Err(VcsError::WorkDirMissing(_))));
        assert!(!git.is_repository().await.unwrap());
    }
}
