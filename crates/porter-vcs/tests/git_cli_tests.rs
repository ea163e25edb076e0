//! Smoke tests against a real `git` binary
//!
//! Skipped when `git` is not on PATH.

use porter_vcs::{GitCli, MergeOutcome, VersionControl};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn sh(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Porter Test")
        .env("GIT_AUTHOR_EMAIL", "porter@example.com")
        .env("GIT_COMMITTER_NAME", "Porter Test")
        .env("GIT_COMMITTER_EMAIL", "porter@example.com")
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

fn write(dir: &Path, path: &str, content: &str) {
    let full = dir.join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(full, content).unwrap();
}

/// Repository with `main` (one commit) and `feature` (two more commits)
fn setup_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    sh(root, &["init", "-q", "-b", "main"]);
    sh(root, &["config", "user.name", "Porter Test"]);
    sh(root, &["config", "user.email", "porter@example.com"]);
    write(root, "README.md", "base\n");
    sh(root, &["add", "--all"]);
    sh(root, &["commit", "-q", "-m", "initial"]);

    sh(root, &["checkout", "-q", "-b", "feature"]);
    write(root, "src/StoreModule.java", "class StoreModule {}\n");
    sh(root, &["add", "--all"]);
    sh(root, &["commit", "-q", "-m", "Add store module"]);
    write(root, "README.md", "base\nmore\n");
    sh(root, &["add", "--all"]);
    sh(root, &["commit", "-q", "-m", "Update readme"]);
    sh(root, &["checkout", "-q", "main"]);
    dir
}

#[tokio::test]
async fn log_range_lists_oldest_first() {
    if !git_available() {
        return;
    }
    let dir = setup_repo();
    let git = GitCli::new(dir.path());

    let entries = git.log_range("main", "feature").await.unwrap();
    let subjects: Vec<_> = entries.iter().map(|e| e.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Add store module", "Update readme"]);

    let files = git.changed_files(&entries[0].hash).await.unwrap();
    assert_eq!(files, vec!["src/StoreModule.java"]);
}

#[tokio::test]
async fn read_file_distinguishes_missing_paths() {
    if !git_available() {
        return;
    }
    let dir = setup_repo();
    let git = GitCli::new(dir.path());

    let content = git.read_file("feature", "src/StoreModule.java").await.unwrap();
    assert_eq!(content.as_deref(), Some("class StoreModule {}\n"));
    assert_eq!(git.read_file("main", "src/StoreModule.java").await.unwrap(), None);

    let files = git.list_files("feature").await.unwrap();
    assert!(files.contains(&"src/StoreModule.java".to_string()));
}

#[tokio::test]
async fn branches_and_status() {
    if !git_available() {
        return;
    }
    let dir = setup_repo();
    let git = GitCli::new(dir.path());

    assert!(git.is_repository().await.unwrap());
    assert!(git.branch_exists("feature").await.unwrap());
    assert!(!git.branch_exists("nope").await.unwrap());
    assert!(git.current_ref().await.unwrap().is_branch("main"));
    assert!(git.is_clean().await.unwrap());

    write(dir.path(), "scratch.txt", "x");
    let status = git.status().await.unwrap();
    assert_eq!(status.len(), 1);
    assert!(status[0].is_untracked());

    git.clean_untracked().await.unwrap();
    assert!(git.is_clean().await.unwrap());
}

#[tokio::test]
async fn merge_reports_conflicting_paths() {
    if !git_available() {
        return;
    }
    let dir = setup_repo();
    let root = dir.path();
    write(root, "README.md", "diverged on main\n");
    sh(root, &["commit", "-q", "-am", "diverge"]);
    let git = GitCli::new(root);

    let outcome = git.merge_no_ff("feature", "merge feature").await.unwrap();
    assert_eq!(outcome, MergeOutcome::Conflicted(vec!["README.md".to_string()]));

    git.abort_merge().await.unwrap();
    assert!(git.is_clean().await.unwrap());
}
