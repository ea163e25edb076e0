//! In-memory repository with a real on-disk working tree
//!
//! History lives in memory as full-tree snapshots; the working tree is a
//! temporary directory so code that writes files and then stages/commits
//! behaves exactly as it would against `git`.

use async_trait::async_trait;
use parking_lot::Mutex;
use porter_vcs::{CurrentRef, LogEntry, MergeOutcome, StatusEntry, VcsError, VcsResult, VersionControl};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub type Tree = BTreeMap<String, String>;

#[derive(Debug, Clone)]
struct FakeCommit {
    subject: String,
    parents: Vec<String>,
    seq: usize,
    tree: Tree,
    changed: Vec<String>,
}

#[derive(Debug)]
struct State {
    commits: HashMap<String, FakeCommit>,
    branches: BTreeMap<String, String>,
    head: CurrentRef,
    next_seq: usize,
    merge_conflict: Option<Vec<String>>,
    push_error: Option<String>,
    push_stalls: bool,
    stalled_pushes: usize,
    merging: bool,
    mutations: usize,
    pushes: Vec<(String, String)>,
    fetches: usize,
}

/// Fake [`VersionControl`] for tests
#[derive(Debug)]
pub struct FakeVcs {
    dir: TempDir,
    state: Mutex<State>,
}

fn diff(before: &Tree, after: &Tree) -> Vec<String> {
    let mut paths: BTreeSet<&String> = BTreeSet::new();
    for (path, content) in after {
        if before.get(path) != Some(content) {
            paths.insert(path);
        }
    }
    for path in before.keys() {
        if !after.contains_key(path) {
            paths.insert(path);
        }
    }
    paths.into_iter().cloned().collect()
}

fn mix(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn failed(command: &str, stderr: &str) -> VcsError {
    VcsError::command_failed(command, Some(1), stderr)
}

impl State {
    fn resolve(&self, rev: &str) -> VcsResult<String> {
        if rev == "HEAD" {
            return match &self.head {
                CurrentRef::Branch(b) => self
                    .branches
                    .get(b)
                    .cloned()
                    .ok_or_else(|| failed("rev-parse HEAD", "unborn branch")),
                CurrentRef::Detached(h) => Ok(h.clone()),
            };
        }
        if let Some(hash) = self.branches.get(rev) {
            return Ok(hash.clone());
        }
        if self.commits.contains_key(rev) {
            return Ok(rev.to_string());
        }
        let matches: Vec<&String> = if rev.len() >= 4 {
            self.commits.keys().filter(|h| h.starts_with(rev)).collect()
        } else {
            Vec::new()
        };
        match matches.as_slice() {
            [one] => Ok((*one).clone()),
            _ => Err(VcsError::command_failed(
                format!("rev-parse --verify {rev}"),
                Some(128),
                format!("fatal: unknown revision '{rev}'"),
            )),
        }
    }

    fn commit(&self, hash: &str) -> VcsResult<&FakeCommit> {
        self.commits
            .get(hash)
            .ok_or_else(|| failed("cat-file", "bad object"))
    }

    fn tree(&self, rev: &str) -> VcsResult<Tree> {
        let hash = self.resolve(rev)?;
        Ok(self.commit(&hash)?.tree.clone())
    }

    fn ancestors(&self, hash: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([hash.to_string()]);
        while let Some(h) = queue.pop_front() {
            if !seen.insert(h.clone()) {
                continue;
            }
            if let Some(c) = self.commits.get(&h) {
                queue.extend(c.parents.iter().cloned());
            }
            order.push(h);
        }
        order
    }

    fn add_commit(&mut self, subject: &str, parents: Vec<String>, tree: Tree) -> String {
        let seq = self.next_seq;
        self.next_seq += 1;
        let hash = format!("{:016x}{:016x}{:08x}", mix(seq as u64), mix(!(seq as u64)), seq);
        let before = parents
            .first()
            .and_then(|p| self.commits.get(p))
            .map(|c| c.tree.clone())
            .unwrap_or_default();
        let changed = diff(&before, &tree);
        self.commits.insert(
            hash.clone(),
            FakeCommit {
                subject: subject.to_string(),
                parents,
                seq,
                tree,
                changed,
            },
        );
        hash
    }

    fn move_head(&mut self, hash: String) {
        match &self.head {
            CurrentRef::Branch(b) => {
                self.branches.insert(b.clone(), hash);
            }
            CurrentRef::Detached(_) => self.head = CurrentRef::Detached(hash),
        }
    }
}

impl FakeVcs {
    /// Repository with a `main` branch holding one commit with `README.md`
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let mut state = State {
            commits: HashMap::new(),
            branches: BTreeMap::new(),
            head: CurrentRef::Branch("main".to_string()),
            next_seq: 0,
            merge_conflict: None,
            push_error: None,
            push_stalls: false,
            stalled_pushes: 0,
            merging: false,
            mutations: 0,
            pushes: Vec::new(),
            fetches: 0,
        };
        let tree = Tree::from([("README.md".to_string(), "# repo\n".to_string())]);
        let root = state.add_commit("initial", Vec::new(), tree.clone());
        state.branches.insert("main".to_string(), root);
        let vcs = Self {
            dir,
            state: Mutex::new(state),
        };
        vcs.materialize(&tree);
        vcs
    }

    /// Working tree root
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Commit file changes directly onto a branch (`None` deletes a file)
    ///
    /// The working tree is refreshed when the branch is checked out.
    pub fn commit_on(&self, branch: &str, subject: &str, changes: &[(&str, Option<&str>)]) -> String {
        let mut state = self.state.lock();
        let parent = state.branches.get(branch).cloned().expect("branch exists");
        let mut tree = state.commits[&parent].tree.clone();
        for (path, content) in changes {
            match content {
                Some(c) => tree.insert((*path).to_string(), (*c).to_string()),
                None => tree.remove(*path),
            };
        }
        let hash = state.add_commit(subject, vec![parent], tree.clone());
        state.branches.insert(branch.to_string(), hash.clone());
        let checked_out = state.head.is_branch(branch);
        drop(state);
        if checked_out {
            self.materialize(&tree);
        }
        hash
    }

    /// Create a branch at another branch's tip without checking it out
    pub fn branch_from(&self, name: &str, start: &str) {
        let mut state = self.state.lock();
        let tip = state.resolve(start).expect("start exists");
        state.branches.insert(name.to_string(), tip);
    }

    /// Check out a branch without counting it as a mutation
    pub fn switch_to(&self, branch: &str) {
        let mut state = self.state.lock();
        let tree = state.tree(branch).expect("branch exists");
        state.head = CurrentRef::Branch(branch.to_string());
        drop(state);
        self.materialize(&tree);
    }

    /// Next merge reports these conflicting paths
    pub fn fail_next_merge(&self, paths: &[&str]) {
        self.state.lock().merge_conflict = Some(paths.iter().map(ToString::to_string).collect());
    }

    /// Every push fails with this message
    pub fn fail_push(&self, message: &str) {
        self.state.lock().push_error = Some(message.to_string());
    }

    /// Every push hangs until its future is dropped
    pub fn stall_push(&self) {
        self.state.lock().push_stalls = true;
    }

    /// Pushes currently hanging
    pub fn stalled_pushes(&self) -> usize {
        self.state.lock().stalled_pushes
    }

    /// Number of mutating calls made through [`VersionControl`]
    pub fn mutations(&self) -> usize {
        self.state.lock().mutations
    }

    /// Successful pushes as `(remote, branch)`
    pub fn pushes(&self) -> Vec<(String, String)> {
        self.state.lock().pushes.clone()
    }

    /// Number of fetches
    pub fn fetches(&self) -> usize {
        self.state.lock().fetches
    }

    /// Local branch names
    pub fn branch_names(&self) -> Vec<String> {
        self.state.lock().branches.keys().cloned().collect()
    }

    /// Tip of a branch
    pub fn tip(&self, branch: &str) -> Option<String> {
        self.state.lock().branches.get(branch).cloned()
    }

    /// Where HEAD points
    pub fn head(&self) -> CurrentRef {
        self.state.lock().head.clone()
    }

    /// Subjects of first-parent history from a revision, newest first
    pub fn subjects(&self, rev: &str) -> Vec<String> {
        let state = self.state.lock();
        let mut out = Vec::new();
        let mut next = state.resolve(rev).ok();
        while let Some(hash) = next {
            let Some(commit) = state.commits.get(&hash) else {
                break;
            };
            out.push(commit.subject.clone());
            next = commit.parents.first().cloned();
        }
        out
    }

    /// Parents of a commit
    pub fn parents(&self, rev: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .resolve(rev)
            .ok()
            .and_then(|h| state.commits.get(&h).map(|c| c.parents.clone()))
            .unwrap_or_default()
    }

    /// Snapshot of a revision
    pub fn snapshot(&self, rev: &str) -> Tree {
        self.state.lock().tree(rev).unwrap_or_default()
    }

    /// Files currently on disk
    pub fn disk(&self) -> Tree {
        read_tree(self.dir.path())
    }

    fn materialize(&self, tree: &Tree) {
        let root = self.dir.path();
        for path in read_tree(root).keys() {
            let _ = std::fs::remove_file(root.join(path));
        }
        for (path, content) in tree {
            let full = root.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).expect("create dirs");
            }
            std::fs::write(full, content).expect("write file");
        }
    }

    fn mutate(&self) -> parking_lot::MutexGuard<'_, State> {
        let mut state = self.state.lock();
        state.mutations += 1;
        state
    }
}

impl Default for FakeVcs {
    fn default() -> Self {
        Self::new()
    }
}

fn read_tree(root: &Path) -> Tree {
    let mut tree = Tree::new();
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if let Ok(content) = std::fs::read_to_string(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel: Vec<_> = rel.iter().map(|p| p.to_string_lossy()).collect();
                    tree.insert(rel.join("/"), content);
                }
            }
        }
    }
    tree
}

#[async_trait]
impl VersionControl for FakeVcs {
    fn work_dir(&self) -> &Path {
        self.dir.path()
    }

    async fn is_repository(&self) -> VcsResult<bool> {
        Ok(true)
    }

    async fn fetch_all(&self) -> VcsResult<()> {
        self.state.lock().fetches += 1;
        Ok(())
    }

    async fn branch_exists(&self, branch: &str) -> VcsResult<bool> {
        Ok(self.state.lock().branches.contains_key(branch))
    }

    async fn current_ref(&self) -> VcsResult<CurrentRef> {
        Ok(self.state.lock().head.clone())
    }

    async fn resolve(&self, rev: &str) -> VcsResult<String> {
        self.state.lock().resolve(rev)
    }

    async fn log_range(&self, exclude: &str, include: &str) -> VcsResult<Vec<LogEntry>> {
        let state = self.state.lock();
        let excluded: BTreeSet<String> = state.ancestors(&state.resolve(exclude)?).into_iter().collect();
        let mut commits: Vec<(usize, LogEntry)> = state
            .ancestors(&state.resolve(include)?)
            .into_iter()
            .filter(|h| !excluded.contains(h))
            .filter_map(|h| {
                let c = state.commits.get(&h)?;
                (c.parents.len() <= 1).then(|| {
                    (
                        c.seq,
                        LogEntry {
                            hash: h.clone(),
                            subject: c.subject.clone(),
                        },
                    )
                })
            })
            .collect();
        commits.sort_by_key(|(seq, _)| *seq);
        Ok(commits.into_iter().map(|(_, e)| e).collect())
    }

    async fn changed_files(&self, commit: &str) -> VcsResult<Vec<String>> {
        let state = self.state.lock();
        let hash = state.resolve(commit)?;
        Ok(state.commit(&hash)?.changed.clone())
    }

    async fn list_files(&self, rev: &str) -> VcsResult<Vec<String>> {
        Ok(self.state.lock().tree(rev)?.into_keys().collect())
    }

    async fn read_file(&self, rev: &str, path: &str) -> VcsResult<Option<String>> {
        Ok(self.state.lock().tree(rev)?.get(path).cloned())
    }

    async fn status(&self) -> VcsResult<Vec<StatusEntry>> {
        let head = self.state.lock().tree("HEAD")?;
        let disk = read_tree(self.dir.path());
        let mut entries = Vec::new();
        for (path, content) in &disk {
            let code = match head.get(path) {
                None => "??",
                Some(c) if c != content => " M",
                Some(_) => continue,
            };
            entries.push(StatusEntry {
                code: code.to_string(),
                path: path.clone(),
            });
        }
        for path in head.keys().filter(|p| !disk.contains_key(*p)) {
            entries.push(StatusEntry {
                code: " D".to_string(),
                path: path.clone(),
            });
        }
        Ok(entries)
    }

    async fn create_branch(&self, name: &str, start: &str) -> VcsResult<()> {
        let mut state = self.mutate();
        if state.branches.contains_key(name) {
            return Err(failed(
                "checkout -b",
                &format!("fatal: a branch named '{name}' already exists"),
            ));
        }
        let tip = state.resolve(start)?;
        let tree = state.commit(&tip)?.tree.clone();
        state.branches.insert(name.to_string(), tip);
        state.head = CurrentRef::Branch(name.to_string());
        drop(state);
        self.materialize(&tree);
        Ok(())
    }

    async fn checkout(&self, rev: &str) -> VcsResult<()> {
        let mut state = self.mutate();
        let hash = state.resolve(rev)?;
        let tree = state.commit(&hash)?.tree.clone();
        state.head = if state.branches.contains_key(rev) {
            CurrentRef::Branch(rev.to_string())
        } else {
            CurrentRef::Detached(hash)
        };
        drop(state);
        self.materialize(&tree);
        Ok(())
    }

    async fn stage_all(&self) -> VcsResult<()> {
        drop(self.mutate());
        Ok(())
    }

    async fn commit(&self, message: &str) -> VcsResult<String> {
        let mut state = self.mutate();
        let head = state.resolve("HEAD")?;
        let disk = read_tree(self.dir.path());
        if state.commit(&head)?.tree == disk {
            return Err(failed("commit", "nothing to commit, working tree clean"));
        }
        let subject = message.lines().next().unwrap_or_default();
        let hash = state.add_commit(subject, vec![head], disk);
        state.move_head(hash.clone());
        Ok(hash)
    }

    async fn merge_no_ff(&self, branch: &str, message: &str) -> VcsResult<MergeOutcome> {
        let mut state = self.mutate();
        if let Some(paths) = state.merge_conflict.take() {
            state.merging = true;
            return Ok(MergeOutcome::Conflicted(paths));
        }
        let ours = state.resolve("HEAD")?;
        let theirs = state.resolve(branch)?;
        let ours_ancestors: BTreeSet<String> = state.ancestors(&ours).into_iter().collect();
        let base = state
            .ancestors(&theirs)
            .into_iter()
            .find(|h| ours_ancestors.contains(h));
        let base_tree = base
            .and_then(|b| state.commits.get(&b).map(|c| c.tree.clone()))
            .unwrap_or_default();
        let their_tree = state.commit(&theirs)?.tree.clone();
        let mut merged = state.commit(&ours)?.tree.clone();
        for path in diff(&base_tree, &their_tree) {
            match their_tree.get(&path) {
                Some(content) => merged.insert(path, content.clone()),
                None => merged.remove(&path),
            };
        }
        let subject = message.lines().next().unwrap_or_default();
        let hash = state.add_commit(subject, vec![ours, theirs], merged.clone());
        state.move_head(hash);
        drop(state);
        self.materialize(&merged);
        Ok(MergeOutcome::Merged)
    }

    async fn abort_merge(&self) -> VcsResult<()> {
        let mut state = self.mutate();
        if !state.merging {
            return Err(failed("merge --abort", "fatal: There is no merge to abort"));
        }
        state.merging = false;
        let tree = state.tree("HEAD")?;
        drop(state);
        self.materialize(&tree);
        Ok(())
    }

    async fn reset_hard(&self, rev: &str) -> VcsResult<()> {
        let mut state = self.mutate();
        let hash = state.resolve(rev)?;
        let tree = state.commit(&hash)?.tree.clone();
        state.move_head(hash);
        state.merging = false;
        drop(state);
        self.materialize(&tree);
        Ok(())
    }

    async fn clean_untracked(&self) -> VcsResult<()> {
        let head = self.mutate().tree("HEAD")?;
        let root = self.dir.path();
        for path in read_tree(root).keys().filter(|p| !head.contains_key(*p)) {
            let _ = std::fs::remove_file(root.join(path));
        }
        Ok(())
    }

    async fn delete_branch(&self, name: &str) -> VcsResult<()> {
        let mut state = self.mutate();
        if state.head.is_branch(name) {
            return Err(failed(
                "branch -D",
                &format!("error: cannot delete branch '{name}' checked out"),
            ));
        }
        if state.branches.remove(name).is_none() {
            return Err(failed(
                "branch -D",
                &format!("error: branch '{name}' not found"),
            ));
        }
        Ok(())
    }

    async fn push(&self, remote: &str, branch: &str) -> VcsResult<()> {
        let stalls = {
            let mut state = self.state.lock();
            if state.push_stalls {
                state.stalled_pushes += 1;
            }
            state.push_stalls
        };
        if stalls {
            std::future::pending::<()>().await;
        }
        let mut state = self.mutate();
        if let Some(message) = &state.push_error {
            return Err(VcsError::command_failed(
                format!("push {remote} {branch}"),
                Some(1),
                message.clone(),
            ));
        }
        state.pushes.push((remote.to_string(), branch.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn history_and_trees() {
        let vcs = FakeVcs::new();
        vcs.branch_from("feature", "main");
        let a = vcs.commit_on("feature", "Add a", &[("a.txt", Some("a"))]);
        let b = vcs.commit_on("feature", "Remove readme", &[("README.md", None)]);

        let log = vcs.log_range("main", "feature").await.unwrap();
        let hashes: Vec<_> = log.iter().map(|e| e.hash.clone()).collect();
        assert_eq!(hashes, vec![a.clone(), b.clone()]);
        assert_eq!(vcs.changed_files(&b).await.unwrap(), vec!["README.md"]);
        assert_eq!(vcs.read_file(&b, "README.md").await.unwrap(), None);
        assert_eq!(vcs.read_file("feature", "a.txt").await.unwrap().as_deref(), Some("a"));
        assert_eq!(vcs.mutations(), 0);
    }

    #[tokio::test]
    async fn working_tree_commit_and_status() {
        let vcs = FakeVcs::new();
        vcs.create_branch("work", "main").await.unwrap();
        assert!(vcs.is_clean().await.unwrap());

        std::fs::write(vcs.path().join("new.txt"), "n").unwrap();
        assert_eq!(vcs.status().await.unwrap()[0].code, "??");

        vcs.stage_all().await.unwrap();
        vcs.commit("Add new").await.unwrap();
        assert!(vcs.is_clean().await.unwrap());
        assert!(vcs.commit("again").await.is_err());
        assert_eq!(vcs.subjects("work"), vec!["Add new", "initial"]);
    }

    #[tokio::test]
    async fn merge_applies_branch_changes() {
        let vcs = FakeVcs::new();
        vcs.branch_from("feature", "main");
        vcs.commit_on("feature", "Add f", &[("f.txt", Some("f"))]);
        vcs.commit_on("main", "Add m", &[("m.txt", Some("m"))]);

        let outcome = vcs.merge_no_ff("feature", "Merge feature").await.unwrap();
        assert_eq!(outcome, MergeOutcome::Merged);
        let tree = vcs.snapshot("main");
        assert!(tree.contains_key("f.txt") && tree.contains_key("m.txt"));
        assert_eq!(vcs.parents("main").len(), 2);
        assert_eq!(vcs.disk(), tree);
    }

    #[tokio::test]
    async fn injected_failures() {
        let vcs = FakeVcs::new();
        vcs.fail_next_merge(&["README.md"]);
        vcs.fail_push("rejected");
        vcs.branch_from("feature", "main");

        let outcome = vcs.merge_no_ff("feature", "m").await.unwrap();
        assert_eq!(outcome, MergeOutcome::Conflicted(vec!["README.md".into()]));
        vcs.abort_merge().await.unwrap();
        assert!(vcs.abort_merge().await.is_err());
        assert!(vcs.push("origin", "main").await.unwrap_err().mentions("rejected"));
    }

    #[tokio::test]
    async fn cannot_delete_checked_out_branch() {
        let vcs = FakeVcs::new();
        assert!(vcs.delete_branch("main").await.is_err());
        vcs.create_branch("tmp", "main").await.unwrap();
        vcs.checkout("main").await.unwrap();
        vcs.delete_branch("tmp").await.unwrap();
        assert_eq!(vcs.branch_names(), vec!["main"]);
    }
}
