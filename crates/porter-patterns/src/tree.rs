//! Source trees: where analyzed files come from

use crate::error::{PatternError, PatternResult};
use async_trait::async_trait;
use porter_vcs::VersionControl;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read-only view over a set of files
#[async_trait]
pub trait SourceTree: Send + Sync {
    /// Label used in profiles and logs (branch name or directory)
    fn label(&self) -> String;

    /// Every file path, relative to the tree root, sorted
    async fn list_files(&self) -> PatternResult<Vec<String>>;

    /// File content; `None` when the path does not exist
    async fn read_file(&self, path: &str) -> PatternResult<Option<String>>;
}

/// A branch or revision read through version control
///
/// Never checks anything out, so analysis cannot disturb the working tree.
#[derive(Clone)]
pub struct RevisionTree {
    vcs: Arc<dyn VersionControl>,
    rev: String,
}

impl RevisionTree {
    /// Create tree over a revision
    #[must_use]
    pub fn new(vcs: Arc<dyn VersionControl>, rev: impl Into<String>) -> Self {
        Self {
            vcs,
            rev: rev.into(),
        }
    }

    /// Revision being read
    #[inline]
    #[must_use]
    pub fn rev(&self) -> &str {
        &self.rev
    }
}

impl std::fmt::Debug for RevisionTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionTree")
            .field("work_dir", &self.vcs.work_dir())
            .field("rev", &self.rev)
            .finish()
    }
}

#[async_trait]
impl SourceTree for RevisionTree {
    fn label(&self) -> String {
        self.rev.clone()
    }

    async fn list_files(&self) -> PatternResult<Vec<String>> {
        let mut files = self.vcs.list_files(&self.rev).await?;
        files.sort();
        Ok(files)
    }

    async fn read_file(&self, path: &str) -> PatternResult<Option<String>> {
        Ok(self.vcs.read_file(&self.rev, path).await?)
    }
}

/// A plain directory on disk
#[derive(Debug, Clone)]
pub struct DirectoryTree {
    root: PathBuf,
}

impl DirectoryTree {
    /// Create tree rooted at a directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel.iter().map(|p| p.to_string_lossy()).collect();
    Some(parts.join("/"))
}

#[async_trait]
impl SourceTree for DirectoryTree {
    fn label(&self) -> String {
        self.root.display().to_string()
    }

    async fn list_files(&self) -> PatternResult<Vec<String>> {
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| PatternError::io(&dir, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| PatternError::io(&dir, e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| PatternError::io(&path, e))?;
                if file_type.is_dir() {
                    if entry.file_name() != ".git" {
                        pending.push(path);
                    }
                } else if file_type.is_file() {
                    if let Some(rel) = relative(&self.root, &path) {
                        files.push(rel);
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn read_file(&self, path: &str) -> PatternResult<Option<String>> {
        let full = self.root.join(path);
        match tokio::fs::read_to_string(&full).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PatternError::io(full, e)),
        }
    }
}
