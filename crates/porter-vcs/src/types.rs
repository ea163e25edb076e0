//! Value types returned by version-control queries

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of a history range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Full commit hash
    pub hash: String,
    /// Subject line
    pub subject: String,
}

/// One line of a porcelain status listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Two-character status code (`??`, ` M`, `A `, ...)
    pub code: String,
    /// Path relative to the working directory
    pub path: String,
}

impl StatusEntry {
    /// Parse a porcelain v1 line
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        if line.len() < 4 {
            return None;
        }
        let code = line.get(..2)?.to_string();
        let raw = line.get(3..)?;
        // Renames report "old -> new"
        let path = raw.rsplit(" -> ").next().unwrap_or(raw).trim_matches('"');
        Some(Self {
            code,
            path: path.to_string(),
        })
    }

    /// Untracked file
    #[inline]
    #[must_use]
    pub fn is_untracked(&self) -> bool {
        self.code == "??"
    }

    /// Unmerged path
    #[inline]
    #[must_use]
    pub fn is_unmerged(&self) -> bool {
        matches!(self.code.as_str(), "DD" | "AU" | "UD" | "UA" | "DU" | "AA" | "UU")
    }
}

/// Where HEAD points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrentRef {
    /// On a named branch
    Branch(String),
    /// Detached at a commit
    Detached(String),
}

impl CurrentRef {
    /// Revision that checks this position out again
    #[inline]
    #[must_use]
    pub fn revision(&self) -> &str {
        match self {
            Self::Branch(name) | Self::Detached(name) => name,
        }
    }

    /// Whether HEAD is on the given branch
    #[inline]
    #[must_use]
    pub fn is_branch(&self, branch: &str) -> bool {
        matches!(self, Self::Branch(name) if name == branch)
    }
}

impl fmt::Display for CurrentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(name) => f.write_str(name),
            Self::Detached(sha) => write!(f, "(detached at {sha})"),
        }
    }
}

/// Result of a non-fast-forward merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeOutcome {
    /// Merge commit created
    Merged,
    /// Merge stopped on conflicting paths; the merge is still in progress
    Conflicted(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_lines() {
        let modified = StatusEntry::parse(" M src/Main.java").unwrap();
        assert_eq!(modified.code, " M");
        assert_eq!(modified.path, "src/Main.java");

        let untracked = StatusEntry::parse("?? new.txt").unwrap();
        assert!(untracked.is_untracked());

        let renamed = StatusEntry::parse("R  old.sql -> new.sql").unwrap();
        assert_eq!(renamed.path, "new.sql");

        let unmerged = StatusEntry::parse("UU conflict.py").unwrap();
        assert!(unmerged.is_unmerged());

        assert!(StatusEntry::parse("").is_none());
    }

    #[test]
    fn current_ref_revision() {
        assert_eq!(CurrentRef::Branch("main".into()).revision(), "main");
        assert!(CurrentRef::Branch("main".into()).is_branch("main"));
        assert!(!CurrentRef::Detached("abc".into()).is_branch("abc"));
    }
}
