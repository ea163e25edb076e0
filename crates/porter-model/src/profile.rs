//! Pattern profiles: structural snapshots of a branch's conventions
//!
//! A profile is rebuilt on every run and keyed by [`ComponentKind`], so
//! consumers can ask "what does a conforming module look like here".

use crate::domain::{ComponentKind, DomainType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Structural facts extracted from one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPattern {
    /// Class, view or file stem
    pub name: String,
    /// Path relative to the repository root
    pub path: String,
    /// Inherited base type, if any
    pub parent: Option<String>,
    /// Annotations, decorators and flags present (`@Component`, `OPENROWSET`, ...)
    pub markers: BTreeSet<String>,
    /// Methods or functions defined
    pub members: Vec<String>,
    /// Header or column list, in declared order
    pub header: Vec<String>,
    /// Names this component registers (submodules, loaders, imports)
    pub registrations: Vec<String>,
    /// Free-form attributes (package, field types, counts)
    pub attributes: BTreeMap<String, String>,
}

impl ComponentPattern {
    /// Create pattern for a named component at a path
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// With parent type
    #[inline]
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// With a marker
    #[inline]
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.insert(marker.into());
        self
    }

    /// With header columns
    #[inline]
    #[must_use]
    pub fn with_header(mut self, header: Vec<String>) -> Self {
        self.header = header;
        self
    }

    /// Check marker presence
    #[inline]
    #[must_use]
    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.contains(marker)
    }

    /// Check member presence
    #[inline]
    #[must_use]
    pub fn has_member(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }
}

/// Per-branch structural summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternProfile {
    /// Domain the profile was produced for
    pub domain: DomainType,
    /// Branch or revision analyzed
    pub revision: String,
    /// Number of files inspected
    pub files_scanned: usize,
    components: BTreeMap<ComponentKind, IndexMap<String, ComponentPattern>>,
}

impl PatternProfile {
    /// Create empty profile
    #[must_use]
    pub fn new(domain: DomainType, revision: impl Into<String>) -> Self {
        Self {
            domain,
            revision: revision.into(),
            files_scanned: 0,
            components: BTreeMap::new(),
        }
    }

    /// Record a component, replacing any previous entry with the same name
    pub fn insert(&mut self, kind: ComponentKind, pattern: ComponentPattern) {
        self.components
            .entry(kind)
            .or_default()
            .insert(pattern.name.clone(), pattern);
    }

    /// Entries for a component kind
    pub fn entries(&self, kind: ComponentKind) -> impl Iterator<Item = &ComponentPattern> {
        self.components.get(&kind).into_iter().flat_map(IndexMap::values)
    }

    /// Look up a component by kind and name
    #[must_use]
    pub fn get(&self, kind: ComponentKind, name: &str) -> Option<&ComponentPattern> {
        self.components.get(&kind).and_then(|m| m.get(name))
    }

    /// Look up any component by repository path
    #[must_use]
    pub fn find_by_path(&self, path: &str) -> Option<(ComponentKind, &ComponentPattern)> {
        self.components.iter().find_map(|(kind, entries)| {
            entries.values().find(|p| p.path == path).map(|p| (*kind, p))
        })
    }

    /// Number of components of a kind
    #[inline]
    #[must_use]
    pub fn count(&self, kind: ComponentKind) -> usize {
        self.components.get(&kind).map_or(0, IndexMap::len)
    }

    /// Total number of components
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.values().map(IndexMap::len).sum()
    }

    /// Whether no components were found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kinds present in the profile
    pub fn kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.components
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(kind, _)| *kind)
    }

    /// Fraction of components of `kind` carrying `marker`
    ///
    /// Returns `None` when the profile has no component of that kind.
    #[must_use]
    pub fn marker_ratio(&self, kind: ComponentKind, marker: &str) -> Option<f64> {
        let total = self.count(kind);
        if total == 0 {
            return None;
        }
        let with = self.entries(kind).filter(|p| p.has_marker(marker)).count();
        #[allow(clippy::cast_precision_loss)]
        Some(with as f64 / total as f64)
    }

    /// Parent types used by components of `kind`, most common first
    #[must_use]
    pub fn parents(&self, kind: ComponentKind) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for parent in self.entries(kind).filter_map(|p| p.parent.as_deref()) {
            *counts.entry(parent).or_default() += 1;
        }
        let mut ranked: Vec<(String, usize)> =
            counts.into_iter().map(|(p, c)| (p.to_string(), c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    /// Every name registered by any component of `kind`
    #[must_use]
    pub fn registered_names(&self, kind: ComponentKind) -> BTreeSet<String> {
        self.entries(kind)
            .flat_map(|p| p.registrations.iter().cloned())
            .collect()
    }
}
