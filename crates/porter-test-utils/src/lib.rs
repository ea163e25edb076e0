//! Testing utilities for the Porter workspace
//!
//! Shared test helpers, fixtures, and an in-memory version-control fake.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc, clippy::must_use_candidate)]

pub mod fake_vcs;
pub mod fixtures;

pub use fake_vcs::FakeVcs;
pub use fixtures::{
    conforming_loader, group_module, java_module, loader_without_validate_row, sql_view,
    tsv_template, RepoBuilder,
};
