//! Porter Model - shared data types for cross-branch migrations
//!
//! Every component of the migration pipeline exchanges these types:
//! - [`Commit`] and [`CommitCategory`]: what is being migrated
//! - [`DomainType`] and [`ComponentKind`]: how a repository and its files are classified
//! - [`PatternProfile`]: a structural snapshot of a branch's conventions
//! - [`Adaptation`], [`ChangeNote`] and [`Conflict`]: per-file adaptation output
//! - [`ExpertOpinion`] and [`Resolution`]: expert output for conflicts
//! - [`MigrationRequest`]: the immutable run input
//!
//! # Example
//!
//! ```rust,ignore
//! use porter_model::{Commit, CommitCategory};
//!
//! let commit = Commit::new("a1b2c3d", "fix header parsing", CommitCategory::BugFix)
//!     .with_files(vec!["src/HeaderModule.java".into()]);
//! assert_eq!(commit.category.risk(), porter_model::RiskLevel::Medium);
//! ```

#![warn(missing_docs)]

pub mod adaptation;
pub mod commit;
pub mod domain;
pub mod expert;
pub mod profile;
pub mod request;

pub use adaptation::{
    Adaptation, ChangeNote, Conflict, ConflictId, ConflictScope, ConflictType, NoteLevel, Severity,
};
pub use commit::{Commit, CommitCategory, RiskLevel};
pub use domain::{ComponentKind, DomainType, LanguageFamily, UnknownDomain};
pub use expert::{ExpertOpinion, Resolution};
pub use profile::{ComponentPattern, PatternProfile};
pub use request::{MigrationOptions, MigrationRequest, RunId};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the Porter model
    pub use crate::{
        Adaptation, ChangeNote, Commit, CommitCategory, ComponentKind, ComponentPattern, Conflict,
        ConflictType, DomainType, ExpertOpinion, MigrationOptions, MigrationRequest, NoteLevel,
        PatternProfile, Resolution, Severity,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
