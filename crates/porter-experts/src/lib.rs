//! Porter Experts - domain knowledge for conflict resolution
//!
//! Each expert is built from a markdown document with `##` sections
//! (patterns, rules, examples, conflicts) and numbered `Rule N:` passages.
//! A missing or empty document yields a fallback expert, never an error.
//!
//! The [`ExpertCoordinator`] picks experts per conflict, scores their
//! opinions (0.5 base, +0.3 language match, +0.2 specific recommendation)
//! and synthesizes one deterministic [`Resolution`](porter_model::Resolution).
//!
//! # Example
//!
//! ```rust,ignore
//! use porter_experts::ExpertCoordinator;
//!
//! # async fn example(conflicts: Vec<porter_model::Conflict>) {
//! let coordinator = ExpertCoordinator::load("experts".as_ref()).await;
//! for resolution in coordinator.resolve_all(&conflicts) {
//!     println!("{} ({:.0}%)", resolution.recommendation, resolution.confidence * 100.0);
//! }
//! # }
//! ```

#![warn(missing_docs)]

pub mod coordinator;
pub mod error;
pub mod expert;
pub mod knowledge;

pub use coordinator::{
    synthesize, ConflictRecord, ConflictReport, DomainGuidance, ExpertCoordinator, ExpertSummary,
    KnowledgeSummary, GENERAL_PRINCIPLES, HIGH_CONFIDENCE,
};
pub use error::{ExpertError, ExpertResult};
pub use expert::{Expert, ExpertKind, ALTERNATIVES};
pub use knowledge::{extract_rules, parse_knowledge, ExpertKnowledge};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
