//! Porter Patterns - structural pattern analysis per repository domain
//!
//! # Layers
//!
//! - [`parser`]: the `parse(file) -> {symbols, structure}` capability with
//!   regex-based adapters for Java, Python, SQL, TSV and JSON
//! - [`tree`]: where files come from ([`RevisionTree`] reads a branch through
//!   version control without a checkout, [`DirectoryTree`] reads a directory)
//! - [`strategy`]: one [`PatternStrategy`] per [`DomainType`], producing a
//!   [`PatternProfile`] and per-file [`Adaptation`]s
//! - [`registry`]: explicit domain-to-strategy lookup
//!
//! Strategies only see [`ParsedSource`] values; they never run regexes over
//! raw text to discover structure.
//!
//! # Example
//!
//! ```rust,ignore
//! use porter_patterns::{DirectoryTree, StrategyRegistry};
//! use porter_model::DomainType;
//!
//! # async fn example() -> porter_patterns::PatternResult<()> {
//! let registry = StrategyRegistry::with_defaults();
//! let strategy = registry.for_domain(DomainType::JavaAlgorithm)?;
//! let profile = strategy.analyze_patterns(&DirectoryTree::new("/srv/algo")).await?;
//! println!("{} modules", profile.count(porter_model::ComponentKind::Module));
//! # Ok(())
//! # }
//! ```
//!
//! [`DomainType`]: porter_model::DomainType
//! [`PatternProfile`]: porter_model::PatternProfile
//! [`Adaptation`]: porter_model::Adaptation

#![warn(missing_docs)]

pub mod error;
pub mod parser;
pub mod registry;
pub mod render;
pub mod strategy;
pub mod tree;

pub use error::{PatternError, PatternResult};
pub use parser::{
    default_parsers, ParsedSource, ParserRegistry, SourceLanguage, SourceParser, SourceStructure,
    Symbol, SymbolKind,
};
pub use registry::StrategyRegistry;
pub use render::render_profile;
pub use strategy::{
    AdaptRequest, ConfigStrategy, JavaAlgorithmStrategy, LoadApiStrategy, MfpStrategy,
    PatternStrategy, GROUP_PARENT, MODULE_PARENTS, VALIDATION_PARENT,
};
pub use tree::{DirectoryTree, RevisionTree, SourceTree};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
