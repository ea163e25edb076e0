//! Source parsers
//!
//! Every parser turns one file into a [`ParsedSource`]: a flat symbol table
//! plus the structural facts pattern strategies care about. The built-in
//! parsers are regex based and deliberately shallow.

use crate::error::PatternResult;
use porter_model::ComponentPattern;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

mod java;
mod json;
mod python;
mod sql;
mod tabular;

pub use java::{JavaParser, JAVADOC_MARKER, STATIC_MARKER, VALIDATE_MARKER};
pub use json::{JsonParser, INVALID_MARKER, OBJECT_MARKER};
pub use python::{PythonParser, ADD_ERRORS_MARKER, MASTER_HEADER_MARKER};
pub use sql::{SqlParser, OPENROWSET_MARKER, SELECT_MARKER, WITH_MARKER};
pub use tabular::{TabularParser, TAB_DELIMITED_MARKER};

/// Languages understood by the built-in parsers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    /// Java
    Java,
    /// Python
    Python,
    /// SQL
    Sql,
    /// Tab-separated template
    Tsv,
    /// JSON document
    Json,
}

impl SourceLanguage {
    /// File extensions for this language
    #[must_use]
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Java => &["java"],
            Self::Python => &["py"],
            Self::Sql => &["sql"],
            Self::Tsv => &["tsv"],
            Self::Json => &["json"],
        }
    }

    /// Language name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Python => "python",
            Self::Sql => "sql",
            Self::Tsv => "tsv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of extracted symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Class, interface or enum
    Class,
    /// Method inside a class
    Method,
    /// Free function
    Function,
    /// Typed field
    Field,
    /// Upper-case constant
    Constant,
    /// Import statement
    Import,
    /// Annotation or decorator
    Decorator,
    /// SQL view
    View,
    /// Column in a header or `WITH` list
    Column,
    /// Top-level key of a document
    Key,
}

/// One named symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol kind
    pub kind: SymbolKind,
    /// Symbol name
    pub name: String,
    /// 1-based line number
    pub line: usize,
    /// Extra detail (field type, decorator argument, constant value)
    pub detail: Option<String>,
}

impl Symbol {
    /// Create new symbol
    #[inline]
    #[must_use]
    pub fn new(kind: SymbolKind, name: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            name: name.into(),
            line,
            detail: None,
        }
    }

    /// With detail
    #[inline]
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Structural facts extracted from a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStructure {
    /// Package or module path
    pub package: Option<String>,
    /// Primary declared name (first class or view)
    pub primary: Option<String>,
    /// Base type of the primary declaration
    pub parent: Option<String>,
    /// Flags present in the file
    pub markers: BTreeSet<String>,
    /// Declared header or column list
    pub header: Vec<String>,
    /// Names the file registers or wires in
    pub registrations: Vec<String>,
    /// Counts and other scalar facts
    pub attributes: BTreeMap<String, String>,
    /// Non-fatal parse problems
    pub diagnostics: Vec<String>,
}

/// Result of parsing one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSource {
    /// Repository-relative path
    pub path: String,
    /// Language the file was parsed as
    pub language: SourceLanguage,
    /// Symbols in source order
    pub symbols: Vec<Symbol>,
    /// Structural facts
    pub structure: SourceStructure,
}

impl ParsedSource {
    /// Create empty parse result
    #[must_use]
    pub fn new(path: impl Into<String>, language: SourceLanguage) -> Self {
        Self {
            path: path.into(),
            language,
            symbols: Vec::new(),
            structure: SourceStructure::default(),
        }
    }

    /// Symbols of a kind
    pub fn symbols_of(&self, kind: SymbolKind) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(move |s| s.kind == kind)
    }

    /// Names of symbols of a kind, in source order
    #[must_use]
    pub fn names(&self, kind: SymbolKind) -> Vec<&str> {
        self.symbols_of(kind).map(|s| s.name.as_str()).collect()
    }

    /// Whether a symbol of the kind and name exists
    #[must_use]
    pub fn has_symbol(&self, kind: SymbolKind, name: &str) -> bool {
        self.symbols_of(kind).any(|s| s.name == name)
    }

    /// Whether a marker is present
    #[inline]
    #[must_use]
    pub fn has_marker(&self, marker: &str) -> bool {
        self.structure.markers.contains(marker)
    }

    /// Name of the file without directories or extension
    #[must_use]
    pub fn stem(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        name.split_once('.').map_or(name, |(stem, _)| stem)
    }

    /// Integer attribute, zero when absent
    #[must_use]
    pub fn count(&self, key: &str) -> usize {
        self.structure
            .attributes
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Project the parse result onto a profile entry
    ///
    /// `members` are the methods and functions; the name is the primary
    /// declaration or the file stem.
    #[must_use]
    pub fn to_component(&self) -> ComponentPattern {
        let name = self
            .structure
            .primary
            .clone()
            .unwrap_or_else(|| self.stem().to_string());
        let mut pattern = ComponentPattern::new(name, self.path.clone());
        pattern.parent = self.structure.parent.clone();
        pattern.markers = self.structure.markers.clone();
        pattern.members = self
            .symbols
            .iter()
            .filter(|s| matches!(s.kind, SymbolKind::Method | SymbolKind::Function))
            .map(|s| s.name.clone())
            .collect();
        pattern.header = self.structure.header.clone();
        pattern.registrations = self.structure.registrations.clone();
        pattern.attributes = self.structure.attributes.clone();
        if let Some(package) = &self.structure.package {
            pattern
                .attributes
                .insert("package".to_string(), package.clone());
        }
        pattern
    }
}

/// The `parse(file) -> {symbols, structure}` capability
///
/// Implement this trait to add support for new file formats.
pub trait SourceParser: Send + Sync + 'static {
    /// Language produced
    fn language(&self) -> SourceLanguage;

    /// Parse file content
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Parse`](crate::PatternError::Parse) when the
    /// content cannot be read at all. Recoverable problems are recorded in
    /// [`SourceStructure::diagnostics`] instead.
    fn parse(&self, path: &str, content: &str) -> PatternResult<ParsedSource>;

    /// Supported file extensions (without dot)
    fn extensions(&self) -> &[&str] {
        self.language().extensions()
    }

    /// Check if this parser can handle the given path
    fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions().contains(&ext))
    }

    /// Parser priority (higher = tried first when multiple parsers match)
    fn priority(&self) -> i32 {
        0
    }
}

/// Ordered set of parsers
pub struct ParserRegistry {
    parsers: Vec<Box<dyn SourceParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("parser_count", &self.parsers.len())
            .field("extensions", &self.all_extensions())
            .finish()
    }
}

impl ParserRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Register a parser
    pub fn register<P: SourceParser>(&mut self, parser: P) {
        self.parsers.push(Box::new(parser));
        self.parsers
            .sort_by_key(|p| std::cmp::Reverse(p.priority()));
    }

    /// Find parser for path
    #[must_use]
    pub fn find_for_path(&self, path: &str) -> Option<&dyn SourceParser> {
        let path = Path::new(path);
        self.parsers
            .iter()
            .find(|p| p.can_parse(path))
            .map(|p| &**p)
    }

    /// Whether any parser handles the path
    #[inline]
    #[must_use]
    pub fn supports(&self, path: &str) -> bool {
        self.find_for_path(path).is_some()
    }

    /// Parse with the first matching parser
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::UnsupportedFile`](crate::PatternError::UnsupportedFile)
    /// when no parser matches, or the parser's own error.
    pub fn parse(&self, path: &str, content: &str) -> PatternResult<ParsedSource> {
        self.find_for_path(path)
            .ok_or_else(|| crate::PatternError::UnsupportedFile(path.to_string()))?
            .parse(path, content)
    }

    /// Get all registered extensions
    #[must_use]
    pub fn all_extensions(&self) -> Vec<&str> {
        self.parsers
            .iter()
            .flat_map(|p| p.extensions())
            .copied()
            .collect()
    }
}

/// Create default parser registry with built-in parsers
#[must_use]
pub fn default_parsers() -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    registry.register(JavaParser);
    registry.register(PythonParser);
    registry.register(SqlParser);
    registry.register(TabularParser);
    registry.register(JsonParser);
    registry
}

/// Split content into 1-based numbered lines
pub(crate) fn numbered_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content.lines().enumerate().map(|(i, l)| (i + 1, l))
}

/// Strip surrounding quotes and whitespace
pub(crate) fn unquote(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpperParser;

    impl SourceParser for UpperParser {
        fn language(&self) -> SourceLanguage {
            SourceLanguage::Json
        }

        fn parse(&self, path: &str, _content: &str) -> PatternResult<ParsedSource> {
            let mut parsed = ParsedSource::new(path, SourceLanguage::Json);
            parsed.structure.markers.insert("upper".to_string());
            Ok(parsed)
        }

        fn priority(&self) -> i32 {
            10
        }
    }

    #[test]
    fn parser_can_parse_by_extension() {
        assert!(JavaParser.can_parse(Path::new("src/a/StoreModule.java")));
        assert!(!JavaParser.can_parse(Path::new("src/a/StoreModule.py")));
        assert!(!JavaParser.can_parse(Path::new("Makefile")));
    }

    #[test]
    fn registry_prefers_higher_priority() {
        let mut registry = default_parsers();
        registry.register(UpperParser);

        let parsed = registry.parse("config/module_input.json", "{}").unwrap();
        assert!(parsed.has_marker("upper"));
    }

    #[test]
    fn registry_rejects_unknown_extensions() {
        let registry = default_parsers();
        assert!(registry.supports("a/b.sql"));
        assert!(!registry.supports("README.md"));
        assert!(matches!(
            registry.parse("README.md", ""),
            Err(crate::PatternError::UnsupportedFile(_))
        ));
    }

    #[test]
    fn stem_and_component_projection() {
        let mut parsed = ParsedSource::new("loadapi/store/StoreLoadApi.py", SourceLanguage::Python);
        parsed
            .symbols
            .push(Symbol::new(SymbolKind::Method, "validate_row", 4));
        parsed
            .symbols
            .push(Symbol::new(SymbolKind::Import, "os", 1));
        parsed.structure.package = Some("loadapi.store".to_string());

        assert_eq!(parsed.stem(), "StoreLoadApi");
        let component = parsed.to_component();
        assert_eq!(component.name, "StoreLoadApi");
        assert_eq!(component.members, vec!["validate_row"]);
        assert_eq!(
            component.attributes.get("package").map(String::as_str),
            Some("loadapi.store")
        );
    }

    #[test]
    fn unquote_strips_both_quote_styles() {
        assert_eq!(unquote(" 'store_id' "), "store_id");
        assert_eq!(unquote("\"Store Name\""), "Store Name");
    }
}
