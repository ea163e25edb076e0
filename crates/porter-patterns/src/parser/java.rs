//! Java source parser

use super::{numbered_lines, ParsedSource, SourceLanguage, SourceParser, Symbol, SymbolKind};
use crate::error::PatternResult;
use once_cell::sync::Lazy;
use regex::Regex;

static PACKAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*package\s+([\w.]+)\s*;").expect("PACKAGE should be valid"));

static IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*import\s+(?:static\s+)?([\w.*]+)\s*;").expect("IMPORT should be valid")
});

static ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*@(\w+)(?:\(([^)]*)\))?").expect("ANNOTATION should be valid"));

static CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:class|interface|enum)\s+(\w+)(?:<[^>{]*>)?(?:\s+extends\s+([\w.]+))?")
        .expect("CLASS should be valid")
});

static METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*((?:(?:public|protected|private|static|final|abstract|synchronized)\s+)+)[\w<>\[\],.?\s]*?\b(\w+)\s*\(",
    )
    .expect("METHOD should be valid")
});

static FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*private\s+(?:static\s+)?(?:final\s+)?([\w.]+(?:<[^;=]*>)?(?:\[\])?)\s+(\w+)\s*(?:=[^;]*)?;",
    )
    .expect("FIELD should be valid")
});

static PUBLIC_VALIDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"public\s+void\s+validate\s*\(").expect("PUBLIC_VALIDATE should be valid")
});

static SUB_MODULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"addSubModule\(\s*new\s+(\w+)\s*\(").expect("SUB_MODULE should be valid")
});

/// Marker set when a `public void validate(..)` method is declared
pub const VALIDATE_MARKER: &str = "public-validate";

/// Marker set when any static method is declared
pub const STATIC_MARKER: &str = "static";

/// Marker set when a JavaDoc block is present
pub const JAVADOC_MARKER: &str = "javadoc";

/// Regex-based Java parser
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaParser;

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with('*') || trimmed.starts_with("/*")
}

impl SourceParser for JavaParser {
    fn language(&self) -> SourceLanguage {
        SourceLanguage::Java
    }

    fn parse(&self, path: &str, content: &str) -> PatternResult<ParsedSource> {
        let mut parsed = ParsedSource::new(path, SourceLanguage::Java);
        let mut autowired = 0_usize;
        let mut fields = 0_usize;

        if content.contains("/**") {
            parsed.structure.markers.insert(JAVADOC_MARKER.to_string());
        }

        for (line_no, line) in numbered_lines(content) {
            if is_comment(line) {
                continue;
            }

            if let Some(caps) = PACKAGE.captures(line) {
                parsed.structure.package = Some(caps[1].to_string());
                continue;
            }

            if let Some(caps) = IMPORT.captures(line) {
                parsed
                    .symbols
                    .push(Symbol::new(SymbolKind::Import, &caps[1], line_no));
                continue;
            }

            if let Some(caps) = ANNOTATION.captures(line) {
                let name = &caps[1];
                if name == "Autowired" {
                    autowired += 1;
                }
                parsed.structure.markers.insert(format!("@{name}"));
                let mut symbol = Symbol::new(SymbolKind::Decorator, name, line_no);
                if let Some(arg) = caps.get(2) {
                    symbol = symbol.with_detail(arg.as_str());
                }
                parsed.symbols.push(symbol);
            }

            if let Some(caps) = CLASS.captures(line) {
                let name = caps[1].to_string();
                let parent = caps.get(2).map(|m| m.as_str().to_string());
                if parsed.structure.primary.is_none() {
                    parsed.structure.primary = Some(name.clone());
                    parsed.structure.parent.clone_from(&parent);
                }
                let mut symbol = Symbol::new(SymbolKind::Class, name, line_no);
                if let Some(parent) = parent {
                    symbol = symbol.with_detail(parent);
                }
                parsed.symbols.push(symbol);
                continue;
            }

            if let Some(caps) = FIELD.captures(line) {
                fields += 1;
                parsed
                    .symbols
                    .push(Symbol::new(SymbolKind::Field, &caps[2], line_no).with_detail(&caps[1]));
                continue;
            }

            if let Some(caps) = METHOD.captures(line) {
                let name = &caps[2];
                let is_constructor = parsed.structure.primary.as_deref() == Some(name);
                if !is_constructor {
                    if caps[1].split_whitespace().any(|m| m == "static") {
                        parsed.structure.markers.insert(STATIC_MARKER.to_string());
                    }
                    parsed
                        .symbols
                        .push(Symbol::new(SymbolKind::Method, name, line_no));
                }
            }

            if PUBLIC_VALIDATE.is_match(line) {
                parsed.structure.markers.insert(VALIDATE_MARKER.to_string());
            }

            for caps in SUB_MODULE.captures_iter(line) {
                parsed.structure.registrations.push(caps[1].to_string());
            }
        }

        let attributes = &mut parsed.structure.attributes;
        attributes.insert("autowired".to_string(), autowired.to_string());
        attributes.insert("private_fields".to_string(), fields.to_string());
        Ok(parsed)
    }
}
