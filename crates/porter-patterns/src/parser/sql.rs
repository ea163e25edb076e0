//! SQL query parser

use super::{numbered_lines, ParsedSource, SourceLanguage, SourceParser, Symbol, SymbolKind};
use crate::error::PatternResult;
use once_cell::sync::Lazy;
use regex::Regex;

static CREATE_VIEW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCREATE\s+(?:OR\s+ALTER\s+)?VIEW\s+([\w.\[\]]+)")
        .expect("CREATE_VIEW should be valid")
});

static WITH_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bWITH\s*\(").expect("WITH_OPEN should be valid"));

static TEMPLATE_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("TEMPLATE_VAR should be valid"));

static SELECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bSELECT\b").expect("SELECT should be valid"));

/// Marker set when the query reads through `OPENROWSET`
pub const OPENROWSET_MARKER: &str = "OPENROWSET";

/// Marker set when a `WITH (...)` column list is declared
pub const WITH_MARKER: &str = "WITH";

/// Marker set when the file contains a `SELECT`
pub const SELECT_MARKER: &str = "SELECT";

/// Regex-based SQL parser
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlParser;

/// Content between the parenthesis at `open` and its balanced close
fn balanced(content: &str, open: usize) -> Option<&str> {
    let mut depth = 0_usize;
    for (offset, ch) in content[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&content[open + 1..open + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas outside parentheses
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;
    for (i, ch) in list.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

fn column_name(definition: &str) -> Option<String> {
    let first = definition.split_whitespace().next()?;
    let name = first.trim_matches(|c| matches!(c, '[' | ']' | '"' | '`'));
    (!name.is_empty()).then(|| name.to_string())
}

fn line_of(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

impl SourceParser for SqlParser {
    fn language(&self) -> SourceLanguage {
        SourceLanguage::Sql
    }

    fn parse(&self, path: &str, content: &str) -> PatternResult<ParsedSource> {
        let mut parsed = ParsedSource::new(path, SourceLanguage::Sql);

        for (line_no, line) in numbered_lines(content) {
            if let Some(caps) = CREATE_VIEW.captures(line) {
                let qualified = &caps[1];
                let name = qualified
                    .rsplit('.')
                    .next()
                    .unwrap_or(qualified)
                    .trim_matches(|c| c == '[' || c == ']')
                    .to_string();
                if parsed.structure.primary.is_none() {
                    parsed.structure.primary = Some(name.clone());
                }
                parsed
                    .symbols
                    .push(Symbol::new(SymbolKind::View, name, line_no));
            }
        }

        if content.to_ascii_uppercase().contains(OPENROWSET_MARKER) {
            parsed
                .structure
                .markers
                .insert(OPENROWSET_MARKER.to_string());
        }
        if SELECT.is_match(content) {
            parsed.structure.markers.insert(SELECT_MARKER.to_string());
        }

        if let Some(m) = WITH_OPEN.find(content) {
            parsed.structure.markers.insert(WITH_MARKER.to_string());
            let open = m.end() - 1;
            match balanced(content, open) {
                Some(list) => {
                    let line = line_of(content, open);
                    for definition in split_top_level(list) {
                        if let Some(column) = column_name(definition) {
                            let detail = definition.trim().to_string();
                            parsed.symbols.push(
                                Symbol::new(SymbolKind::Column, column.clone(), line)
                                    .with_detail(detail),
                            );
                            parsed.structure.header.push(column);
                        }
                    }
                }
                None => parsed
                    .structure
                    .diagnostics
                    .push("unbalanced WITH column list".to_string()),
            }
        }

        let mut variables = Vec::new();
        for caps in TEMPLATE_VAR.captures_iter(content) {
            let var = caps[1].to_string();
            if !variables.contains(&var) {
                parsed.structure.markers.insert(format!("{{{{{var}}}}}"));
                variables.push(var);
            }
        }
        parsed
            .structure
            .attributes
            .insert("variables".to_string(), variables.join(","));
        Ok(parsed)
    }
}
