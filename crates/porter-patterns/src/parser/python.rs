//! Python source parser

use super::{
    numbered_lines, unquote, ParsedSource, SourceLanguage, SourceParser, Symbol, SymbolKind,
};
use crate::error::PatternResult;
use once_cell::sync::Lazy;
use regex::Regex;

static FROM_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*from\s+([\w.]+)\s+import\s+(.+)$").expect("FROM_IMPORT should be valid")
});

static IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*import\s+([\w., ]+)$").expect("IMPORT should be valid"));

static CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)class\s+(\w+)\s*(?:\(([^)]*)\))?\s*:").expect("CLASS should be valid")
});

static DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)(?:async\s+)?def\s+(\w+)\s*\(").expect("DEF should be valid"));

static DECORATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*@([\w.]+)(?:\((.*)\))?\s*$").expect("DECORATOR should be valid"));

static CONSTANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Z][A-Z0-9_]*)\s*=\s*(.+)$").expect("CONSTANT should be valid")
});

static ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z_]\w*)\s*=").expect("ASSIGNMENT should be valid"));

static MASTER_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"MASTER_HEADER\s*=\s*\[([^\]]*)\]").expect("MASTER_HEADER should be valid")
});

static LOADER_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\w+LoadApi)\b").expect("LOADER_REF should be valid"));

static IMPORT_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"['"]([^'"]*import_[^'"]*)['"]"#).expect("IMPORT_ID should be valid")
});

/// Marker set when `MASTER_HEADER` is declared
pub const MASTER_HEADER_MARKER: &str = "MASTER_HEADER";

/// Marker set when errors are reported through `self._add_errors`
pub const ADD_ERRORS_MARKER: &str = "self._add_errors";

/// Regex-based Python parser
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonParser;

fn module_path(path: &str) -> Option<String> {
    let (dir, _) = path.rsplit_once('/')?;
    Some(dir.replace('/', "."))
}

impl SourceParser for PythonParser {
    fn language(&self) -> SourceLanguage {
        SourceLanguage::Python
    }

    fn parse(&self, path: &str, content: &str) -> PatternResult<ParsedSource> {
        let mut parsed = ParsedSource::new(path, SourceLanguage::Python);
        parsed.structure.package = module_path(path);

        let mut in_class = false;
        let mut constants = 0_usize;
        let mut lowercase_assignments = 0_usize;
        let mut routes = 0_usize;

        for (line_no, line) in numbered_lines(content) {
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') || trimmed.is_empty() {
                continue;
            }
            let top_level = trimmed.len() == line.len();
            if top_level && !trimmed.starts_with("class ") && !trimmed.starts_with('@') {
                in_class = false;
            }

            if let Some(caps) = FROM_IMPORT.captures(line) {
                parsed.symbols.push(
                    Symbol::new(SymbolKind::Import, &caps[1], line_no).with_detail(caps[2].trim()),
                );
                if path.ends_with("__init__.py") {
                    parsed.structure.registrations.extend(
                        caps[2]
                            .trim_matches(|c| c == '(' || c == ')')
                            .split(',')
                            .map(str::trim)
                            .filter(|n| !n.is_empty())
                            .map(ToString::to_string),
                    );
                }
                continue;
            }

            if let Some(caps) = IMPORT.captures(line) {
                for module in caps[1].split(',').map(str::trim).filter(|m| !m.is_empty()) {
                    parsed
                        .symbols
                        .push(Symbol::new(SymbolKind::Import, module, line_no));
                }
                continue;
            }

            if let Some(caps) = DECORATOR.captures(line) {
                let name = &caps[1];
                if name.ends_with("route") {
                    routes += 1;
                }
                parsed.structure.markers.insert(format!("@{name}"));
                let mut symbol = Symbol::new(SymbolKind::Decorator, name, line_no);
                if let Some(arg) = caps.get(2) {
                    symbol = symbol.with_detail(unquote(arg.as_str()));
                }
                parsed.symbols.push(symbol);
                continue;
            }

            if let Some(caps) = CLASS.captures(line) {
                in_class = true;
                let name = caps[2].to_string();
                let parent = caps
                    .get(3)
                    .and_then(|m| m.as_str().split(',').next())
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(ToString::to_string);
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

            if let Some(caps) = DEF.captures(line) {
                let kind = if in_class && !caps[1].is_empty() {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                parsed.symbols.push(Symbol::new(kind, &caps[2], line_no));
                continue;
            }

            if let Some(caps) = CONSTANT.captures(line) {
                constants += 1;
                parsed.symbols.push(
                    Symbol::new(SymbolKind::Constant, &caps[1], line_no)
                        .with_detail(caps[2].trim()),
                );
            } else if top_level && ASSIGNMENT.is_match(line) {
                lowercase_assignments += 1;
            }

            let ids = IMPORT_ID.captures_iter(line).map(|c| c[1].to_string());
            let loaders = LOADER_REF.captures_iter(line).map(|c| c[1].to_string());
            for name in ids.chain(loaders) {
                if !parsed.structure.registrations.contains(&name) {
                    parsed.structure.registrations.push(name);
                }
            }
        }

        if let Some(caps) = MASTER_HEADER.captures(content) {
            parsed
                .structure
                .markers
                .insert(MASTER_HEADER_MARKER.to_string());
            parsed.structure.header = caps[1]
                .split(',')
                .map(unquote)
                .filter(|h| !h.is_empty())
                .collect();
        }
        if content.contains(ADD_ERRORS_MARKER) {
            parsed
                .structure
                .markers
                .insert(ADD_ERRORS_MARKER.to_string());
        }

        let attributes = &mut parsed.structure.attributes;
        attributes.insert("constants".to_string(), constants.to_string());
        attributes.insert(
            "lowercase_assignments".to_string(),
            lowercase_assignments.to_string(),
        );
        attributes.insert("routes".to_string(), routes.to_string());
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LOAD_API: &str = r#"from loadapi.base import LoadApi
import logging

class StoreLoadApi(LoadApi):
    MASTER_HEADER = [
        "store_id",
        "store_name",
        'region',
    ]

    def validate_row(self, row):
        if not row:
            self._add_errors("empty row")

    def _get_normalized_data(self, rows):
        return rows

def helper():
    return None
"#;

    #[test]
    fn extracts_loader_structure() {
        let parsed = PythonParser
            .parse("loadapi/store/StoreLoadApi.py", LOAD_API)
            .unwrap();
        let s = &parsed.structure;

        assert_eq!(s.primary.as_deref(), Some("StoreLoadApi"));
        assert_eq!(s.parent.as_deref(), Some("LoadApi"));
        assert_eq!(s.package.as_deref(), Some("loadapi.store"));
        assert_eq!(s.header, vec!["store_id", "store_name", "region"]);
        assert!(parsed.has_marker(MASTER_HEADER_MARKER));
        assert!(parsed.has_marker(ADD_ERRORS_MARKER));
        assert_eq!(
            parsed.names(SymbolKind::Method),
            vec!["validate_row", "_get_normalized_data"]
        );
        assert_eq!(parsed.names(SymbolKind::Function), vec!["helper"]);
    }

    #[test]
    fn provider_registrations() {
        let provider = "from loadapi.store import StoreLoadApi\n\nPROVIDERS = {\n    \"import_store\": StoreLoadApi,\n    \"import_region\": RegionLoadApi,\n}\n";
        let parsed = PythonParser
            .parse("loadapi/loadapi_provider.py", provider)
            .unwrap();
        assert_eq!(
            parsed.structure.registrations,
            vec![
                "import_store",
                "StoreLoadApi",
                "import_region",
                "RegionLoadApi"
            ]
        );
    }

    #[test]
    fn init_imports_register_names() {
        let init = "from .store import StoreLoadApi, RegionLoadApi\n";
        let parsed = PythonParser.parse("loadapi/__init__.py", init).unwrap();
        assert_eq!(
            parsed.structure.registrations,
            vec!["StoreLoadApi", "RegionLoadApi"]
        );
    }

    #[test]
    fn routes_decorators_and_constants() {
        let source = "MAX_WEEKS = 52\nlookback = 4\n\n@app.route('/forecast')\ndef forecast():\n    return {}\n\nclass Helpers:\n    @staticmethod\n    def clamp(x):\n        return x\n";
        let parsed = PythonParser
            .parse("mfp/routes/forecast.py", source)
            .unwrap();

        assert_eq!(parsed.count("routes"), 1);
        assert_eq!(parsed.count("constants"), 1);
        assert_eq!(parsed.count("lowercase_assignments"), 1);
        assert!(parsed.has_marker("@app.route"));
        assert!(parsed.has_marker("@staticmethod"));
        let route = parsed.symbols_of(SymbolKind::Decorator).next().unwrap();
        assert_eq!(route.detail.as_deref(), Some("/forecast"));
        assert_eq!(parsed.names(SymbolKind::Function), vec!["forecast"]);
        assert_eq!(parsed.names(SymbolKind::Method), vec!["clamp"]);
    }
}
