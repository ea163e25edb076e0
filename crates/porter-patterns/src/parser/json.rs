//! JSON configuration parser

use super::{ParsedSource, SourceLanguage, SourceParser, Symbol, SymbolKind};
use crate::error::PatternResult;
use serde_json::Value;

/// Marker set when the document is a JSON object
pub const OBJECT_MARKER: &str = "json-object";

/// Marker set when the document failed to parse
pub const INVALID_MARKER: &str = "json-invalid";

/// JSON parser via `serde_json`
///
/// Invalid documents are not an error: the problem lands in the diagnostics
/// so the adaptation can report it against the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl SourceParser for JsonParser {
    fn language(&self) -> SourceLanguage {
        SourceLanguage::Json
    }

    fn parse(&self, path: &str, content: &str) -> PatternResult<ParsedSource> {
        let mut parsed = ParsedSource::new(path, SourceLanguage::Json);

        let value: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(e) => {
                parsed.structure.markers.insert(INVALID_MARKER.to_string());
                parsed.structure.diagnostics.push(e.to_string());
                return Ok(parsed);
            }
        };

        parsed
            .structure
            .attributes
            .insert("root".to_string(), value_kind(&value).to_string());

        if let Value::Object(map) = &value {
            parsed.structure.markers.insert(OBJECT_MARKER.to_string());
            for (key, entry) in map {
                parsed.symbols.push(
                    Symbol::new(SymbolKind::Key, key.clone(), 0).with_detail(value_kind(entry)),
                );
                parsed.structure.registrations.push(key.clone());
            }
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_become_registrations() {
        let parsed = JsonParser
            .parse(
                "config/module_input.json",
                r#"{"store": {"path": "a"}, "region": "b"}"#,
            )
            .unwrap();
        assert!(parsed.has_marker(OBJECT_MARKER));
        assert_eq!(parsed.structure.registrations, vec!["region", "store"]);
        assert_eq!(
            parsed.structure.attributes.get("root").map(String::as_str),
            Some("object")
        );
    }

    #[test]
    fn arrays_are_not_objects() {
        let parsed = JsonParser
            .parse("config/upload-files.json", "[1, 2]")
            .unwrap();
        assert!(!parsed.has_marker(OBJECT_MARKER));
        assert_eq!(
            parsed.structure.attributes.get("root").map(String::as_str),
            Some("array")
        );
    }

    #[test]
    fn invalid_json_is_a_diagnostic() {
        let parsed = JsonParser
            .parse("config/module_output.json", "{ not json")
            .unwrap();
        assert!(parsed.has_marker(INVALID_MARKER));
        assert_eq!(parsed.structure.diagnostics.len(), 1);
    }
}
