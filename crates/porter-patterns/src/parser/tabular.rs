//! Tab-separated template parser

use super::{ParsedSource, SourceLanguage, SourceParser, Symbol, SymbolKind};
use crate::error::PatternResult;

/// Marker set when the header line splits on tabs into several columns
pub const TAB_DELIMITED_MARKER: &str = "tab-delimited";

/// Header-plus-rows TSV parser
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularParser;

impl SourceParser for TabularParser {
    fn language(&self) -> SourceLanguage {
        SourceLanguage::Tsv
    }

    fn parse(&self, path: &str, content: &str) -> PatternResult<ParsedSource> {
        let mut parsed = ParsedSource::new(path, SourceLanguage::Tsv);
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());

        let Some((header_idx, header_line)) = lines.next() else {
            parsed
                .structure
                .diagnostics
                .push("empty template".to_string());
            parsed
                .structure
                .attributes
                .insert("rows".to_string(), "0".to_string());
            return Ok(parsed);
        };

        let header: Vec<String> = header_line
            .split('\t')
            .map(|h| h.trim().to_string())
            .collect();
        if header.len() > 1 {
            parsed
                .structure
                .markers
                .insert(TAB_DELIMITED_MARKER.to_string());
        }
        for column in &header {
            parsed.symbols.push(Symbol::new(
                SymbolKind::Column,
                column.clone(),
                header_idx + 1,
            ));
        }

        let mut rows = 0_usize;
        for (idx, line) in lines {
            rows += 1;
            let width = line.split('\t').count();
            if width != header.len() {
                parsed.structure.diagnostics.push(format!(
                    "line {} has {width} columns, header has {}",
                    idx + 1,
                    header.len()
                ));
            }
        }

        parsed.structure.header = header;
        parsed
            .structure
            .attributes
            .insert("rows".to_string(), rows.to_string());
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_rows() {
        let content = "store_id\tstore_name\tregion\n1\tDowntown\tEast\n2\tMall\tWest\n";
        let parsed = TabularParser.parse("template/stores.tsv", content).unwrap();

        assert_eq!(
            parsed.structure.header,
            vec!["store_id", "store_name", "region"]
        );
        assert_eq!(parsed.count("rows"), 2);
        assert!(parsed.has_marker(TAB_DELIMITED_MARKER));
        assert!(parsed.structure.diagnostics.is_empty());
    }

    #[test]
    fn ragged_rows_are_diagnosed() {
        let content = "a\tb\n1\n";
        let parsed = TabularParser.parse("template/x.tsv", content).unwrap();
        assert_eq!(
            parsed.structure.diagnostics,
            vec!["line 2 has 1 columns, header has 2"]
        );
    }

    #[test]
    fn comma_header_is_not_tab_delimited() {
        let parsed = TabularParser.parse("template/x.tsv", "a,b,c\n").unwrap();
        assert!(!parsed.has_marker(TAB_DELIMITED_MARKER));
        assert_eq!(parsed.count("rows"), 0);
    }

    #[test]
    fn empty_template() {
        let parsed = TabularParser.parse("template/x.tsv", "\n\n").unwrap();
        assert!(parsed.structure.header.is_empty());
        assert_eq!(parsed.structure.diagnostics, vec!["empty template"]);
    }
}
