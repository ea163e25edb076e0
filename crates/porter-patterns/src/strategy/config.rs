//! SQL/config repositories: views, export queries, templates and JSON entries

use super::{in_dir, AdaptRequest, PatternStrategy};
use crate::parser::{
    JsonParser, ParsedSource, ParserRegistry, SourceLanguage, SqlParser, TabularParser,
    INVALID_MARKER, OBJECT_MARKER, OPENROWSET_MARKER, TAB_DELIMITED_MARKER, WITH_MARKER,
};
use porter_model::{Adaptation, ChangeNote, ComponentKind, Conflict, ConflictType, DomainType};

/// Config files that must hold a JSON object
pub const OBJECT_CONFIGS: [&str; 3] = ["module_input", "module_output", "upload-files"];

/// Strategy for SQL/config repositories
#[derive(Debug)]
pub struct ConfigStrategy {
    parsers: ParserRegistry,
}

impl Default for ConfigStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStrategy {
    /// Create strategy
    #[must_use]
    pub fn new() -> Self {
        let mut parsers = ParserRegistry::new();
        parsers.register(SqlParser);
        parsers.register(TabularParser);
        parsers.register(JsonParser);
        Self { parsers }
    }

    fn adapt_query(request: &AdaptRequest<'_>) -> Adaptation {
        let parsed = request.parsed;
        let mut adaptation = Adaptation::new(
            request.path(),
            ComponentKind::QueryView,
            Some(request.content.to_string()),
        );
        let notes = &mut adaptation.change_notes;

        if !parsed.has_marker(OPENROWSET_MARKER) {
            notes.push(ChangeNote::warning(
                "Not using OPENROWSET - verify if this is correct",
            ));
        }
        if !parsed.has_marker(WITH_MARKER) {
            notes.push(ChangeNote::warning(
                "Missing WITH clause - needs column definitions",
            ));
        }
        let stem = parsed.stem();
        let templated = parsed.structure.markers.iter().any(|m| m.starts_with("{{"));
        if (stem.contains("child") || stem.contains("parent")) && !templated {
            notes.push(ChangeNote::note(
                "Consider using {{child}}/{{parent}} variables for dynamic queries",
            ));
        }
        for diagnostic in &parsed.structure.diagnostics {
            notes.push(ChangeNote::warning(diagnostic.clone()));
        }
        adaptation
    }

    fn adapt_template(&self, request: &AdaptRequest<'_>) -> Adaptation {
        let parsed = request.parsed;
        let mut adaptation = Adaptation::new(
            request.path(),
            ComponentKind::Template,
            Some(request.content.to_string()),
        );
        let rows = parsed.count("rows");

        if rows == 0 {
            adaptation.change_notes.push(ChangeNote::warning(
                "Template file has insufficient data rows",
            ));
        }
        if !parsed.has_marker(TAB_DELIMITED_MARKER) {
            adaptation.change_notes.push(ChangeNote::warning(
                "Template headers may not be properly tab-delimited",
            ));
        }
        if rows < 2 {
            adaptation
                .change_notes
                .push(ChangeNote::note("Consider adding more sample data rows"));
        }

        if let Some(existing) = request.target.get(ComponentKind::Template, parsed.stem()) {
            let header = &parsed.structure.header;
            if !existing.header.is_empty() && &existing.header != header {
                let missing: Vec<&str> = existing
                    .header
                    .iter()
                    .filter(|h| !header.contains(h))
                    .map(String::as_str)
                    .collect();
                let added: Vec<&str> = header
                    .iter()
                    .filter(|h| !existing.header.contains(h))
                    .map(String::as_str)
                    .collect();
                adaptation.conflicts.push(Conflict::new(
                    ConflictType::HeaderMismatch,
                    self.domain(),
                    request.path(),
                    format!(
                        "template header diverges from target {} (missing: [{}], added: [{}])",
                        existing.path,
                        missing.join(", "),
                        added.join(", ")
                    ),
                ));
            }
        }
        adaptation
    }

    fn adapt_json(&self, request: &AdaptRequest<'_>) -> Adaptation {
        let parsed = request.parsed;
        let mut adaptation = Adaptation::new(
            request.path(),
            ComponentKind::ConfigEntry,
            Some(request.content.to_string()),
        );

        if parsed.has_marker(INVALID_MARKER) {
            let detail = parsed
                .structure
                .diagnostics
                .first()
                .map_or("unknown error", String::as_str);
            adaptation
                .change_notes
                .push(ChangeNote::error(format!("Invalid JSON format - {detail}")));
            adaptation.conflicts.push(
                Conflict::new(
                    ConflictType::InvalidStructure,
                    self.domain(),
                    request.path(),
                    format!("configuration file is not valid JSON: {detail}"),
                )
                .critical(),
            );
            return adaptation;
        }

        let stem = parsed.stem();
        if OBJECT_CONFIGS.contains(&stem) && !parsed.has_marker(OBJECT_MARKER) {
            let text = if stem == "upload-files" {
                "Upload files config should be a JSON object"
            } else {
                "Configuration file should be a JSON object"
            };
            adaptation.change_notes.push(ChangeNote::warning(text));
        }
        adaptation
    }
}

impl PatternStrategy for ConfigStrategy {
    fn domain(&self) -> DomainType {
        DomainType::SqlConfig
    }

    fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    fn classify(&self, parsed: &ParsedSource) -> ComponentKind {
        match parsed.language {
            SourceLanguage::Sql => ComponentKind::QueryView,
            SourceLanguage::Tsv => ComponentKind::Template,
            SourceLanguage::Json => ComponentKind::ConfigEntry,
            SourceLanguage::Java | SourceLanguage::Python => ComponentKind::NoAdaptation,
        }
    }

    fn adapt(&self, request: &AdaptRequest<'_>) -> Adaptation {
        match self.classify(request.parsed) {
            ComponentKind::QueryView => Self::adapt_query(request),
            ComponentKind::Template => self.adapt_template(request),
            ComponentKind::ConfigEntry => self.adapt_json(request),
            _ => Adaptation::new(
                request.path(),
                ComponentKind::NoAdaptation,
                Some(request.content.to_string()),
            ),
        }
    }

    fn implementation_notes(&self, adaptations: &[Adaptation]) -> Vec<String> {
        let mut notes: Vec<String> = Vec::new();
        let has = |kind| adaptations.iter().any(|a| a.component_kind == kind);

        if has(ComponentKind::QueryView) {
            notes.push("Ensure WITH clause column definitions match template headers".into());
            notes.push("Check variable substitution ({{child}}/{{parent}}) if applicable".into());
            if adaptations.iter().any(|a| in_dir(&a.file_path, "export")) {
                notes.push("Verify export query column order against downstream consumers".into());
            }
        }
        if has(ComponentKind::Template) {
            notes.push(
                "Ensure template headers match LoadAPI MASTER_HEADER and SQL view columns".into(),
            );
            notes.push("Add appropriate sample data for new columns".into());
            notes.push("Maintain tab-delimited format".into());
        }
        if has(ComponentKind::ConfigEntry) {
            notes.push("Update configuration entries when adding new inputs/outputs".into());
            notes.push("Verify import ID mappings in upload-files.json".into());
            notes.push("Ensure consistency with LoadAPI and algorithm configurations".into());
        }
        if adaptations.iter().any(Adaptation::has_warnings) {
            notes.push("Manual verification required for pattern compliance".into());
        }
        notes
    }
}
