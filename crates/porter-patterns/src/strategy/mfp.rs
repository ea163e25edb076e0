//! Python MFP repositories: services, routes, utilities and constants

use super::{in_dir, AdaptRequest, PatternStrategy};
use crate::parser::{ParsedSource, ParserRegistry, PythonParser, SymbolKind};
use porter_model::{Adaptation, ChangeNote, ComponentKind, DomainType};

const DATA_ACCESS_HINTS: [&str; 4] = ["database", "mysql", "synapse", "sqlalchemy"];

/// Strategy for Python MFP repositories
#[derive(Debug)]
pub struct MfpStrategy {
    parsers: ParserRegistry,
}

impl Default for MfpStrategy {
    fn default() -> Self {
        Self::new()
    }
}

fn callables(parsed: &ParsedSource) -> usize {
    parsed.symbols_of(SymbolKind::Method).count() + parsed.symbols_of(SymbolKind::Function).count()
}

impl MfpStrategy {
    /// Create strategy
    #[must_use]
    pub fn new() -> Self {
        let mut parsers = ParserRegistry::new();
        parsers.register(PythonParser);
        Self { parsers }
    }

    fn service_notes(parsed: &ParsedSource, notes: &mut Vec<ChangeNote>) {
        if parsed.structure.primary.is_none() {
            notes.push(ChangeNote::warning("File should contain a service class"));
        }
        let defs = callables(parsed);
        if defs == 0 {
            notes.push(ChangeNote::warning("Service class should have methods"));
        }
        let data_access = parsed.symbols_of(SymbolKind::Import).any(|s| {
            let import = s.name.to_ascii_lowercase();
            DATA_ACCESS_HINTS.iter().any(|h| import.contains(h))
        });
        if defs > 0 && !data_access {
            notes.push(ChangeNote::note(
                "Verify database integration patterns if data access is needed",
            ));
        }
    }

    fn route_notes(parsed: &ParsedSource, notes: &mut Vec<ChangeNote>) {
        let routes = parsed.count("routes");
        if routes == 0 {
            notes.push(ChangeNote::note(
                "Verify route decorator patterns (@app.route or @route)",
            ));
        }
        if callables(parsed) < routes {
            notes.push(ChangeNote::warning(
                "Some routes may be missing handler methods",
            ));
        }
    }

    fn utility_notes(parsed: &ParsedSource, notes: &mut Vec<ChangeNote>) {
        if callables(parsed) == 0 {
            notes.push(ChangeNote::warning(
                "Utils file should contain utility functions",
            ));
        } else if !parsed.has_marker("@staticmethod") && !parsed.has_marker("@classmethod") {
            notes.push(ChangeNote::note(
                "Consider using @staticmethod for pure utility functions",
            ));
        }
    }

    fn constants_notes(parsed: &ParsedSource, notes: &mut Vec<ChangeNote>) {
        if parsed.count("lowercase_assignments") > 0 {
            notes.push(ChangeNote::note(
                "Constants should follow ALL_CAPS naming convention",
            ));
        }
    }
}

impl PatternStrategy for MfpStrategy {
    fn domain(&self) -> DomainType {
        DomainType::PythonMfp
    }

    fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    fn classify(&self, parsed: &ParsedSource) -> ComponentKind {
        let path = parsed.path.as_str();
        if in_dir(path, "service") || in_dir(path, "services") {
            ComponentKind::Service
        } else if in_dir(path, "routes") {
            ComponentKind::Route
        } else if in_dir(path, "utils") {
            ComponentKind::Utility
        } else if in_dir(path, "constants") {
            ComponentKind::Constants
        } else {
            ComponentKind::NoAdaptation
        }
    }

    fn adapt(&self, request: &AdaptRequest<'_>) -> Adaptation {
        let kind = self.classify(request.parsed);
        let mut adaptation =
            Adaptation::new(request.path(), kind, Some(request.content.to_string()));
        let notes = &mut adaptation.change_notes;
        match kind {
            ComponentKind::Service => Self::service_notes(request.parsed, notes),
            ComponentKind::Route => Self::route_notes(request.parsed, notes),
            ComponentKind::Utility => Self::utility_notes(request.parsed, notes),
            ComponentKind::Constants => Self::constants_notes(request.parsed, notes),
            _ => {}
        }
        adaptation
    }

    fn implementation_notes(&self, adaptations: &[Adaptation]) -> Vec<String> {
        let mut notes: Vec<String> = Vec::new();
        let has = |kind| adaptations.iter().any(|a| a.component_kind == kind);

        if has(ComponentKind::Service) {
            notes.push("Verify database connection patterns match target environment".into());
            notes.push("Ensure forecasting algorithms maintain accuracy".into());
            notes.push("Check service method signatures and return types".into());
        }
        if has(ComponentKind::Route) {
            notes.push("Verify Flask route decorators follow target patterns".into());
            notes.push("Check API endpoint URLs and HTTP methods".into());
            notes.push("Ensure proper error handling in route handlers".into());
        }
        if has(ComponentKind::Utility) {
            notes.push("Verify utility functions are properly tested".into());
            notes.push("Check for @staticmethod usage where appropriate".into());
        }
        if adaptations.iter().any(Adaptation::has_warnings) {
            notes.push("Manual verification required for pattern compliance".into());
        }
        notes
    }
}
