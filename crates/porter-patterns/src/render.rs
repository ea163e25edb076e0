//! Markdown rendering of pattern profiles

use porter_model::{ComponentKind, PatternProfile};
use std::fmt::Write;

/// Markers reported as adoption ratios when present for a kind
const TRACKED_MARKERS: [(ComponentKind, &str); 5] = [
    (ComponentKind::Module, "@Component"),
    (ComponentKind::ValidationUnit, "@Component"),
    (ComponentKind::DataLoader, "MASTER_HEADER"),
    (ComponentKind::QueryView, "OPENROWSET"),
    (ComponentKind::QueryView, "WITH"),
];

/// Render a profile as a markdown document
#[must_use]
pub fn render_profile(title: &str, profile: &PatternProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {title}\n");
    let _ = writeln!(out, "- **Revision**: {}", profile.revision);
    let _ = writeln!(out, "- **Domain**: {}", profile.domain);
    let _ = writeln!(out, "- **Files scanned**: {}", profile.files_scanned);
    let _ = writeln!(out, "- **Components**: {}\n", profile.len());

    if profile.is_empty() {
        out.push_str("_No recognised components._\n");
        return out;
    }

    for kind in profile.kinds() {
        let _ = writeln!(out, "## {} ({})\n", kind.label(), profile.count(kind));

        for (tracked, marker) in TRACKED_MARKERS {
            if tracked == kind {
                if let Some(ratio) = profile.marker_ratio(kind, marker) {
                    let _ = writeln!(out, "- `{marker}` adoption: {:.0}%", ratio * 100.0);
                }
            }
        }
        let parents = profile.parents(kind);
        if !parents.is_empty() {
            let listed: Vec<String> = parents.iter().map(|(p, c)| format!("{p} ({c})")).collect();
            let _ = writeln!(out, "- Base types: {}", listed.join(", "));
        }
        out.push('\n');

        for entry in profile.entries(kind) {
            let _ = writeln!(out, "### {}\n", entry.name);
            let _ = writeln!(out, "- Path: `{}`", entry.path);
            if let Some(parent) = &entry.parent {
                let _ = writeln!(out, "- Extends: `{parent}`");
            }
            if !entry.markers.is_empty() {
                let markers: Vec<&str> = entry.markers.iter().map(String::as_str).collect();
                let _ = writeln!(out, "- Markers: {}", markers.join(", "));
            }
            if !entry.members.is_empty() {
                let _ = writeln!(out, "- Members: {}", entry.members.join(", "));
            }
            if !entry.header.is_empty() {
                let _ = writeln!(out, "- Header: {}", entry.header.join(" | "));
            }
            if !entry.registrations.is_empty() {
                let _ = writeln!(out, "- Registers: {}", entry.registrations.join(", "));
            }
            out.push('\n');
        }
    }
    out
}
