//! Java algorithm repositories: modules, validation modules and Args classes

use super::{
    class_line, commit_registrations, in_dir, insert_after, insert_before, AdaptRequest,
    PatternStrategy, MANUAL_IMPLEMENTATION_NOTE,
};
use crate::parser::{JavaParser, ParsedSource, ParserRegistry, SymbolKind, VALIDATE_MARKER};
use porter_model::{Adaptation, ChangeNote, ComponentKind, Conflict, ConflictType, DomainType};
use std::collections::BTreeSet;

const COMPONENT_IMPORT: &str = "org.springframework.stereotype.Component";
const POST_CONSTRUCT_IMPORT: &str = "javax.annotation.PostConstruct";

/// Base types every module may extend
pub const MODULE_PARENTS: [&str; 2] = ["AbstractModule", "AbstractUtilModuleGroup"];

/// Base type of group modules (the ones that register submodules)
pub const GROUP_PARENT: &str = "AbstractUtilModuleGroup";

/// Base type of validation modules
pub const VALIDATION_PARENT: &str = "AbstractValidationModule";

/// Strategy for Java algorithm repositories
#[derive(Debug)]
pub struct JavaAlgorithmStrategy {
    parsers: ParserRegistry,
}

impl Default for JavaAlgorithmStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaAlgorithmStrategy {
    /// Create strategy
    #[must_use]
    pub fn new() -> Self {
        let mut parsers = ParserRegistry::new();
        parsers.register(JavaParser);
        Self { parsers }
    }

    fn has_import(parsed: &ParsedSource, import: &str) -> bool {
        parsed.has_symbol(SymbolKind::Import, import)
    }

    /// Add `@Component` (and its import) when missing
    fn ensure_component(
        parsed: &ParsedSource,
        content: &str,
        adaptation: &mut Adaptation,
    ) -> String {
        if parsed.has_marker("@Component") {
            return content.to_string();
        }
        let mut adapted = content.to_string();
        let mut class_at = class_line(parsed);

        if !Self::has_import(parsed, COMPONENT_IMPORT) {
            adapted = insert_after(
                &adapted,
                |l| l.trim_start().starts_with("package "),
                &format!("import {COMPONENT_IMPORT};"),
            );
            let has_package = parsed.structure.package.is_some();
            class_at = class_at.map(|l| l + if has_package { 2 } else { 1 });
            adaptation
                .change_notes
                .push(ChangeNote::applied("Added @Component import"));
        }

        if let Some(line) = class_at {
            adapted = insert_before(&adapted, line, "@Component");
            adaptation
                .change_notes
                .push(ChangeNote::applied("Added @Component annotation"));
        }
        adapted
    }

    fn adapt_module(&self, request: &AdaptRequest<'_>) -> Adaptation {
        let parsed = request.parsed;
        let mut adaptation = Adaptation::new(request.path(), ComponentKind::Module, None);
        let content = Self::ensure_component(parsed, request.content, &mut adaptation);
        let name = request.name();

        let mut allowed: BTreeSet<String> =
            MODULE_PARENTS.iter().map(ToString::to_string).collect();
        allowed.extend(
            request
                .target
                .parents(ComponentKind::Module)
                .into_iter()
                .map(|(p, _)| p),
        );

        match parsed.structure.parent.as_deref() {
            Some(parent) if !allowed.contains(parent) => {
                adaptation.change_notes.push(ChangeNote::warning(format!(
                    "{name} extends {parent} - may need inheritance adjustment"
                )));
                adaptation.conflicts.push(Conflict::new(
                    ConflictType::PatternMismatch,
                    self.domain(),
                    request.path(),
                    format!("{name} extends non-standard parent {parent}"),
                ));
            }
            None => adaptation.change_notes.push(ChangeNote::warning(format!(
                "{name} does not extend a module base class"
            ))),
            Some(_) => {}
        }

        let is_group = parsed.structure.parent.as_deref() == Some(GROUP_PARENT);
        let is_new = request.target.get(ComponentKind::Module, name).is_none();
        let registered = request.target.registered_names(ComponentKind::Module);
        if !is_group && is_new && !registered.is_empty() {
            let in_commit = commit_registrations(self, request.commit_files, ComponentKind::Module)
                .any(|r| r == name);
            if !registered.contains(name) && !in_commit {
                let groups: Vec<String> = request
                    .commit_files
                    .iter()
                    .filter(|f| f.structure.parent.as_deref() == Some(GROUP_PARENT))
                    .map(|f| f.path.clone())
                    .collect();
                adaptation.conflicts.push(
                    Conflict::new(
                        ConflictType::MissingRegistration,
                        self.domain(),
                        request.path(),
                        format!("new module {name} is not registered by any group module"),
                    )
                    .with_related_files(groups),
                );
            }
        }

        adaptation.proposed_content = Some(content);
        adaptation
    }

    fn adapt_validation(&self, request: &AdaptRequest<'_>) -> Adaptation {
        let parsed = request.parsed;
        let mut adaptation = Adaptation::new(request.path(), ComponentKind::ValidationUnit, None);
        let content = Self::ensure_component(parsed, request.content, &mut adaptation);

        if !parsed.has_marker(VALIDATE_MARKER) {
            adaptation.change_notes.push(ChangeNote::warning(
                "Missing validate method - needs manual implementation",
            ));
            adaptation.conflicts.push(Conflict::new(
                ConflictType::MissingRequiredMember,
                self.domain(),
                request.path(),
                format!("{} has no public validate method", request.name()),
            ));
        }

        adaptation.proposed_content = Some(content);
        adaptation
    }

    fn adapt_args(request: &AdaptRequest<'_>) -> Adaptation {
        let parsed = request.parsed;
        let mut adaptation = Adaptation::new(request.path(), ComponentKind::ParameterObject, None);
        let mut content = request.content.to_string();

        if parsed.has_marker("@PostConstruct") && !Self::has_import(parsed, POST_CONSTRUCT_IMPORT) {
            content = insert_after(
                &content,
                |l| l.trim_start().starts_with("package "),
                &format!("import {POST_CONSTRUCT_IMPORT};"),
            );
            adaptation
                .change_notes
                .push(ChangeNote::applied("Added @PostConstruct import"));
        }

        adaptation.proposed_content = Some(content);
        adaptation
    }
}

impl PatternStrategy for JavaAlgorithmStrategy {
    fn domain(&self) -> DomainType {
        DomainType::JavaAlgorithm
    }

    fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    fn classify(&self, parsed: &ParsedSource) -> ComponentKind {
        let parent = parsed.structure.parent.as_deref().unwrap_or_default();
        let name = parsed
            .structure
            .primary
            .as_deref()
            .unwrap_or_else(|| parsed.stem());

        if parent == VALIDATION_PARENT || name.ends_with("ValidationModule") {
            ComponentKind::ValidationUnit
        } else if MODULE_PARENTS.contains(&parent) || name.ends_with("Module") {
            ComponentKind::Module
        } else if parent == "Args" || (in_dir(&parsed.path, "args") && name.ends_with("Args")) {
            ComponentKind::ParameterObject
        } else {
            ComponentKind::NoAdaptation
        }
    }

    fn adapt(&self, request: &AdaptRequest<'_>) -> Adaptation {
        match self.classify(request.parsed) {
            ComponentKind::Module => self.adapt_module(request),
            ComponentKind::ValidationUnit => self.adapt_validation(request),
            ComponentKind::ParameterObject => Self::adapt_args(request),
            _ => Adaptation::new(
                request.path(),
                ComponentKind::NoAdaptation,
                Some(request.content.to_string()),
            ),
        }
    }

    fn implementation_notes(&self, adaptations: &[Adaptation]) -> Vec<String> {
        let mut notes = Vec::new();
        let has = |kind| adaptations.iter().any(|a| a.component_kind == kind);

        if has(ComponentKind::Module) {
            notes.push(
                "Register new module in ModuleProvider if creating new group module".to_string(),
            );
        }
        if has(ComponentKind::ValidationUnit) {
            notes.push("Register validation module in ValidationModuleNames".to_string());
            notes.push(
                "Update ValidationModuleNames enum with new validation module name".to_string(),
            );
        }
        if adaptations.iter().any(Adaptation::has_warnings) {
            notes.push(MANUAL_IMPLEMENTATION_NOTE.to_string());
        }
        notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_model::{ComponentPattern, PatternProfile};
    use pretty_assertions::assert_eq;

    fn target_with_group() -> PatternProfile {
        let mut profile = PatternProfile::new(DomainType::JavaAlgorithm, "develop");
        let mut group = ComponentPattern::new("StoreGroupModule", "src/StoreGroupModule.java")
            .with_parent(GROUP_PARENT)
            .with_marker("@Component");
        group.registrations.push("StoreLoadModule".to_string());
        profile.insert(ComponentKind::Module, group);
        profile
    }

    fn adapt(path: &str, content: &str, target: &PatternProfile) -> Adaptation {
        let strategy = JavaAlgorithmStrategy::new();
        let parsed = strategy.parse(path, content).unwrap();
        let files = vec![parsed.clone()];
        strategy.adapt(&AdaptRequest::new(content, &parsed, target, &files))
    }

    #[test]
    fn module_gains_component_annotation_and_import() {
        let content =
            "package com.acme.store;\n\npublic class StoreLoadModule extends AbstractModule {\n}\n";
        let adaptation = adapt("src/StoreLoadModule.java", content, &target_with_group());

        assert_eq!(adaptation.component_kind, ComponentKind::Module);
        assert_eq!(
            adaptation.content(),
            "package com.acme.store;\n\nimport org.springframework.stereotype.Component;\n\n@Component\npublic class StoreLoadModule extends AbstractModule {\n}\n"
        );
        assert_eq!(adaptation.change_notes.len(), 2);
        assert!(adaptation.conflicts.is_empty());
    }

    #[test]
    fn unregistered_new_module_is_a_conflict() {
        let content = "@Component\npublic class PriceModule extends AbstractModule {}\n";
        let adaptation = adapt("src/PriceModule.java", content, &target_with_group());

        assert_eq!(adaptation.conflicts.len(), 1);
        assert_eq!(
            adaptation.conflicts[0].conflict_type,
            ConflictType::MissingRegistration
        );
        assert!(!adaptation.has_warnings());
    }

    #[test]
    fn module_registered_in_same_commit_is_fine() {
        let strategy = JavaAlgorithmStrategy::new();
        let module = "@Component\npublic class PriceModule extends AbstractModule {}\n";
        let group = "@Component\npublic class PriceGroupModule extends AbstractUtilModuleGroup {\n    public PriceGroupModule() {\n        addSubModule(new PriceModule());\n    }\n}\n";
        let files = vec![
            strategy.parse("src/PriceModule.java", module).unwrap(),
            strategy.parse("src/PriceGroupModule.java", group).unwrap(),
        ];
        let target = target_with_group();
        let adaptation = strategy.adapt(&AdaptRequest::new(module, &files[0], &target, &files));
        assert!(adaptation.conflicts.is_empty());
    }

    #[test]
    fn non_standard_parent_is_a_conflict() {
        let content = "@Component\npublic class OddModule extends SomethingElse {}\n";
        let adaptation = adapt(
            "src/OddModule.java",
            content,
            &PatternProfile::new(DomainType::JavaAlgorithm, "t"),
        );

        assert!(adaptation.has_warnings());
        assert_eq!(
            adaptation.conflicts[0].conflict_type,
            ConflictType::PatternMismatch
        );
    }

    #[test]
    fn validation_without_validate_warns() {
        let content =
            "@Component\npublic class StoreValidationModule extends AbstractValidationModule {}\n";
        let adaptation = adapt(
            "src/StoreValidationModule.java",
            content,
            &PatternProfile::new(DomainType::JavaAlgorithm, "t"),
        );
        assert_eq!(adaptation.component_kind, ComponentKind::ValidationUnit);
        assert!(adaptation.has_warnings());
        assert_eq!(
            adaptation.conflicts[0].conflict_type,
            ConflictType::MissingRequiredMember
        );
    }

    #[test]
    fn args_gets_post_construct_import() {
        let content = "package com.acme.args;\n\npublic class StoreArgs extends Args {\n    @PostConstruct\n    public void init() {}\n}\n";
        let adaptation = adapt(
            "src/args/StoreArgs.java",
            content,
            &PatternProfile::new(DomainType::JavaAlgorithm, "t"),
        );

        assert_eq!(adaptation.component_kind, ComponentKind::ParameterObject);
        assert!(adaptation.content_contains("import javax.annotation.PostConstruct;"));
    }

    #[test]
    fn implementation_notes_follow_kinds() {
        let strategy = JavaAlgorithmStrategy::new();
        let mut validation =
            Adaptation::new("V.java", ComponentKind::ValidationUnit, Some(String::new()));
        validation.change_notes.push(ChangeNote::warning("x"));
        let notes = strategy.implementation_notes(&[validation]);
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[2], MANUAL_IMPLEMENTATION_NOTE);
    }
}
