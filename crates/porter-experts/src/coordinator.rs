//! Expert Coordinator
//!
//! Selects experts for each conflict, collects their opinions and
//! synthesizes exactly one [`Resolution`]. Synthesis orders opinions by
//! confidence (descending) then expert name, so the result never depends on
//! consultation order.

use crate::error::ExpertError;
use crate::expert::{Expert, ExpertKind};
use dashmap::DashMap;
use indexmap::IndexSet;
use parking_lot::RwLock;
use porter_model::{
    Conflict, ConflictScope, ConflictType, DomainType, ExpertOpinion, Resolution, Severity,
};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Opinions above this confidence take part in consensus
pub const HIGH_CONFIDENCE: f64 = 0.7;

/// Rationale attached to consensus resolutions
pub const CONSENSUS_RATIONALE: &str = "Synthesized from multiple expert recommendations";

/// One resolved conflict
#[derive(Debug, Clone, Serialize)]
pub struct ConflictRecord {
    /// The conflict
    pub conflict: Conflict,
    /// Experts consulted, in selection order
    pub experts: Vec<String>,
    /// Their opinions, in synthesis order
    pub opinions: Vec<ExpertOpinion>,
    /// Final resolution
    pub resolution: Resolution,
}

/// Aggregate view of resolved conflicts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConflictReport {
    /// Conflicts seen
    pub total_conflicts: usize,
    /// Conflicts resolved without manual intervention
    pub resolved_conflicts: usize,
    /// Consultations per expert name
    pub expert_usage: BTreeMap<String, usize>,
    /// Conflicts per type
    pub common_types: BTreeMap<ConflictType, usize>,
    /// Suggested knowledge improvements
    pub recommendations: Vec<String>,
}

/// Domain guidance drawn from the primary expert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainGuidance {
    /// Domain asked about
    pub domain: DomainType,
    /// Expert providing the guidance
    pub expert: String,
    /// Up to three pattern items
    pub patterns: Vec<String>,
    /// Up to three rule passages
    pub rules: Vec<String>,
    /// Up to three known conflicts
    pub common_issues: Vec<String>,
}

/// Summary line per loaded expert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpertSummary {
    /// Display name
    pub name: String,
    /// Expert key
    pub kind: ExpertKind,
    /// Language family
    pub family: String,
    /// Pattern items known
    pub pattern_count: usize,
    /// Rule passages known
    pub rule_count: usize,
    /// Loaded from defaults
    pub fallback: bool,
}

/// Exportable knowledge snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeSummary {
    /// Loaded experts
    pub experts: Vec<ExpertSummary>,
    /// Conflicts handled so far
    pub conflicts: usize,
    /// Resolutions that did not require manual work
    pub resolutions: usize,
}

/// General principles attached to every guidance request
pub const GENERAL_PRINCIPLES: [&str; 5] = [
    "Always analyze existing patterns before implementing changes",
    "Follow established conventions in the target repository",
    "Maintain consistency across similar components",
    "Document deviations from patterns with clear rationale",
    "Validate changes against applicable rules before committing",
];

/// Coordinates the expert panel
#[derive(Debug)]
pub struct ExpertCoordinator {
    experts: BTreeMap<ExpertKind, Expert>,
    history: RwLock<Vec<ConflictRecord>>,
    usage: DashMap<String, usize>,
}

impl Default for ExpertCoordinator {
    fn default() -> Self {
        Self::with_fallbacks()
    }
}

/// Opinions in synthesis order
fn ranked(mut opinions: Vec<ExpertOpinion>) -> Vec<ExpertOpinion> {
    opinions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.expert_name.cmp(&b.expert_name))
            .then_with(|| a.recommendation.cmp(&b.recommendation))
            .then_with(|| a.rationale.cmp(&b.rationale))
    });
    opinions
}

/// Words of the first recommendation present in all of them, first occurrence only
fn common_words(recommendations: &[&str]) -> Vec<String> {
    let Some((first, rest)) = recommendations.split_first() else {
        return Vec::new();
    };
    let mut common: Vec<String> = Vec::new();
    for word in first.split_whitespace() {
        let shared = rest.iter().all(|r| r.split_whitespace().any(|w| w == word));
        if shared && !common.iter().any(|c| c == word) {
            common.push(word.to_string());
        }
    }
    common
}

/// Combine opinions on one conflict into a resolution
///
/// Zero opinions require manual resolution; one passes through; several
/// with more than one above [`HIGH_CONFIDENCE`] merge into a consensus at
/// the highest confidence; otherwise the best-ranked opinion wins.
#[must_use]
pub fn synthesize(conflict: &Conflict, opinions: Vec<ExpertOpinion>) -> Resolution {
    let opinions = ranked(opinions);
    match opinions.as_slice() {
        [] => Resolution::manual(conflict.id),
        [only] => Resolution::from_opinion(conflict.id, only),
        [best, ..] => {
            let high: Vec<&ExpertOpinion> = opinions
                .iter()
                .filter(|o| o.confidence > HIGH_CONFIDENCE)
                .collect();
            if high.len() < 2 {
                return Resolution::from_opinion(conflict.id, best);
            }
            let texts: Vec<&str> = high.iter().map(|o| o.recommendation.as_str()).collect();
            let common = common_words(&texts);
            let recommendation = if common.is_empty() {
                high[0].recommendation.clone()
            } else {
                format!("Consensus recommendation: {}", common.join(" "))
            };
            Resolution {
                conflict_id: conflict.id,
                recommendation,
                rationale: CONSENSUS_RATIONALE.to_string(),
                confidence: high[0].confidence,
                contributing_experts: high.iter().map(|o| o.expert_name.clone()).collect(),
                manual_resolution_required: false,
                alternatives: high
                    .iter()
                    .flat_map(|o| o.alternatives.iter().cloned())
                    .collect::<IndexSet<_>>()
                    .into_iter()
                    .collect(),
            }
        }
    }
}

impl ExpertCoordinator {
    /// Create coordinator from a set of experts (later duplicates replace earlier)
    #[must_use]
    pub fn new(experts: impl IntoIterator<Item = Expert>) -> Self {
        Self {
            experts: experts.into_iter().map(|e| (e.kind, e)).collect(),
            history: RwLock::new(Vec::new()),
            usage: DashMap::new(),
        }
    }

    /// Coordinator with every expert in its fallback form
    #[must_use]
    pub fn with_fallbacks() -> Self {
        Self::new(ExpertKind::ALL.into_iter().map(Expert::fallback))
    }

    /// Load all four experts from `<dir>/<key>-pattern-expert.md`
    ///
    /// Missing or empty documents yield fallback experts; loading never fails.
    pub async fn load(dir: &Path) -> Self {
        let mut experts = Vec::with_capacity(ExpertKind::ALL.len());
        for kind in ExpertKind::ALL {
            let path = dir.join(kind.file_name());
            let loaded = match tokio::fs::read_to_string(&path).await {
                Ok(content) => Expert::from_markdown(kind, &path, &content),
                Err(e) => Err(ExpertError::io(&path, e)),
            };
            match loaded {
                Ok(expert) => {
                    debug!(expert = %expert.name, patterns = expert.knowledge.patterns.len(), "Loaded expert");
                    experts.push(expert);
                }
                Err(e) => {
                    warn!(expert = %kind, error = %e, "Could not load expert, using fallback");
                    experts.push(Expert::fallback(kind));
                }
            }
        }
        info!(count = experts.len(), "Expert panel ready");
        Self::new(experts)
    }

    /// Loaded experts
    pub fn experts(&self) -> impl Iterator<Item = &Expert> {
        self.experts.values()
    }

    /// Expert by kind
    #[must_use]
    pub fn get(&self, kind: ExpertKind) -> Option<&Expert> {
        self.experts.get(&kind)
    }

    /// Experts consulted for a conflict
    ///
    /// The domain's primary expert first; every other expert joins for
    /// critical or broad conflicts.
    #[must_use]
    pub fn select(&self, conflict: &Conflict) -> Vec<&Expert> {
        let primary = ExpertKind::for_domain(conflict.domain);
        let mut selected: Vec<&Expert> = self.experts.get(&primary).into_iter().collect();
        if conflict.severity == Severity::Critical || conflict.scope() == ConflictScope::Broad {
            selected.extend(self.experts.values().filter(|e| e.kind != primary));
        }
        selected
    }

    fn consult(&self, conflict: &Conflict) -> ConflictRecord {
        let experts = self.select(conflict);
        let opinions: Vec<ExpertOpinion> = experts.iter().map(|e| e.consult(conflict)).collect();
        let resolution = synthesize(conflict, opinions.clone());
        ConflictRecord {
            conflict: conflict.clone(),
            experts: experts.iter().map(|e| e.name.clone()).collect(),
            opinions: ranked(opinions),
            resolution,
        }
    }

    fn record(&self, record: ConflictRecord) -> Resolution {
        for name in &record.experts {
            *self.usage.entry(name.clone()).or_insert(0) += 1;
        }
        debug!(
            conflict = %record.conflict.conflict_type,
            file = %record.conflict.file_path,
            confidence = record.resolution.confidence,
            experts = ?record.resolution.contributing_experts,
            "Conflict resolved"
        );
        let resolution = record.resolution.clone();
        self.history.write().push(record);
        resolution
    }

    /// Resolve one conflict
    #[must_use]
    pub fn resolve(&self, conflict: &Conflict) -> Resolution {
        self.record(self.consult(conflict))
    }

    /// Resolve independent conflicts in parallel
    ///
    /// Resolutions and history entries follow the input order.
    #[must_use]
    pub fn resolve_all(&self, conflicts: &[Conflict]) -> Vec<Resolution> {
        let records: Vec<ConflictRecord> = conflicts.par_iter().map(|c| self.consult(c)).collect();
        records.into_iter().map(|r| self.record(r)).collect()
    }

    /// Resolved conflicts so far
    #[must_use]
    pub fn history(&self) -> Vec<ConflictRecord> {
        self.history.read().clone()
    }

    /// Consultations per expert name (experts never consulted report 0)
    #[must_use]
    pub fn expert_usage(&self) -> BTreeMap<String, usize> {
        let mut usage: BTreeMap<String, usize> =
            self.experts.values().map(|e| (e.name.clone(), 0)).collect();
        for entry in &self.usage {
            usage.insert(entry.key().clone(), *entry.value());
        }
        usage
    }

    /// Conflict report with usage and improvement suggestions
    #[must_use]
    pub fn conflict_report(&self) -> ConflictReport {
        let history = self.history.read();
        let mut common_types: BTreeMap<ConflictType, usize> = BTreeMap::new();
        for record in history.iter() {
            *common_types.entry(record.conflict.conflict_type).or_insert(0) += 1;
        }
        let expert_usage = self.expert_usage();

        let mut recommendations = Vec::new();
        let busiest = expert_usage
            .iter()
            .filter(|(_, count)| **count > 0)
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)));
        if let Some((name, _)) = busiest {
            recommendations.push(format!(
                "Consider enhancing {name} with additional pattern knowledge"
            ));
        }
        let most_common = common_types
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)));
        if let Some((conflict_type, _)) = most_common {
            recommendations.push(format!(
                "Address common {conflict_type} conflicts through pattern standardization"
            ));
        }

        ConflictReport {
            total_conflicts: history.len(),
            resolved_conflicts: history
                .iter()
                .filter(|r| !r.resolution.manual_resolution_required)
                .count(),
            expert_usage,
            common_types,
            recommendations,
        }
    }

    /// Guidance for a domain from its primary expert
    #[must_use]
    pub fn guidance(&self, domain: DomainType) -> Option<DomainGuidance> {
        let expert = self.experts.get(&ExpertKind::for_domain(domain))?;
        let top = |items: &[String]| items.iter().take(3).cloned().collect::<Vec<_>>();
        Some(DomainGuidance {
            domain,
            expert: expert.name.clone(),
            patterns: top(&expert.knowledge.patterns),
            rules: top(&expert.rules),
            common_issues: top(&expert.knowledge.conflicts),
        })
    }

    /// Knowledge export
    #[must_use]
    pub fn knowledge_summary(&self) -> KnowledgeSummary {
        let history = self.history.read();
        KnowledgeSummary {
            experts: self
                .experts
                .values()
                .map(|e| ExpertSummary {
                    name: e.name.clone(),
                    kind: e.kind,
                    family: e.family().to_string(),
                    pattern_count: e.knowledge.patterns.len(),
                    rule_count: e.rules.len(),
                    fallback: e.fallback,
                })
                .collect(),
            conflicts: history.len(),
            resolutions: history
                .iter()
                .filter(|r| !r.resolution.manual_resolution_required)
                .count(),
        }
    }
}
