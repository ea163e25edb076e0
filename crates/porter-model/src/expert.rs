//! Expert opinions and synthesized resolutions

use crate::adaptation::ConflictId;
use serde::{Deserialize, Serialize};

/// One expert's answer to one conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertOpinion {
    /// Expert display name
    pub expert_name: String,
    /// Recommended action
    pub recommendation: String,
    /// Why the expert recommends it
    pub rationale: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Other approaches worth weighing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

impl ExpertOpinion {
    /// Create opinion; confidence is clamped to [0, 1]
    #[must_use]
    pub fn new(
        expert_name: impl Into<String>,
        recommendation: impl Into<String>,
        rationale: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            expert_name: expert_name.into(),
            recommendation: recommendation.into(),
            rationale: rationale.into(),
            confidence: confidence.clamp(0.0, 1.0),
            alternatives: Vec::new(),
        }
    }

    /// Set the alternatives offered with the recommendation
    #[must_use]
    pub fn with_alternatives<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternatives = alternatives.into_iter().map(Into::into).collect();
        self
    }
}

/// Single synthesized answer for a conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Conflict this resolution closes
    pub conflict_id: ConflictId,
    /// Recommended action
    pub recommendation: String,
    /// Rationale
    pub rationale: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Experts whose opinions contributed
    pub contributing_experts: Vec<String>,
    /// No expert produced usable guidance
    pub manual_resolution_required: bool,
    /// Alternatives offered by the contributing experts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

impl Resolution {
    /// Resolution when no expert could help
    #[must_use]
    pub fn manual(conflict_id: ConflictId) -> Self {
        Self {
            conflict_id,
            recommendation: "Manual resolution required - no expert guidance available".to_string(),
            rationale: "Unable to consult relevant experts".to_string(),
            confidence: 0.0,
            contributing_experts: Vec::new(),
            manual_resolution_required: true,
            alternatives: Vec::new(),
        }
    }

    /// Pass a single opinion through
    #[must_use]
    pub fn from_opinion(conflict_id: ConflictId, opinion: &ExpertOpinion) -> Self {
        Self {
            conflict_id,
            recommendation: opinion.recommendation.clone(),
            rationale: opinion.rationale.clone(),
            confidence: opinion.confidence,
            contributing_experts: vec![opinion.expert_name.clone()],
            manual_resolution_required: false,
            alternatives: opinion.alternatives.clone(),
        }
    }

    /// Whether confidence reaches a threshold
    #[inline]
    #[must_use]
    pub fn is_confident(&self, threshold: f64) -> bool {
        !self.manual_resolution_required && self.confidence >= threshold
    }
}
