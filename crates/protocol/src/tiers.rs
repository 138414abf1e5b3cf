use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Qualitative confidence bucket. Variants are ordered from least to most confident.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Uncertain,
    Low,
    Medium,
    High,
    Definitive,
}

impl ConfidenceTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uncertain => "uncertain",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Definitive => "definitive",
        }
    }

    /// Tiers at which a write-risk request should not proceed unreviewed.
    #[must_use]
    pub const fn needs_review(self) -> bool {
        matches!(self, Self::Low | Self::Uncertain)
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateConfidence {
    pub tier: ConfidenceTier,
    /// Lowest visible confidence; `None` when the page is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    pub visible_items: usize,
    /// Id of the lowest-confidence visible item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_risk_element: Option<String>,
    pub statement: String,
}

/// Present only when review is recommended; `recommended` is always `true` when serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HumanReviewRecommendation {
    pub recommended: bool,
    pub risk_level: RiskLevel,
    pub aggregate_tier: ConfidenceTier,
    pub reason: String,
    pub suggested_action: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_order_from_uncertain_to_definitive() {
        assert!(ConfidenceTier::Uncertain < ConfidenceTier::Low);
        assert!(ConfidenceTier::High < ConfidenceTier::Definitive);
        assert!(ConfidenceTier::Low.needs_review());
        assert!(!ConfidenceTier::Medium.needs_review());
    }
}
