use crate::error::{Result, SearchError};
use relay_protocol::{
    AggregateConfidence, ConfidenceTier, HumanReviewRecommendation, ResultCandidate, RiskLevel,
};
use serde::Serialize;

/// Inclusive lower bounds for each tier above `uncertain`.
///
/// Construction enforces `0 <= low < medium < high < definitive <= 1`, which keeps
/// [`ConfidenceThresholds::tier_for`] total and monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceThresholds {
    definitive_min: f64,
    high_min: f64,
    medium_min: f64,
    low_min: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            definitive_min: 0.95,
            high_min: 0.85,
            medium_min: 0.70,
            low_min: 0.50,
        }
    }
}

impl ConfidenceThresholds {
    pub fn new(definitive_min: f64, high_min: f64, medium_min: f64, low_min: f64) -> Result<Self> {
        let cuts = [low_min, medium_min, high_min, definitive_min];
        if cuts.iter().any(|cut| !cut.is_finite()) {
            return Err(SearchError::InvalidThresholds(
                "thresholds must be finite numbers".to_string(),
            ));
        }
        if low_min < 0.0 || definitive_min > 1.0 {
            return Err(SearchError::InvalidThresholds(format!(
                "thresholds must lie in [0, 1] (low={low_min}, definitive={definitive_min})"
            )));
        }
        if !(low_min < medium_min && medium_min < high_min && high_min < definitive_min) {
            return Err(SearchError::InvalidThresholds(format!(
                "expected low < medium < high < definitive, got \
                 {low_min} / {medium_min} / {high_min} / {definitive_min}"
            )));
        }
        Ok(Self {
            definitive_min,
            high_min,
            medium_min,
            low_min,
        })
    }

    #[must_use]
    pub fn definitive_min(&self) -> f64 {
        self.definitive_min
    }

    #[must_use]
    pub fn high_min(&self) -> f64 {
        self.high_min
    }

    #[must_use]
    pub fn medium_min(&self) -> f64 {
        self.medium_min
    }

    #[must_use]
    pub fn low_min(&self) -> f64 {
        self.low_min
    }

    #[must_use]
    pub fn tier_for(&self, score: f64) -> ConfidenceTier {
        if score.is_nan() {
            return ConfidenceTier::Uncertain;
        }
        if score >= self.definitive_min {
            ConfidenceTier::Definitive
        } else if score >= self.high_min {
            ConfidenceTier::High
        } else if score >= self.medium_min {
            ConfidenceTier::Medium
        } else if score >= self.low_min {
            ConfidenceTier::Low
        } else {
            ConfidenceTier::Uncertain
        }
    }

    /// Aggregate over the visible (post-pagination) page: the weakest item sets the tier.
    #[must_use]
    pub fn aggregate(&self, visible: &[ResultCandidate]) -> AggregateConfidence {
        let Some(weakest) = visible
            .iter()
            .reduce(|weakest, item| if item.confidence < weakest.confidence { item } else { weakest })
        else {
            return AggregateConfidence {
                tier: ConfidenceTier::Uncertain,
                min_confidence: None,
                visible_items: 0,
                highest_risk_element: None,
                statement: "No visible results; aggregate confidence is uncertain.".to_string(),
            };
        };

        let tier = self.tier_for(weakest.confidence);
        AggregateConfidence {
            tier,
            min_confidence: Some(weakest.confidence),
            visible_items: visible.len(),
            highest_risk_element: Some(weakest.id.clone()),
            statement: format!(
                "{} visible result(s) at aggregate confidence '{}'; highest risk element: {} \
                 (confidence {:.2}).",
                visible.len(),
                tier.as_str(),
                weakest.id,
                weakest.confidence
            ),
        }
    }
}

/// Review recommendation for a page, or `None` when review is not warranted.
///
/// Write-risk requests at `low`/`uncertain` get a high-risk recommendation. Read-only requests
/// only get one at `uncertain`, with medium risk.
#[must_use]
pub fn review_recommendation(
    aggregate: &AggregateConfidence,
    write_risk: bool,
) -> Option<HumanReviewRecommendation> {
    let tier = aggregate.tier;
    if !tier.needs_review() {
        return None;
    }

    let subject = aggregate
        .highest_risk_element
        .as_deref()
        .map_or_else(|| "the empty result set".to_string(), |id| format!("`{id}`"));

    if write_risk {
        return Some(HumanReviewRecommendation {
            recommended: true,
            risk_level: RiskLevel::High,
            aggregate_tier: tier,
            reason: format!(
                "Write-risk request backed by '{}' confidence context.",
                tier.as_str()
            ),
            suggested_action: format!(
                "Have a human confirm {subject} before applying any change."
            ),
        });
    }

    (tier == ConfidenceTier::Uncertain).then(|| HumanReviewRecommendation {
        recommended: true,
        risk_level: RiskLevel::Medium,
        aggregate_tier: tier,
        reason: "Read-only request with uncertain context.".to_string(),
        suggested_action: format!("Verify {subject} manually or refine the query."),
    })
}
