use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One ranked, confidence-scored retrieval result as produced by a ranking oracle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultCandidate {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub summary: String,
    /// Relevance confidence in `[0, 1]`.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_files: Vec<String>,
    /// Unix milliseconds at which the oracle produced (or cached) this result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
}

impl ResultCandidate {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            summary: String::new(),
            confidence: clamp_unit(confidence),
            related_files: Vec::new(),
            created_at: None,
        }
    }

    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    #[must_use]
    pub fn with_related_file(mut self, path: impl Into<String>) -> Self {
        self.related_files.push(path.into());
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, unix_ms: u64) -> Self {
        self.created_at = Some(unix_ms);
        self
    }

    /// Oracles are external; scores outside `[0, 1]` (or NaN) are pulled back into range.
    pub fn normalize(&mut self) {
        self.confidence = clamp_unit(self.confidence);
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Per-candidate freshness verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessReport {
    /// Likelihood in `[0, 1]` that the result still reflects the current sources.
    pub freshness_score: f64,
    pub stale: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_files: Vec<String>,
    /// Files whose modification time could not be read.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_files: Vec<String>,
}
