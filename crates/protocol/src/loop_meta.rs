use crate::RetrievalParams;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Repeat-query classification. Variants are ordered by severity.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum LoopPattern {
    IdenticalQuery,
    SemanticRepeat,
    FutileRepeat,
}

impl LoopPattern {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IdenticalQuery => "identical_query",
            Self::SemanticRepeat => "semantic_repeat",
            Self::FutileRepeat => "futile_repeat",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoopDetection {
    pub detected: bool,
    pub pattern: LoopPattern,
    /// Matching queries inside the window, the current one included.
    pub occurrences: usize,
    pub window_seconds: u64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_strategies: Vec<String>,
    pub human_review_suggested: bool,
    /// Parameters actually dispatched when the strategy was escalated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalated_to: Option<RetrievalParams>,
}
