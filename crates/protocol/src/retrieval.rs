use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
    Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalDepth {
    Shallow,
    #[default]
    Standard,
    Deep,
}

impl RetrievalDepth {
    #[must_use]
    pub const fn deepest() -> Self {
        Self::Deep
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shallow => "shallow",
            Self::Standard => "standard",
            Self::Deep => "deep",
        }
    }
}

/// What the caller intends to do with the retrieved context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    #[default]
    Explore,
    Navigate,
    Explain,
    Debug,
    Review,
    Modify,
    Refactor,
    Delete,
}

impl IntentType {
    /// Intents whose results feed a change to the workspace.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        matches!(self, Self::Modify | Self::Refactor | Self::Delete)
    }
}

/// Parameters handed to the ranking oracle.
///
/// This is a value type: escalation produces a modified copy and never mutates shared config.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalParams {
    pub depth: RetrievalDepth,
    pub min_confidence: f64,
}

impl RetrievalParams {
    pub const ESCALATION_FLOOR_FACTOR: f64 = 0.5;

    #[must_use]
    pub fn new(depth: RetrievalDepth, min_confidence: f64) -> Self {
        Self {
            depth,
            min_confidence: min_confidence.clamp(0.0, 1.0),
        }
    }

    /// Deepest supported depth with a halved confidence floor.
    #[must_use]
    pub fn escalated(self) -> Self {
        Self {
            depth: RetrievalDepth::deepest(),
            min_confidence: (self.min_confidence * Self::ESCALATION_FLOOR_FACTOR).max(0.0),
        }
    }
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self::new(RetrievalDepth::Standard, 0.3)
    }
}
