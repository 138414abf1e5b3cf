use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Admitted,
    LoopChecked,
    StrategyEscalated,
    OracleDispatched,
    OracleCompleted,
    QueryTimedOut,
    PostProcessed,
    OutputWritten,
}

impl ProgressStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::LoopChecked => "loop_checked",
            Self::StrategyEscalated => "strategy_escalated",
            Self::OracleDispatched => "oracle_dispatched",
            Self::OracleCompleted => "oracle_completed",
            Self::QueryTimedOut => "query_timed_out",
            Self::PostProcessed => "post_processed",
            Self::OutputWritten => "output_written",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    /// Milliseconds since the call was admitted.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_out_stage_name_is_stable() {
        let event = ProgressEvent {
            stage: ProgressStage::QueryTimedOut,
            elapsed_ms: 12,
            detail: None,
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["stage"], "query_timed_out");
        assert_eq!(value["elapsedMs"], 12);
        assert_eq!(ProgressStage::QueryTimedOut.as_str(), "query_timed_out");
    }
}
