use relay_protocol::{IntentType, RetrievalDepth};
use rmcp::schemars;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SESSION_ID: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryContextRequest {
    #[schemars(description = "Natural-language description of the context you need")]
    pub intent: String,

    #[schemars(description = "Workspace root (must be bootstrapped unless auto-bootstrap is on)")]
    pub workspace: String,

    #[schemars(description = "Session id used for loop detection and episodic hints (default: 'default')")]
    #[serde(default)]
    pub session_id: Option<String>,

    #[schemars(
        description = "What you plan to do with the results: explore, navigate, explain, debug, review, modify, refactor, delete"
    )]
    #[serde(default)]
    pub intent_type: Option<IntentType>,

    #[schemars(description = "Retrieval depth: shallow, standard or deep")]
    #[serde(default)]
    pub depth: Option<RetrievalDepth>,

    #[schemars(description = "Drop candidates scoring below this confidence (0..1)")]
    #[serde(default)]
    pub min_confidence: Option<f64>,

    #[schemars(description = "Only consider files under these workspace-relative prefixes")]
    #[serde(default)]
    pub include_paths: Vec<String>,

    #[schemars(description = "Never consider files under these workspace-relative prefixes")]
    #[serde(default)]
    pub exclude_paths: Vec<String>,

    #[schemars(description = "Glob (with * or ?) or substring the file path must match")]
    #[serde(default)]
    pub file_pattern: Option<String>,

    #[schemars(description = "Results per page (1-200, default 20)")]
    #[serde(default)]
    pub page_size: Option<usize>,

    #[schemars(description = "Zero-based page index (default 0)")]
    #[serde(default)]
    pub page_idx: Option<usize>,

    #[schemars(description = "Write the page to this file instead of returning the items")]
    #[serde(default)]
    pub output_file: Option<String>,

    #[schemars(description = "Also slice the full result set into chunks; fetch them with fetch_stream_chunk")]
    #[serde(default)]
    pub stream: Option<bool>,

    #[schemars(description = "Items per stream chunk (1-200, default 5)")]
    #[serde(default)]
    pub stream_chunk_size: Option<usize>,

    #[schemars(description = "List results hidden only by the page window")]
    #[serde(default)]
    pub explain_misses: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapRequest {
    #[schemars(description = "Workspace root directory to register")]
    pub workspace: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchStreamChunkRequest {
    #[schemars(description = "streamId returned by query_context with stream=true")]
    pub stream_id: String,

    #[schemars(description = "Zero-based chunk index")]
    pub chunk_index: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetSessionStateRequest {
    #[schemars(description = "Session whose query history should be cleared")]
    pub session_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatusRequest {
    #[schemars(description = "Also report the history length of this session")]
    #[serde(default)]
    pub session_id: Option<String>,
}
