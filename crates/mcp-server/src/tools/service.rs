use super::render::render;
use super::schemas::{
    BootstrapRequest, FetchStreamChunkRequest, QueryContextRequest, ResetSessionStateRequest,
    ServerStatusRequest,
};
use crate::orchestrator::Orchestrator;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use std::sync::Arc;

const INSTRUCTIONS: &str = "Context Relay answers codebase-retrieval requests with ranked, \
confidence-tiered results. Call 'bootstrap' once per workspace, then 'query_context' with a \
natural-language intent. Repeated queries in one session are detected and widened \
automatically; 'reset_session_state' clears that history. Use 'fetch_stream_chunk' for streamed \
result sets and 'server_status' for load and admission counters.";

/// MCP service; all state lives in the shared [`Orchestrator`].
#[derive(Clone)]
pub struct RelayService {
    orchestrator: Arc<Orchestrator>,
    tool_router: ToolRouter<Self>,
}

impl RelayService {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl RelayService {
    #[tool(
        description = "Retrieve ranked, confidence-tiered context for an intent in a bootstrapped workspace. Supports paging (pageSize/pageIdx), streaming (stream/streamChunkSize), offloading to a file (outputFile) and near-miss explanations (explainMisses). Responses carry loop detection, staleness warnings and human-review recommendations when they apply."
    )]
    pub async fn query_context(
        &self,
        Parameters(request): Parameters<QueryContextRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(render(self.orchestrator.query_context(request).await))
    }

    #[tool(
        description = "Register a workspace root so it can be queried. Concurrent bootstraps of the same workspace share one scan and return the same runId."
    )]
    pub async fn bootstrap(
        &self,
        Parameters(request): Parameters<BootstrapRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(render(self.orchestrator.bootstrap(request).await))
    }

    #[tool(description = "Fetch the items of one chunk of a streamed query_context result.")]
    pub async fn fetch_stream_chunk(
        &self,
        Parameters(request): Parameters<FetchStreamChunkRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(render(self.orchestrator.fetch_stream_chunk(&request)))
    }

    #[tool(
        description = "Clear a session's query history (loop detection and episodic hints). Idempotent; returns how many queries were cleared."
    )]
    pub async fn reset_session_state(
        &self,
        Parameters(request): Parameters<ResetSessionStateRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(render(self.orchestrator.reset_session_state(&request).await))
    }

    #[tool(
        description = "Report admission counters, pending bootstraps, active sessions, registered workspaces and stream cache usage."
    )]
    pub async fn server_status(
        &self,
        Parameters(request): Parameters<ServerStatusRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(render(Ok(self.orchestrator.status(&request))))
    }
}

#[tool_handler]
impl ServerHandler for RelayService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}
