//! Context Relay MCP Server
//!
//! Admission-controlled codebase retrieval for AI agents over MCP (stdio).
//!
//! ## Tools
//!
//! - `bootstrap` - Register a workspace (deduplicated per workspace)
//! - `query_context` - Ranked, confidence-tiered context for a natural-language intent
//! - `fetch_stream_chunk` - Items of one chunk of a streamed result set
//! - `reset_session_state` - Forget a session's query history
//! - `server_status` - Admission counters, sessions, workspaces, stream cache
//!
//! ## Usage
//!
//! Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "context-relay": {
//!       "command": "context-relay-mcp",
//!       "env": { "CONTEXT_RELAY_MAX_CONCURRENT": "8" }
//!     }
//!   }
//! }
//! ```

use anyhow::{Context as AnyhowContext, Result};
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use std::sync::Arc;

pub mod config;
pub mod envelope;
mod error;
pub mod orchestrator;
pub mod streams;
pub mod tools;
mod util;
pub mod workspace;

pub use config::{ConfigError, RelayConfig};
pub use error::ToolFailure;
pub use orchestrator::Orchestrator;
pub use tools::RelayService;

pub async fn main_entry() -> Result<()> {
    // stdout carries the MCP protocol; logs go to stderr only.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = RelayConfig::load().context("loading context relay configuration")?;
    log::info!(
        "Starting Context Relay MCP server (max_concurrent={}, timeout_ms={})",
        config.admission.max_concurrent,
        config.timeout.timeout_ms
    );

    let orchestrator =
        Orchestrator::from_config(config).context("building the query orchestrator")?;
    let service = RelayService::new(Arc::new(orchestrator));
    let server = service.serve(stdio()).await?;

    server.waiting().await?;

    log::info!("Context Relay MCP server stopped");
    Ok(())
}
