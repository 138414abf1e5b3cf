use anyhow::{Context, Result};
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::service::RunningService;
use rmcp::{RoleClient, ServiceExt};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

const BIN_NAME: &str = "context-relay-mcp";

pub fn locate_relay_mcp_bin() -> Result<PathBuf> {
    if let Some(path) = option_env!("CARGO_BIN_EXE_context-relay-mcp") {
        return Ok(PathBuf::from(path));
    }

    // `.../target/{debug|release}/deps/<test>` → `.../target/{debug|release}/context-relay-mcp`
    if let Ok(exe) = std::env::current_exe() {
        if let Some(target_profile_dir) = exe.parent().and_then(|p| p.parent()) {
            let candidate = target_profile_dir.join(BIN_NAME);
            if candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir
        .ancestors()
        .nth(2)
        .context("failed to resolve repo root from CARGO_MANIFEST_DIR")?;
    for profile in ["debug", "release"] {
        let candidate = repo_root.join("target").join(profile).join(BIN_NAME);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    anyhow::bail!(
        "failed to locate {BIN_NAME} binary; build with: cargo build -p relay-mcp --bin {BIN_NAME}"
    )
}

pub async fn start_server(envs: &[(&str, &str)]) -> Result<RunningService<RoleClient, ()>> {
    let bin = locate_relay_mcp_bin()?;
    let mut cmd = Command::new(bin);
    cmd.env("RUST_LOG", "warn");
    cmd.env_remove("CONTEXT_RELAY_CONFIG");
    cmd.env_remove("CONTEXT_RELAY_SESSION_DIR");
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let transport = rmcp::transport::TokioChildProcess::new(cmd).context("spawn mcp server")?;
    tokio::time::timeout(Duration::from_secs(10), ().serve(transport))
        .await
        .context("timeout starting MCP server")?
        .context("MCP handshake failed")
}

pub async fn call_tool(
    service: &RunningService<RoleClient, ()>,
    name: &str,
    args: serde_json::Value,
) -> Result<CallToolResult> {
    tokio::time::timeout(
        Duration::from_secs(10),
        service.call_tool(CallToolRequestParam {
            name: name.to_string().into(),
            arguments: args.as_object().cloned(),
        }),
    )
    .await
    .with_context(|| format!("timeout calling {name}"))?
    .with_context(|| format!("call {name}"))
}

pub fn structured(result: &CallToolResult) -> Result<&serde_json::Value> {
    result
        .structured_content
        .as_ref()
        .context("tool result has no structured_content")
}
