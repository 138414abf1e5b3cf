use anyhow::{Context, Result};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;

mod support;

use support::{call_tool, start_server, structured};

#[tokio::test]
async fn mcp_exposes_relay_tools_and_serves_a_query() -> Result<()> {
    let service = start_server(&[("CONTEXT_RELAY_MAX_CONCURRENT", "4")]).await?;

    let tools = tokio::time::timeout(
        Duration::from_secs(10),
        service.list_tools(Default::default()),
    )
    .await
    .context("timeout listing tools")??;
    let tool_names: HashSet<&str> = tools.tools.iter().map(|t| t.name.as_ref()).collect();
    for expected in [
        "query_context",
        "bootstrap",
        "fetch_stream_chunk",
        "reset_session_state",
        "server_status",
    ] {
        assert!(
            tool_names.contains(expected),
            "missing tool '{expected}' (available: {tool_names:?})"
        );
    }

    let tmp = tempfile::tempdir().context("tempdir")?;
    let root = tmp.path();
    std::fs::create_dir_all(root.join("src")).context("mkdir src")?;
    std::fs::write(
        root.join("src").join("retry.rs"),
        "pub fn retry_after(avg_ms: u64) -> u64 {\n    avg_ms.max(50)\n}\n",
    )
    .context("write retry.rs")?;
    let workspace = root.to_string_lossy().to_string();

    let query_args = json!({
        "intent": "retry after",
        "workspace": workspace,
        "sessionId": "smoke",
    });

    let unavailable = call_tool(&service, "query_context", query_args.clone()).await?;
    assert_eq!(unavailable.is_error, Some(true));
    let error = &structured(&unavailable)?["error"];
    assert_eq!(error["code"], "workspace_unavailable");
    assert_eq!(error["nextActions"][0]["tool"], "bootstrap");

    let bootstrap = call_tool(&service, "bootstrap", json!({ "workspace": workspace })).await?;
    assert_ne!(bootstrap.is_error, Some(true), "bootstrap returned error");
    let bootstrap = structured(&bootstrap)?;
    assert_eq!(bootstrap["fileCount"], 1);
    assert_eq!(bootstrap["deduplicated"], false);
    let run_id = bootstrap["runId"].as_str().context("runId")?.to_string();

    let query = call_tool(&service, "query_context", query_args).await?;
    assert_ne!(query.is_error, Some(true), "query_context returned error");
    let query = structured(&query)?;
    assert_eq!(query["runId"], run_id.as_str());
    assert_eq!(query["results"][0]["id"], "src/retry.rs");
    assert_eq!(query["pagination"]["totalItems"], 1);
    assert_eq!(query["timedOut"], false);
    assert!(query.get("loopDetection").is_none());
    assert_eq!(query["progress"][0]["stage"], "admitted");

    let invalid = call_tool(
        &service,
        "query_context",
        json!({ "intent": "retry", "workspace": workspace, "pageSize": 0 }),
    )
    .await?;
    assert_eq!(invalid.is_error, Some(true));
    assert_eq!(structured(&invalid)?["error"]["code"], "validation_error");

    let status = call_tool(&service, "server_status", json!({ "sessionId": "smoke" })).await?;
    let status = structured(&status)?;
    assert_eq!(status["admission"]["maxConcurrent"], 4);
    assert_eq!(status["admission"]["active"], 0);
    assert_eq!(status["registeredWorkspaces"], 1);
    assert_eq!(status["sessionHistoryLen"], 1);

    let reset = call_tool(&service, "reset_session_state", json!({ "sessionId": "smoke" })).await?;
    assert_eq!(structured(&reset)?["clearedQueries"], 1);

    service.cancel().await.context("shutdown mcp service")?;
    Ok(())
}

#[tokio::test]
async fn unknown_stream_ids_are_validation_errors() -> Result<()> {
    let service = start_server(&[]).await?;

    let result = call_tool(
        &service,
        "fetch_stream_chunk",
        json!({ "streamId": "stream-missing", "chunkIndex": 0 }),
    )
    .await?;
    assert_eq!(result.is_error, Some(true));
    let error = &structured(&result)?["error"];
    assert_eq!(error["code"], "validation_error");
    assert!(error["message"]
        .as_str()
        .is_some_and(|m| m.contains("stream-missing")));
    assert_eq!(error["details"]["streamId"], "stream-missing");

    service.cancel().await.context("shutdown mcp service")?;
    Ok(())
}
