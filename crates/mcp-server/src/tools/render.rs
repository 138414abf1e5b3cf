use crate::error::ToolFailure;
use relay_protocol::ErrorEnvelope;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::json;

const MAX_DETAIL_LINES: usize = 8;
const MAX_DETAIL_CHARS: usize = 200;

fn render_details_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => {
            let mut out = s.split_whitespace().collect::<Vec<_>>().join(" ");
            if let Some((cut, _)) = out.char_indices().nth(MAX_DETAIL_CHARS) {
                out.truncate(cut);
                out.push('…');
            }
            out
        }
        serde_json::Value::Array(values) => format!("<array len={}>", values.len()),
        serde_json::Value::Object(values) => format!("<object keys={}>", values.len()),
        other => other.to_string(),
    }
}

fn render_details_notes(details: &serde_json::Value) -> Vec<String> {
    let serde_json::Value::Object(map) = details else {
        return vec![format!("details={}", render_details_value(details))];
    };
    let mut keys = map.keys().collect::<Vec<_>>();
    keys.sort();

    let mut out: Vec<String> = keys
        .iter()
        .take(MAX_DETAIL_LINES)
        .filter_map(|key| {
            map.get(key.as_str())
                .map(|value| format!("details.{key}={}", render_details_value(value)))
        })
        .collect();
    if map.len() > MAX_DETAIL_LINES {
        out.push(format!("details.more_keys={}", map.len() - MAX_DETAIL_LINES));
    }
    out
}

pub(super) fn tool_error_envelope(error: ErrorEnvelope) -> CallToolResult {
    let mut lines = vec![format!("error: {}", error.code), error.message.clone()];
    if let Some(retry_after_ms) = error.retry_after_ms {
        lines.push(format!("retry_after_ms: {retry_after_ms}"));
    }
    if let Some(remediation) = error.remediation.as_deref() {
        lines.push(format!("remediation: {remediation}"));
    }
    if let Some(details) = error.details.as_ref() {
        lines.extend(render_details_notes(details));
    }
    for action in &error.next_actions {
        lines.push(format!("next: {} ({})", action.tool, action.reason));
    }

    let mut result = CallToolResult::error(vec![Content::text(lines.join("\n"))]);
    result.structured_content = Some(json!({ "error": error }));
    result
}

pub(super) fn tool_failure(failure: ToolFailure) -> CallToolResult {
    tool_error_envelope(failure.into_envelope())
}

pub(super) fn tool_success<T: Serialize>(value: &T) -> CallToolResult {
    let structured = match serde_json::to_value(value) {
        Ok(structured) => structured,
        Err(err) => return tool_failure(ToolFailure::Internal(format!("serialize result: {err}"))),
    };
    let text = serde_json::to_string_pretty(&structured).unwrap_or_else(|_| structured.to_string());
    let mut result = CallToolResult::success(vec![Content::text(text)]);
    result.structured_content = Some(structured);
    result
}

pub(super) fn render<T: Serialize>(outcome: Result<T, ToolFailure>) -> CallToolResult {
    match outcome {
        Ok(value) => tool_success(&value),
        Err(failure) => tool_failure(failure),
    }
}
