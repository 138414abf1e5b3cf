use relay_control::{Busy, ControlError};
use relay_protocol::{ErrorCode, ErrorEnvelope, ToolNextAction};
use relay_search::SearchError;
use serde_json::json;
use thiserror::Error;

const GENERIC_INTERNAL_MESSAGE: &str =
    "Internal error while processing the request. Details were logged on the server.";

/// Every way a tool call can fail, one variant per wire error code.
///
/// Timeouts are not failures: they produce a partial success payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolFailure {
    #[error("{0}")]
    Validation(String),

    /// A validation failure tied to one argument; `details` names it and its bounds.
    #[error("{message}")]
    InvalidArgument {
        message: String,
        details: serde_json::Value,
    },

    #[error("server busy; retry after {retry_after_ms}ms")]
    Busy { retry_after_ms: u64 },

    #[error("workspace '{workspace}' is unavailable: {reason}")]
    WorkspaceUnavailable { workspace: String, reason: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolFailure {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) | Self::InvalidArgument { .. } => ErrorCode::ValidationError,
            Self::Busy { .. } => ErrorCode::ServerBusy,
            Self::WorkspaceUnavailable { .. } => ErrorCode::WorkspaceUnavailable,
            Self::Internal(_) => ErrorCode::UnknownError,
        }
    }

    #[must_use]
    pub fn into_envelope(self) -> ErrorEnvelope {
        let code = self.code();
        match self {
            Self::Validation(message) => ErrorEnvelope::new(code, message),
            Self::InvalidArgument { message, details } => {
                ErrorEnvelope::new(code, message).with_details(details)
            }
            Self::Busy { retry_after_ms } => ErrorEnvelope::new(
                code,
                format!("Server is at its concurrency limit; retry after {retry_after_ms}ms."),
            )
            .with_retry_after_ms(retry_after_ms),
            Self::WorkspaceUnavailable { workspace, reason } => ErrorEnvelope::new(
                code,
                format!("Workspace '{workspace}' is unavailable: {reason}"),
            )
            .with_remediation(format!(
                "Call bootstrap with {{\"workspace\": \"{workspace}\"}}, then retry the query."
            ))
            .with_next_action(ToolNextAction {
                tool: "bootstrap".to_string(),
                args: json!({ "workspace": workspace }),
                reason: "Register the workspace before querying it.".to_string(),
            }),
            Self::Internal(detail) => {
                log::error!("internal tool failure: {detail}");
                ErrorEnvelope::new(code, GENERIC_INTERNAL_MESSAGE)
            }
        }
    }
}

impl From<Busy> for ToolFailure {
    fn from(busy: Busy) -> Self {
        Self::Busy {
            retry_after_ms: busy.retry_after_ms,
        }
    }
}

impl From<ControlError> for ToolFailure {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::Busy(busy) => busy.into(),
            ControlError::TaskFailed(detail) => Self::Internal(detail),
        }
    }
}

pub(crate) fn oracle_failure(workspace: &str, err: SearchError) -> ToolFailure {
    match err {
        SearchError::InvalidWorkspace(reason) => ToolFailure::WorkspaceUnavailable {
            workspace: workspace.to_string(),
            reason,
        },
        other => ToolFailure::Internal(format!("ranking oracle failed: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn busy_envelope_carries_the_retry_hint() {
        let envelope = ToolFailure::from(Busy { retry_after_ms: 120 }).into_envelope();
        assert_eq!(envelope.code, ErrorCode::ServerBusy);
        assert_eq!(envelope.retry_after_ms, Some(120));
        assert!(envelope.next_actions.is_empty());
    }

    #[test]
    fn workspace_unavailable_suggests_bootstrap() {
        let envelope = ToolFailure::WorkspaceUnavailable {
            workspace: "/ws".to_string(),
            reason: "not bootstrapped".to_string(),
        }
        .into_envelope();
        assert_eq!(envelope.code, ErrorCode::WorkspaceUnavailable);
        assert!(envelope
            .remediation
            .as_deref()
            .is_some_and(|r| r.contains("bootstrap")));
        assert_eq!(envelope.next_actions[0].tool, "bootstrap");
        assert_eq!(envelope.next_actions[0].args, json!({ "workspace": "/ws" }));
    }

    #[test]
    fn internal_details_stay_on_the_server() {
        let envelope = ToolFailure::Internal("db exploded at 0xdead".to_string()).into_envelope();
        assert_eq!(envelope.code, ErrorCode::UnknownError);
        assert!(!envelope.message.contains("0xdead"));
    }

    #[test]
    fn invalid_arguments_keep_their_details() {
        let envelope = ToolFailure::invalid_argument(
            "pageSize must lie in [1, 200], got 0",
            json!({ "field": "pageSize", "value": 0 }),
        )
        .into_envelope();
        assert_eq!(envelope.code, ErrorCode::ValidationError);
        assert_eq!(envelope.details, Some(json!({ "field": "pageSize", "value": 0 })));
    }

    #[test]
    fn task_failures_are_internal() {
        let failure = ToolFailure::from(ControlError::TaskFailed("panicked".to_string()));
        assert_eq!(failure.code(), ErrorCode::UnknownError);
    }
}
