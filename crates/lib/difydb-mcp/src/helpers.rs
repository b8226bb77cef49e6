use std::borrow::Cow;
use std::time::Duration;

use difydb_core::control::ControlError;
use difydb_store::SearchEnvelope;
use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content, ErrorCode};
use serde::Serialize;
use tracing::error;

pub fn mcp_err(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: None,
    }
}

pub fn map_control_err(tool: &'static str, err: &ControlError) -> ErrorData {
    error!(tool, error = %err, "tool call failed");
    mcp_err(ErrorCode::INTERNAL_ERROR, err.to_string())
}

pub fn timeout_err(tool: &'static str, timeout: Duration) -> ErrorData {
    error!(tool, timeout_secs = timeout.as_secs(), "tool call timed out");
    mcp_err(
        ErrorCode::INTERNAL_ERROR,
        format!("{tool} timed out after {}s", timeout.as_secs()),
    )
}

/// Renders an envelope as the single text item of a tool result.
pub fn envelope_result<R: Serialize>(
    envelope: &SearchEnvelope<R>,
) -> Result<CallToolResult, ErrorData> {
    let text = envelope.to_pretty_json().map_err(|err| {
        mcp_err(
            ErrorCode::INTERNAL_ERROR,
            format!("failed to serialize results: {err}"),
        )
    })?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}
