//! `/web/tools/list` and `/web/tools/execute`.

use axum::extract::State;
use axum::Json;
use hostmcp_protocol::types::{ArgumentMap, CallToolResult, Cursor};
use hostmcp_protocol::GatewayError;
use serde::{Deserialize, Serialize};

use crate::error_response::ApiError;
use crate::extractors::Bearer;
use crate::request_context::RequestId;
use crate::session_scope::{authorize_all, with_request_scoped_sessions};
use crate::state::AppState;

use super::ServerCallEnvelope;

#[derive(Debug, Deserialize)]
pub struct ListToolsBody {
    #[serde(flatten)]
    pub server: ServerCallEnvelope,
    pub cursor: Option<Cursor>,
    #[serde(rename = "modelId")]
    pub model_id: Option<String>,
}

/// Metadata about the listing itself, distinct from any one tool's own
/// schema — currently just the count returned by this page, keyed by the
/// server it came from.
#[derive(Debug, Serialize)]
pub struct ToolsMetadata {
    #[serde(rename = "serverId")]
    pub server_id: String,
    #[serde(rename = "toolCount")]
    pub tool_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ListToolsResponse {
    pub tools: Vec<hostmcp_protocol::types::Tool>,
    #[serde(rename = "toolsMetadata")]
    pub tools_metadata: ToolsMetadata,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
    #[serde(rename = "tokenCount", skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
}

pub async fn list(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<ListToolsBody>,
) -> Result<Json<ListToolsResponse>, ApiError> {
    let oauth_tokens = body.server.oauth_tokens();
    let entries = authorize_all(
        &state,
        &bearer,
        &body.server.workspace_id,
        std::slice::from_ref(&body.server.server_id),
        &oauth_tokens,
    )
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    let server_id = body.server.server_id.clone();
    let result = with_request_scoped_sessions(&state, &bearer, entries, move |manager| async move {
        let session = manager.ensure_connected(&server_id).await?;
        session.list_tools(body.cursor).await
    })
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    let token_count = body.model_id.as_ref().map(|_| estimate_token_count(&result.tools));

    Ok(Json(ListToolsResponse {
        tools_metadata: ToolsMetadata {
            server_id: body.server.server_id,
            tool_count: result.tools.len(),
        },
        tools: result.tools,
        next_cursor: result.next_cursor,
        token_count,
    }))
}

/// A model-agnostic, deliberately rough token estimate (roughly 4 bytes per
/// token of the tools' serialized schema) used only when a caller asks for
/// one via `modelId`; no tokenizer crate is pulled in for this.
fn estimate_token_count(tools: &[hostmcp_protocol::types::Tool]) -> u32 {
    let bytes: usize = tools
        .iter()
        .map(|tool| serde_json::to_string(tool).map(|s| s.len()).unwrap_or(0))
        .sum();
    (bytes / 4) as u32
}

#[derive(Debug, Deserialize)]
pub struct ExecuteToolBody {
    #[serde(flatten)]
    pub server: ServerCallEnvelope,
    #[serde(rename = "toolName")]
    pub tool_name: String,
    #[serde(default)]
    pub parameters: ArgumentMap,
    #[serde(rename = "taskOptions")]
    pub task_options: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ExecuteToolResponse {
    pub status: &'static str,
    pub result: CallToolResult,
}

pub async fn execute(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<ExecuteToolBody>,
) -> Result<Json<ExecuteToolResponse>, ApiError> {
    if body.task_options.is_some() {
        return Err(ApiError {
            error: GatewayError::feature_not_supported("taskOptions is not supported in hosted mode"),
            request_id: Some(request_id),
        });
    }

    let oauth_tokens = body.server.oauth_tokens();
    let entries = authorize_all(
        &state,
        &bearer,
        &body.server.workspace_id,
        std::slice::from_ref(&body.server.server_id),
        &oauth_tokens,
    )
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    let server_id = body.server.server_id.clone();
    let result = with_request_scoped_sessions(&state, &bearer, entries, move |manager| async move {
        let session = manager.ensure_connected(&server_id).await?;
        session.execute_tool(&body.tool_name, body.parameters).await
    })
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    Ok(Json(ExecuteToolResponse {
        status: "completed",
        result,
    }))
}
