//! `POST /web/share/{token}/resolve`: the entry point of the shared-chat
//! flow. Resolving a token tells the browser which (workspace, server) pair
//! it may open a restricted chat against and whether it still needs to run
//! the MCP OAuth dance before that — the gateway's existing `validate` and
//! `check-oauth` routes carry the rest of that state machine, since a
//! resolved share session is just a (workspace, server) pair like any other.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::error_response::ApiError;
use crate::request_context::RequestId;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ResolveShareResponse {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    #[serde(rename = "serverId")]
    pub server_id: String,
    #[serde(rename = "useOauth")]
    pub use_oauth: bool,
}

pub async fn resolve(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(token): Path<String>,
) -> Result<Json<ResolveShareResponse>, ApiError> {
    let resolution = state
        .authorizer
        .resolve_share_token(&token)
        .await
        .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    Ok(Json(ResolveShareResponse {
        workspace_id: resolution.workspace_id,
        server_id: resolution.server_id,
        use_oauth: resolution.use_oauth,
    }))
}
