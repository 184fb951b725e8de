//! `/web/resources/list` and `/web/resources/read`.

use axum::extract::State;
use axum::Json;
use hostmcp_protocol::types::{Cursor, Resource};
use serde::{Deserialize, Serialize};

use crate::error_response::ApiError;
use crate::extractors::Bearer;
use crate::request_context::RequestId;
use crate::session_scope::{authorize_all, with_request_scoped_sessions};
use crate::state::AppState;

use super::ServerCallEnvelope;

#[derive(Debug, Deserialize)]
pub struct ListResourcesBody {
    #[serde(flatten)]
    pub server: ServerCallEnvelope,
    pub cursor: Option<Cursor>,
}

#[derive(Debug, Serialize)]
pub struct ListResourcesResponse {
    pub resources: Vec<Resource>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

pub async fn list(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<ListResourcesBody>,
) -> Result<Json<ListResourcesResponse>, ApiError> {
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
        session.list_resources(body.cursor).await
    })
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    Ok(Json(ListResourcesResponse {
        resources: result.resources,
        next_cursor: result.next_cursor,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ReadResourceBody {
    #[serde(flatten)]
    pub server: ServerCallEnvelope,
    pub uri: String,
}

#[derive(Debug, Serialize)]
pub struct ReadResourceResponse {
    pub content: hostmcp_protocol::types::ReadResourceResult,
}

pub async fn read(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<ReadResourceBody>,
) -> Result<Json<ReadResourceResponse>, ApiError> {
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
        session.read_resource(&body.uri).await
    })
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    Ok(Json(ReadResourceResponse { content: result }))
}
