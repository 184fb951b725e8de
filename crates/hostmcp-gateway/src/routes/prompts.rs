//! `/web/prompts/list`, `/web/prompts/list-multi`, and `/web/prompts/get`.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use hostmcp_protocol::types::{ArgumentMap, Cursor, GetPromptResult, Prompt};
use serde::{Deserialize, Serialize};

use crate::error_response::ApiError;
use crate::extractors::Bearer;
use crate::request_context::RequestId;
use crate::session_scope::{authorize_all, with_request_scoped_sessions};
use crate::state::AppState;

use super::ServerCallEnvelope;

#[derive(Debug, Deserialize)]
pub struct ListPromptsBody {
    #[serde(flatten)]
    pub server: ServerCallEnvelope,
    pub cursor: Option<Cursor>,
}

#[derive(Debug, Serialize)]
pub struct ListPromptsResponse {
    pub prompts: Vec<Prompt>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

pub async fn list(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<ListPromptsBody>,
) -> Result<Json<ListPromptsResponse>, ApiError> {
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
        session.list_prompts(body.cursor).await
    })
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    Ok(Json(ListPromptsResponse {
        prompts: result.prompts,
        next_cursor: result.next_cursor,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListMultiPromptsBody {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    #[serde(rename = "serverIds")]
    pub server_ids: Vec<String>,
    #[serde(rename = "oauthTokens", default)]
    pub oauth_access_tokens: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ListMultiPromptsResponse {
    pub prompts: HashMap<String, Vec<Prompt>>,
    pub errors: HashMap<String, String>,
}

/// Fans out to every named server independently: one server's failure never
/// fails the whole call, it is captured per-server in `errors` instead.
pub async fn list_multi(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<ListMultiPromptsBody>,
) -> Result<Json<ListMultiPromptsResponse>, ApiError> {
    let entries = authorize_all(
        &state,
        &bearer,
        &body.workspace_id,
        &body.server_ids,
        &body.oauth_access_tokens,
    )
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    let server_ids: Vec<String> = entries.iter().map(|e| e.key.clone()).collect();
    let result = with_request_scoped_sessions(&state, &bearer, entries, move |manager| async move {
        let outcomes = futures::future::join_all(server_ids.iter().map(|server_id| {
            let manager = manager.clone();
            async move {
                let outcome = async {
                    let session = manager.ensure_connected(server_id).await?;
                    session.list_prompts(None).await
                }
                .await;
                (server_id.clone(), outcome)
            }
        }))
        .await;

        let mut prompts = HashMap::new();
        let mut errors = HashMap::new();
        for (server_id, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    prompts.insert(server_id, result.prompts);
                }
                Err(error) => {
                    errors.insert(server_id, error.message);
                }
            }
        }
        Ok((prompts, errors))
    })
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    Ok(Json(ListMultiPromptsResponse {
        prompts: result.0,
        errors: result.1,
    }))
}

#[derive(Debug, Deserialize)]
pub struct GetPromptBody {
    #[serde(flatten)]
    pub server: ServerCallEnvelope,
    #[serde(rename = "promptName")]
    pub name: String,
    #[serde(default)]
    pub arguments: ArgumentMap,
}

pub async fn get(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<GetPromptBody>,
) -> Result<Json<GetPromptResult>, ApiError> {
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
        session.get_prompt(&body.name, body.arguments).await
    })
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    Ok(Json(result))
}
