//! `/web/servers/validate` and `/web/servers/check-oauth`: reachability
//! checks that never claim anything about the target server's semantics,
//! only that a connection and `initialize` handshake succeeded.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error_response::ApiError;
use crate::extractors::Bearer;
use crate::request_context::RequestId;
use crate::session_scope::{authorize_all, with_request_scoped_sessions};
use crate::state::AppState;

use super::ServerCallEnvelope;

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub success: bool,
    pub status: &'static str,
}

pub async fn validate(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<ServerCallEnvelope>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let oauth_tokens = body.oauth_tokens();
    let entries = authorize_all(
        &state,
        &bearer,
        &body.workspace_id,
        std::slice::from_ref(&body.server_id),
        &oauth_tokens,
    )
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    let result = with_request_scoped_sessions(&state, &bearer, entries, |manager| async move {
        manager.ensure_connected(&body.server_id).await?;
        Ok(())
    })
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    let _ = result;
    Ok(Json(ValidateResponse {
        success: true,
        status: "connected",
    }))
}

#[derive(Debug, Serialize)]
pub struct CheckOauthResponse {
    #[serde(rename = "requiresOauth")]
    pub requires_oauth: bool,
    #[serde(rename = "authorizationServerUrl", skip_serializing_if = "Option::is_none")]
    pub authorization_server_url: Option<String>,
}

pub async fn check_oauth(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<ServerCallEnvelope>,
) -> Result<Json<CheckOauthResponse>, ApiError> {
    let descriptor = state
        .authorizer
        .authorize(&bearer, &body.workspace_id, &body.server_id)
        .await
        .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    Ok(Json(CheckOauthResponse {
        requires_oauth: descriptor.use_oauth,
        authorization_server_url: descriptor.use_oauth.then(|| descriptor.url.to_string()),
    }))
}
