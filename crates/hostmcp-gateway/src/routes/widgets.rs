//! MCP Apps / ChatGPT Apps widget content routes. Both read a `ui://`
//! resource from the target server and return its decoded HTML; file
//! upload/download is out of scope for hosted mode.

use axum::extract::{Path, State};
use axum::Json;
use hostmcp_protocol::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};

use crate::error_response::ApiError;
use crate::extractors::Bearer;
use crate::request_context::RequestId;
use crate::session_scope::{authorize_all, with_request_scoped_sessions};
use crate::state::AppState;

use super::ServerCallEnvelope;

#[derive(Debug, Deserialize)]
pub struct WidgetContentBody {
    #[serde(flatten)]
    pub server: ServerCallEnvelope,
    #[serde(rename = "resourceUri")]
    pub resource_uri: String,
}

fn require_ui_scheme(uri: &str) -> GatewayResult<()> {
    if uri.starts_with("ui://") {
        Ok(())
    } else {
        Err(GatewayError::validation(format!(
            "widget resource uri must use the ui:// scheme, got {uri}"
        )))
    }
}

#[derive(Debug, Serialize)]
pub struct McpAppsWidgetResponse {
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(rename = "prefersBorder", skip_serializing_if = "Option::is_none")]
    pub prefers_border: Option<bool>,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

pub async fn mcp_apps_widget_content(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<WidgetContentBody>,
) -> Result<Json<McpAppsWidgetResponse>, ApiError> {
    require_ui_scheme(&body.resource_uri).map_err(|error| ApiError { error, request_id: Some(request_id) })?;

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
    let resource_uri = body.resource_uri.clone();
    let result = with_request_scoped_sessions(&state, &bearer, entries, move |manager| async move {
        let session = manager.ensure_connected(&server_id).await?;
        let read = session.read_resource(&resource_uri).await?;
        let contents = read
            .contents
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::not_found(format!("resource {resource_uri} returned no contents")))?;
        let html = contents
            .decode_text()
            .map_err(|message| GatewayError::internal(format!("widget resource undecodable: {message}")))?;
        let mime_type = contents.mime_type.clone().unwrap_or_else(|| "text/html".to_string());
        Ok((html, mime_type))
    })
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    Ok(Json(McpAppsWidgetResponse {
        html: result.0,
        csp: None,
        permissions: None,
        prefers_border: None,
        mime_type: result.1,
    }))
}

#[derive(Debug, Serialize)]
pub struct ChatgptAppsCsp {
    #[serde(rename = "connectSrc")]
    pub connect_src: Vec<String>,
    #[serde(rename = "resourceSrc")]
    pub resource_src: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatgptAppsWidgetResponse {
    pub html: String,
    pub csp: ChatgptAppsCsp,
    #[serde(rename = "widgetDescription", skip_serializing_if = "Option::is_none")]
    pub widget_description: Option<String>,
    #[serde(rename = "prefersBorder")]
    pub prefers_border: bool,
    #[serde(rename = "closeWidget")]
    pub close_widget: bool,
}

/// A permissive default CSP: the ChatGPT Apps host sandboxes the iframe
/// itself, so the gateway does not attempt to derive per-domain allowlists
/// from the resource's own declared content.
fn default_chatgpt_apps_csp() -> ChatgptAppsCsp {
    ChatgptAppsCsp {
        connect_src: vec!["'self'".to_string()],
        resource_src: vec!["'self'".to_string(), "https:".to_string()],
    }
}

pub async fn chatgpt_apps_widget_content(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<WidgetContentBody>,
) -> Result<Json<ChatgptAppsWidgetResponse>, ApiError> {
    require_ui_scheme(&body.resource_uri).map_err(|error| ApiError { error, request_id: Some(request_id) })?;

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
    let resource_uri = body.resource_uri.clone();
    let html = with_request_scoped_sessions(&state, &bearer, entries, move |manager| async move {
        let session = manager.ensure_connected(&server_id).await?;
        let read = session.read_resource(&resource_uri).await?;
        let contents = read
            .contents
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::not_found(format!("resource {resource_uri} returned no contents")))?;
        contents
            .decode_text()
            .map_err(|message| GatewayError::internal(format!("widget resource undecodable: {message}")))
    })
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    Ok(Json(ChatgptAppsWidgetResponse {
        html,
        csp: default_chatgpt_apps_csp(),
        widget_description: None,
        prefers_border: false,
        close_widget: false,
    }))
}

pub async fn upload_file_unsupported(request_id: RequestId) -> ApiError {
    ApiError {
        error: GatewayError::feature_not_supported("chatgpt-apps file uploads are not supported in hosted mode"),
        request_id: Some(request_id),
    }
}

pub async fn file_unsupported(request_id: RequestId, Path(_id): Path<String>) -> ApiError {
    ApiError {
        error: GatewayError::feature_not_supported("file retrieval is not supported in hosted mode"),
        request_id: Some(request_id),
    }
}
