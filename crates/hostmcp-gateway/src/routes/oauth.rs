//! The browser's MCP OAuth flow cannot cross origins on its own; these two
//! routes proxy it through the gateway. Both require a bearer and enforce
//! the same HTTPS-only target validation.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::error_response::ApiError;
use crate::extractors::Bearer;
use crate::request_context::RequestId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProxyBody {
    pub url: String,
    pub method: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

pub async fn proxy(
    State(state): State<AppState>,
    Bearer(_bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<ProxyBody>,
) -> Result<Response, ApiError> {
    let request = hostmcp_authz::ProxyRequest {
        target_url: body.url,
        method: body.method.unwrap_or_else(|| "GET".to_string()),
        headers: body.headers,
        body: body.body.map(String::into_bytes).unwrap_or_default(),
    };

    let response = hostmcp_authz::forward_oauth_request(&state.http_client, request)
        .await
        .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    Ok(render_proxy_response(response))
}

#[derive(Debug, Deserialize)]
pub struct MetadataQuery {
    pub url: String,
}

pub async fn metadata(
    State(state): State<AppState>,
    Bearer(_bearer): Bearer,
    request_id: RequestId,
    Query(query): Query<MetadataQuery>,
) -> Result<Response, ApiError> {
    let request = hostmcp_authz::ProxyRequest {
        target_url: query.url,
        method: "GET".to_string(),
        headers: HashMap::new(),
        body: Vec::new(),
    };

    let response = hostmcp_authz::forward_oauth_request(&state.http_client, request)
        .await
        .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    Ok(render_proxy_response(response))
}

fn render_proxy_response(response: hostmcp_authz::ProxyResponse) -> Response {
    let status = axum::http::StatusCode::from_u16(response.status).unwrap_or(axum::http::StatusCode::BAD_GATEWAY);
    let mut headers = HeaderMap::new();
    if let Some(content_type) = response.content_type.as_deref() {
        if let Ok(value) = content_type.parse() {
            headers.insert(axum::http::header::CONTENT_TYPE, value);
        }
    }
    (status, headers, response.body).into_response()
}
