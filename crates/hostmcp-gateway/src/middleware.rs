//! Request-scoped middleware: stamp a request id, open a tracing span
//! carrying tenant/route fields, and apply the tenant rate limiter before
//! any downstream work happens.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hostmcp_protocol::GatewayError;

use crate::error_response::ApiError;
use crate::rate_limit::RouteClass;
use crate::request_context::RequestId;
use crate::state::AppState;
use crate::tenant::{derive_tenant_id, extract_bearer};

/// Stamps every request with a fresh [`RequestId`] before it reaches any
/// extractor or handler.
pub async fn stamp_request_id(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(RequestId::new());
    next.run(request).await
}

/// Applies the tenant rate limiter ahead of admission's later stages, per
/// spec: a rejected request never reaches the authorizer or an MCP
/// connect. Health-check paths are exempt and never reach this layer
/// because they are not mounted under `/web`.
pub async fn enforce_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.config.rate_limit_enabled {
        return next.run(request).await;
    }

    let class = route_class_for(request.uri().path());
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Ok(bearer) = extract_bearer(header) else {
        // Missing bearer is handled by the Bearer extractor downstream with
        // the correct error shape; don't rate-limit on malformed auth.
        return next.run(request).await;
    };

    let Ok(tenant_id) = derive_tenant_id(bearer, None) else {
        return next.run(request).await;
    };

    let decision = state.rate_limiter.check(&tenant_id, class);
    if decision.allowed {
        return next.run(request).await;
    }

    let request_id = request.extensions().get::<RequestId>().copied();
    let mut response = ApiError {
        error: GatewayError::rate_limited("rate limit exceeded for this tenant and route class"),
        request_id,
    }
    .into_response();

    let reset_epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        + decision.reset_after.as_secs();

    let headers = response.headers_mut();
    headers.insert(
        axum::http::header::RETRY_AFTER,
        decision.reset_after.as_secs().max(1).to_string().parse().unwrap(),
    );
    headers.insert("x-ratelimit-limit", decision.limit.to_string().parse().unwrap());
    headers.insert("x-ratelimit-remaining", "0".parse().unwrap());
    headers.insert("x-ratelimit-reset", reset_epoch.to_string().parse().unwrap());
    response
}

fn route_class_for(path: &str) -> RouteClass {
    if path.ends_with("/servers/validate") {
        RouteClass::Connect
    } else if path.ends_with("/tools/execute") {
        RouteClass::Execute
    } else {
        RouteClass::Other
    }
}
