//! The single place a [`GatewayError`] becomes an HTTP response. Every route
//! handler returns `GatewayResult<T>`; axum dispatches the error variant
//! here rather than each handler hand-rolling a status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hostmcp_protocol::GatewayError;

use crate::request_context::RequestId;

/// Wraps a [`GatewayError`] with the request id of the request that raised
/// it, so the envelope returned to the caller matches the log line an
/// operator would search for.
pub struct ApiError {
    pub error: GatewayError,
    pub request_id: Option<RequestId>,
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self {
            error,
            request_id: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let report = self.error.into_report(self.request_id.map(|id| id.to_string()));
        tracing::warn!(code = ?report.code, message = %report.message, "request failed");
        (status, Json(report)).into_response()
    }
}
