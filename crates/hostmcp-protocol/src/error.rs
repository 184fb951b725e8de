//! The gateway's single error taxonomy. Every error that can reach an HTTP
//! boundary is, or is mapped into, a [`GatewayError`] — one `code`, one
//! `message`, one `http_status`. No other error shape is ever produced.

use serde::{Deserialize, Serialize};

/// Closed set of error codes the gateway ever emits (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    ValidationError,
    RateLimited,
    FeatureNotSupported,
    ServerUnreachable,
    Timeout,
    InternalError,
}

impl ErrorCode {
    /// The HTTP status this code is always rendered with.
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::ValidationError | Self::FeatureNotSupported => 400,
            Self::RateLimited => 429,
            Self::ServerUnreachable => 502,
            Self::Timeout => 504,
            Self::InternalError => 500,
        }
    }
}

/// The wire shape of every gateway error response: `{"code", "message"}`,
/// with `request_id` threaded through for log correlation (spec §10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// The gateway's internal error type. Every fallible operation in this
/// workspace returns `GatewayResult<T>`; route handlers convert the error
/// into an [`ErrorReport`] and the matching HTTP status at the boundary.
#[derive(Debug, thiserror::Error, Clone)]
#[error("{code:?}: {message}")]
pub struct GatewayError {
    pub code: ErrorCode,
    pub message: String,
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RateLimited, message)
    }

    pub fn feature_not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::FeatureNotSupported, message)
    }

    pub fn server_unreachable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServerUnreachable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// A JSON-RPC error returned by an MCP peer. Application-level JSON-RPC
    /// errors surface as tool results, not HTTP errors (spec §7), so this is
    /// only reached for protocol-level failures (malformed responses, etc.)
    /// and is conservatively mapped to `INTERNAL_ERROR`.
    pub fn mcp_rpc(code: i64, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, format!("mcp error {code}: {}", message.into()))
    }

    pub fn into_report(self, request_id: Option<String>) -> ErrorReport {
        ErrorReport {
            code: self.code,
            message: self.message,
            request_id,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert_eq!(ErrorCode::Unauthorized.http_status(), 401);
        assert_eq!(ErrorCode::Forbidden.http_status(), 403);
        assert_eq!(ErrorCode::NotFound.http_status(), 404);
        assert_eq!(ErrorCode::ValidationError.http_status(), 400);
        assert_eq!(ErrorCode::RateLimited.http_status(), 429);
        assert_eq!(ErrorCode::FeatureNotSupported.http_status(), 400);
        assert_eq!(ErrorCode::ServerUnreachable.http_status(), 502);
        assert_eq!(ErrorCode::Timeout.http_status(), 504);
        assert_eq!(ErrorCode::InternalError.http_status(), 500);
    }

    #[test]
    fn report_serializes_to_code_and_message_only_without_request_id() {
        let err = GatewayError::validation("bad field");
        let report = err.into_report(None);
        let json = serde_json::to_value(&report).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["code"], "VALIDATION_ERROR");
        assert_eq!(obj["message"], "bad field");
    }
}
