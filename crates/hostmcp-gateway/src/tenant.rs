//! Tenant id derivation. The gateway never verifies the bearer JWT's
//! signature — the policy service is the sole authority on whether a token
//! is valid at all. This module only reads the `sub` claim, purely to have
//! a rate-limit and logging key *before* the policy service has been asked
//! anything.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hostmcp_protocol::{GatewayError, GatewayResult, TenantId};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct UnverifiedClaims {
    sub: Option<String>,
}

/// Extract the bearer token from an `Authorization` header value.
pub fn extract_bearer(header_value: Option<&str>) -> GatewayResult<&str> {
    let value = header_value.ok_or_else(|| GatewayError::unauthorized("missing authorization header"))?;
    value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| GatewayError::unauthorized("malformed authorization header"))
}

/// Tenant id: the caller-supplied workspace id if present, else the
/// unverified `sub` claim of the bearer JWT's payload segment.
pub fn derive_tenant_id(bearer: &str, workspace_id: Option<&str>) -> GatewayResult<TenantId> {
    if let Some(workspace_id) = workspace_id.filter(|w| !w.is_empty()) {
        return Ok(workspace_id.to_string());
    }

    let payload_segment = bearer
        .split('.')
        .nth(1)
        .ok_or_else(|| GatewayError::unauthorized("malformed bearer token"))?;

    let decoded = URL_SAFE_NO_PAD
        .decode(payload_segment)
        .map_err(|_| GatewayError::unauthorized("malformed bearer token payload"))?;

    let claims: UnverifiedClaims =
        serde_json::from_slice(&decoded).map_err(|_| GatewayError::unauthorized("malformed bearer token claims"))?;

    claims
        .sub
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GatewayError::unauthorized("bearer token has no subject claim"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_segment(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }

    #[test]
    fn extracts_bearer_from_valid_header() {
        assert_eq!(extract_bearer(Some("Bearer abc123")).unwrap(), "abc123");
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let err = extract_bearer(None).unwrap_err();
        assert_eq!(err.code, hostmcp_protocol::ErrorCode::Unauthorized);
    }

    #[test]
    fn workspace_id_takes_precedence_over_token_subject() {
        let header = encode_segment(r#"{"sub":"user-1"}"#);
        let token = format!("h.{header}.s");
        assert_eq!(derive_tenant_id(&token, Some("ws-explicit")).unwrap(), "ws-explicit");
    }

    #[test]
    fn falls_back_to_unverified_subject_claim() {
        let header = encode_segment(r#"{"sub":"user-42"}"#);
        let token = format!("h.{header}.s");
        assert_eq!(derive_tenant_id(&token, None).unwrap(), "user-42");
    }

    #[test]
    fn missing_subject_claim_is_unauthorized() {
        let header = encode_segment(r#"{"aud":"x"}"#);
        let token = format!("h.{header}.s");
        let err = derive_tenant_id(&token, None).unwrap_err();
        assert_eq!(err.code, hostmcp_protocol::ErrorCode::Unauthorized);
    }
}
