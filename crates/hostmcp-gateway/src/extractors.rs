//! Axum extractors for the two things every `/web/*` handler needs before
//! it can do anything else: the caller's bearer token and this request's id.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error_response::ApiError;
use crate::request_context::RequestId;
use crate::tenant::extract_bearer;

/// The raw bearer token, extracted and validated for shape (but never
/// signature-checked) before a handler runs.
pub struct Bearer(pub String);

impl<S> FromRequestParts<S> for Bearer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts.extensions.get::<RequestId>().copied();
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = extract_bearer(header).map_err(|error| ApiError { error, request_id })?;
        Ok(Bearer(token.to_string()))
    }
}
