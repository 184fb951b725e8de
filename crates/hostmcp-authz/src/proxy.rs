//! `POST /web/oauth/proxy` forwarding. The browser cannot reach third-party
//! OAuth token/metadata endpoints directly due to CORS, so it asks the
//! gateway to make the request on its behalf. The gateway strips anything
//! that would let the caller smuggle a different destination or hop-by-hop
//! semantics through, then passes the response back close to verbatim.

use std::collections::HashMap;

use hostmcp_protocol::{GatewayError, GatewayResult};
use reqwest::Client;

use crate::ssrf::validate_https_url;

/// Headers never forwarded to the target: connection-management headers
/// that only make sense between the browser and this gateway, plus `Host`,
/// which must reflect the target, not the original request.
const STRIPPED_REQUEST_HEADERS: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "cookie",
];

pub struct ProxyRequest {
    pub target_url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

pub struct ProxyResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Forward one OAuth proxy call. Rejects any `target_url` that is not an
/// absolute `https://` URL before a connection is attempted.
pub async fn forward_oauth_request(client: &Client, request: ProxyRequest) -> GatewayResult<ProxyResponse> {
    let target = validate_https_url(&request.target_url)
        .map_err(|e| GatewayError::validation(format!("invalid oauth proxy target: {e}")))?;

    let method = request
        .method
        .parse::<reqwest::Method>()
        .map_err(|_| GatewayError::validation(format!("unsupported http method: {}", request.method)))?;

    let mut builder = client.request(method, target);
    for (name, value) in &request.headers {
        if STRIPPED_REQUEST_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
            continue;
        }
        builder = builder.header(name, value);
    }
    if !request.body.is_empty() {
        builder = builder.body(request.body);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| GatewayError::server_unreachable(format!("oauth target unreachable: {e}")))?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response
        .bytes()
        .await
        .map_err(|e| GatewayError::server_unreachable(format!("failed reading oauth target response: {e}")))?
        .to_vec();

    Ok(ProxyResponse {
        status,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_https_target_before_connecting() {
        let client = Client::new();
        let request = ProxyRequest {
            target_url: "http://auth.example.com/token".to_string(),
            method: "POST".to_string(),
            headers: HashMap::new(),
            body: Vec::new(),
        };
        let err = forward_oauth_request(&client, request).await.unwrap_err();
        assert_eq!(err.code, hostmcp_protocol::ErrorCode::ValidationError);
    }

    #[test]
    fn strip_list_includes_host_and_hop_by_hop_headers() {
        for header in ["host", "connection", "transfer-encoding", "cookie"] {
            assert!(STRIPPED_REQUEST_HEADERS.contains(&header));
        }
    }
}
