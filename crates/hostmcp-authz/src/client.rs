//! Calls the external policy service to turn a (workspace, server) pair the
//! caller asked for into a [`ServerDescriptor`] the gateway is allowed to
//! connect to. Never inspects or validates the bearer token itself — that
//! is the policy service's job, proven by it returning 200 at all.

use hostmcp_protocol::{DescriptorTransport, GatewayError, GatewayResult, ServerDescriptor};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct AuthorizeResponse {
    transport: DescriptorTransport,
    url: String,
    #[serde(default)]
    headers: std::collections::HashMap<String, String>,
    #[serde(rename = "useOauth", default)]
    use_oauth: bool,
}

/// What the policy service reports for a resolved share token: which
/// (workspace, server) pair the token grants restricted access to, and
/// whether the browser needs to run the MCP OAuth dance before chatting.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareResolution {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    #[serde(rename = "serverId")]
    pub server_id: String,
    #[serde(rename = "useOauth", default)]
    pub use_oauth: bool,
}

pub struct AuthorizerClient {
    http_client: Client,
    policy_base_url: Url,
}

impl AuthorizerClient {
    pub fn new(http_client: Client, policy_base_url: Url) -> Self {
        Self {
            http_client,
            policy_base_url,
        }
    }

    /// Ask the policy service whether `bearer` may reach `server_id` within
    /// `workspace_id`. A transport other than `Http`/`HttpSse` in the
    /// response is rejected here, before a session manager ever sees it.
    pub async fn authorize(
        &self,
        bearer: &str,
        workspace_id: &str,
        server_id: &str,
    ) -> GatewayResult<ServerDescriptor> {
        let endpoint = self
            .policy_base_url
            .join("authorize")
            .map_err(|e| GatewayError::internal(format!("invalid policy service base url: {e}")))?;

        let response = self
            .http_client
            .post(endpoint)
            .bearer_auth(bearer)
            .json(&serde_json::json!({
                "workspaceId": workspace_id,
                "serverId": server_id,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::server_unreachable(format!("policy service unreachable: {e}")))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::unauthorized("policy service rejected the bearer token"));
        }
        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(GatewayError::forbidden(format!(
                "workspace {workspace_id} is not authorized for server {server_id}"
            )));
        }
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found(format!("server {server_id} not found")));
        }
        if !response.status().is_success() {
            return Err(GatewayError::server_unreachable(format!(
                "policy service responded with status {}",
                response.status()
            )));
        }

        let parsed: AuthorizeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::internal(format!("malformed policy service response: {e}")))?;

        if parsed.transport == DescriptorTransport::Stdio {
            return Err(GatewayError::feature_not_supported(
                "stdio transport is not available in hosted mode",
            ));
        }

        let url = Url::parse(&parsed.url)
            .map_err(|e| GatewayError::internal(format!("policy service returned an invalid server url: {e}")))?;

        Ok(ServerDescriptor {
            transport: parsed.transport,
            url,
            headers: parsed.headers,
            use_oauth: parsed.use_oauth,
        })
    }

    /// Resolves a share token into the (workspace, server) pair it grants
    /// restricted access to. The token itself carries no bearer semantics;
    /// the caller still authenticates separately for every MCP operation
    /// that follows.
    pub async fn resolve_share_token(&self, token: &str) -> GatewayResult<ShareResolution> {
        let endpoint = self
            .policy_base_url
            .join("share/resolve")
            .map_err(|e| GatewayError::internal(format!("invalid policy service base url: {e}")))?;

        let response = self
            .http_client
            .post(endpoint)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .map_err(|e| GatewayError::server_unreachable(format!("policy service unreachable: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found("share token not found or expired"));
        }
        if !response.status().is_success() {
            return Err(GatewayError::server_unreachable(format!(
                "policy service responded with status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::internal(format!("malformed share-resolve response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn rejects_stdio_transport_from_policy_service() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authorize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transport": "stdio",
                "url": "stdio://local",
            })))
            .mount(&server)
            .await;

        let client = AuthorizerClient::new(Client::new(), Url::parse(&server.uri()).unwrap().join("/").unwrap());
        let err = client.authorize("token", "ws1", "srv1").await.unwrap_err();
        assert_eq!(err.code, hostmcp_protocol::ErrorCode::FeatureNotSupported);
    }

    #[tokio::test]
    async fn maps_network_failure_to_server_unreachable() {
        let client = AuthorizerClient::new(Client::new(), Url::parse("http://127.0.0.1:1").unwrap());
        let err = client.authorize("token", "ws1", "srv1").await.unwrap_err();
        assert_eq!(err.code, hostmcp_protocol::ErrorCode::ServerUnreachable);
    }

    #[tokio::test]
    async fn forbidden_response_maps_to_forbidden() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authorize"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = AuthorizerClient::new(Client::new(), Url::parse(&server.uri()).unwrap());
        let err = client.authorize("token", "ws1", "srv1").await.unwrap_err();
        assert_eq!(err.code, hostmcp_protocol::ErrorCode::Forbidden);
    }
}
