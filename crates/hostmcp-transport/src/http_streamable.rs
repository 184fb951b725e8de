//! Streamable HTTP transport: every request is a standalone POST to one
//! endpoint. The server may reply with a plain JSON body or a single SSE
//! event carrying the same payload; either way a request gets exactly one
//! correlated response back here.

use std::time::Duration;

use futures::StreamExt;
use hostmcp_protocol::{GatewayError, GatewayResult, JsonRpcRequest, JsonRpcResponse};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use url::Url;

use crate::sse_parser::SseParser;
use crate::traits::{BoxFuture, McpTransport, TransportKind};

const SESSION_HEADER: &str = "Mcp-Session-Id";

#[derive(Debug)]
pub struct HttpStreamableTransport {
    client: Client,
    endpoint: Url,
    bearer: Option<String>,
    session_id: Mutex<Option<String>>,
}

impl HttpStreamableTransport {
    /// Probe the endpoint with an `initialize`-shaped request is the caller's
    /// job (see `hostmcp-client`); this constructor only wires up the HTTP
    /// plumbing. A fresh transport has no session id until the first
    /// response supplies one.
    pub fn new(client: Client, endpoint: Url, bearer: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            bearer,
            session_id: Mutex::new(None),
        }
    }

    fn request_headers(&self) -> GatewayResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(session_id) = self.session_id.lock().clone() {
            let value = HeaderValue::from_str(&session_id)
                .map_err(|e| GatewayError::internal(format!("invalid session id header: {e}")))?;
            headers.insert(SESSION_HEADER, value);
        }
        if let Some(bearer) = &self.bearer {
            let value = HeaderValue::from_str(&format!("Bearer {bearer}"))
                .map_err(|e| GatewayError::internal(format!("invalid bearer header: {e}")))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn capture_session_id(&self, headers: &reqwest::header::HeaderMap) {
        if let Some(value) = headers.get(SESSION_HEADER) {
            if let Ok(s) = value.to_str() {
                *self.session_id.lock() = Some(s.to_string());
            }
        }
    }

    async fn post(&self, body: serde_json::Value, timeout: Duration) -> GatewayResult<Option<JsonRpcResponse>> {
        let headers = self.request_headers()?;
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        self.capture_session_id(response.headers());

        if response.status() == reqwest::StatusCode::ACCEPTED {
            // Notification accepted, no body expected.
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(GatewayError::server_unreachable(format!(
                "mcp server responded with status {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type.starts_with("text/event-stream") {
            self.read_single_sse_response(response).await.map(Some)
        } else {
            let payload: JsonRpcResponse = response
                .json()
                .await
                .map_err(|e| GatewayError::internal(format!("malformed json-rpc body: {e}")))?;
            Ok(Some(payload))
        }
    }

    async fn read_single_sse_response(&self, response: reqwest::Response) -> GatewayResult<JsonRpcResponse> {
        let mut parser = SseParser::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_err)?;
            for event in parser.feed(&chunk) {
                if event.data.is_empty() {
                    continue;
                }
                let payload: JsonRpcResponse = serde_json::from_str(&event.data)
                    .map_err(|e| GatewayError::internal(format!("malformed sse json-rpc body: {e}")))?;
                return Ok(payload);
            }
        }
        Err(GatewayError::server_unreachable(
            "mcp server closed the stream before sending a response",
        ))
    }
}

fn map_reqwest_err(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::timeout(err.to_string())
    } else {
        GatewayError::server_unreachable(err.to_string())
    }
}

impl McpTransport for HttpStreamableTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::HttpStreamable
    }

    fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    fn send_request(
        &self,
        request: JsonRpcRequest,
        timeout: Duration,
    ) -> BoxFuture<'_, GatewayResult<JsonRpcResponse>> {
        Box::pin(async move {
            let body = serde_json::to_value(&request)
                .map_err(|e| GatewayError::internal(format!("failed to encode request: {e}")))?;
            match self.post(body, timeout).await? {
                Some(response) => Ok(response),
                None => Err(GatewayError::internal(
                    "mcp server accepted a request as if it were a notification",
                )),
            }
        })
    }

    fn send_notification(
        &self,
        method: String,
        params: Option<serde_json::Value>,
    ) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            let body = serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
            });
            self.post(body, Duration::from_secs(10)).await?;
            Ok(())
        })
    }

    fn close(&self) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move { Ok(()) })
    }
}
