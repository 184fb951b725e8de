//! Legacy HTTP+SSE transport. A GET stream carries server-to-client
//! messages; the very first thing the server must send is an `endpoint`
//! event naming the URL requests get POSTed to. A background task owns the
//! stream and dispatches responses to whichever `send_request` call is
//! waiting for that id.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::StreamExt;
use hostmcp_protocol::{GatewayError, GatewayResult, JsonRpcRequest, JsonRpcResponse, RequestId};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use url::Url;

use crate::sse_parser::SseParser;
use crate::traits::{BoxFuture, McpTransport, TransportKind};

struct Shared {
    post_endpoint: parking_lot::Mutex<Option<Url>>,
    endpoint_ready: Notify,
    pending: DashMap<RequestId, oneshot::Sender<JsonRpcResponse>>,
}

#[derive(Debug)]
pub struct HttpSseTransport {
    client: Client,
    bearer: Option<String>,
    shared: Arc<Shared>,
    reader_task: JoinHandle<()>,
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared").finish_non_exhaustive()
    }
}

impl HttpSseTransport {
    /// Open the SSE stream and start the background reader. Returns once the
    /// stream connection itself is established; callers should await
    /// `wait_for_endpoint` (implicitly done inside `send_request`) before
    /// relying on `session_id`/posting.
    pub async fn connect(client: Client, sse_url: Url, bearer: Option<String>) -> GatewayResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        if let Some(bearer) = &bearer {
            let value = HeaderValue::from_str(&format!("Bearer {bearer}"))
                .map_err(|e| GatewayError::internal(format!("invalid bearer header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let response = client
            .get(sse_url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| GatewayError::server_unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::server_unreachable(format!(
                "sse endpoint responded with status {}",
                response.status()
            )));
        }

        let shared = Arc::new(Shared {
            post_endpoint: parking_lot::Mutex::new(None),
            endpoint_ready: Notify::new(),
            pending: DashMap::new(),
        });

        let reader_shared = shared.clone();
        let base_url = response.url().clone();
        let reader_task = tokio::spawn(async move {
            let mut parser = SseParser::new();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let Ok(chunk) = chunk else { break };
                for event in parser.feed(&chunk) {
                    dispatch_event(&reader_shared, &base_url, event);
                }
            }
        });

        Ok(Self {
            client,
            bearer,
            shared,
            reader_task,
        })
    }

    async fn wait_for_endpoint(&self, timeout: Duration) -> GatewayResult<Url> {
        if let Some(url) = self.shared.post_endpoint.lock().clone() {
            return Ok(url);
        }
        tokio::time::timeout(timeout, self.shared.endpoint_ready.notified())
            .await
            .map_err(|_| GatewayError::timeout("mcp server never sent an sse endpoint event"))?;
        self.shared
            .post_endpoint
            .lock()
            .clone()
            .ok_or_else(|| GatewayError::internal("endpoint notified but not set"))
    }
}

fn dispatch_event(shared: &Shared, base_url: &Url, event: crate::sse_parser::SseEvent) {
    match event.event.as_deref() {
        Some("endpoint") => {
            if let Ok(url) = base_url.join(event.data.trim()) {
                *shared.post_endpoint.lock() = Some(url);
                shared.endpoint_ready.notify_waiters();
            }
        }
        _ => {
            let Ok(response) = serde_json::from_str::<JsonRpcResponse>(&event.data) else {
                return;
            };
            if let Some(id) = response.id.clone() {
                if let Some((_, sender)) = shared.pending.remove(&id) {
                    let _ = sender.send(response);
                }
            }
        }
    }
}

impl McpTransport for HttpSseTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::HttpSse
    }

    fn session_id(&self) -> Option<String> {
        // Legacy SSE carries no session header; the endpoint URL itself
        // scopes the conversation.
        None
    }

    fn send_request(
        &self,
        request: JsonRpcRequest,
        timeout: Duration,
    ) -> BoxFuture<'_, GatewayResult<JsonRpcResponse>> {
        Box::pin(async move {
            let endpoint = self.wait_for_endpoint(timeout).await?;
            let (tx, rx) = oneshot::channel();
            self.shared.pending.insert(request.id.clone(), tx);

            let mut builder = self.client.post(endpoint).json(&request);
            if let Some(bearer) = &self.bearer {
                builder = builder.bearer_auth(bearer);
            }

            let send_result = builder.timeout(timeout).send().await;
            if let Err(e) = send_result {
                self.shared.pending.remove(&request.id);
                return Err(GatewayError::server_unreachable(e.to_string()));
            }

            tokio::time::timeout(timeout, rx).await.map_err(|_| {
                self.shared.pending.remove(&request.id);
                GatewayError::timeout("timed out waiting for sse-correlated response")
            })?
            .map_err(|_| GatewayError::internal("sse reader task dropped the response channel"))
        })
    }

    fn send_notification(
        &self,
        method: String,
        params: Option<serde_json::Value>,
    ) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            let endpoint = self.wait_for_endpoint(Duration::from_secs(10)).await?;
            let body = serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
            });
            let mut builder = self.client.post(endpoint).json(&body);
            if let Some(bearer) = &self.bearer {
                builder = builder.bearer_auth(bearer);
            }
            builder
                .send()
                .await
                .map_err(|e| GatewayError::server_unreachable(e.to_string()))?;
            Ok(())
        })
    }

    fn close(&self) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            self.reader_task.abort();
            Ok(())
        })
    }
}
