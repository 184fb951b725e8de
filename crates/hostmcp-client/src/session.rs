//! A single connection to one MCP server: `connect`, the MCP operation
//! proxies, notification/elicitation handler registration, and `close`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hostmcp_protocol::types::{
    ArgumentMap, CallToolResult, Cursor, ElicitRequest, ElicitResult, GetPromptResult,
    ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult, ListToolsResult,
    ReadResourceResult, ServerCapabilities,
};
use hostmcp_protocol::{
    DescriptorTransport, GatewayError, GatewayResult, JsonRpcRequest, RequestId, ServerDescriptor,
};
use hostmcp_transport::{HttpSseTransport, HttpStreamableTransport, McpTransport, TransportKind};
use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use tokio::sync::oneshot;

/// Connection lifecycle. No `Closed -> Live` transition exists; `close()` is
/// idempotent regardless of current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Fresh,
    Connecting,
    Live,
    Closing,
    Closed,
}

/// A boxed handler invoked for every matching notification. Isolated from
/// its siblings: a panicking or erroring handler never blocks dispatch to
/// the next one in the table.
pub type NotificationHandler = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// A boxed handler answering an elicitation request from the server. At
/// most one may be registered at a time; setting a new one replaces it.
pub type ElicitationHandler =
    Arc<dyn Fn(ElicitRequest) -> oneshot::Receiver<ElicitResult> + Send + Sync>;

const STREAMABLE_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// One MCP client session: the per-server connection a [`crate::SessionManager`]
/// owns for the duration of one hosted request.
pub struct McpClientSession {
    http_client: Client,
    descriptor: ServerDescriptor,
    default_timeout: Duration,
    bearer: Option<String>,
    state: Mutex<SessionState>,
    transport: RwLock<Option<Arc<dyn McpTransport>>>,
    capabilities: ServerCapabilities,
    notification_handlers: RwLock<HashMap<String, Vec<NotificationHandler>>>,
    elicitation_handler: RwLock<Option<ElicitationHandler>>,
}

impl std::fmt::Debug for McpClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClientSession")
            .field("state", &*self.state.lock())
            .field("transport_kind", &self.transport.read().as_ref().map(|t| t.kind()))
            .finish_non_exhaustive()
    }
}

impl McpClientSession {
    pub fn new(http_client: Client, descriptor: ServerDescriptor, default_timeout: Duration, bearer: Option<String>) -> Self {
        Self {
            http_client,
            descriptor,
            default_timeout,
            bearer,
            state: Mutex::new(SessionState::Fresh),
            transport: RwLock::new(None),
            capabilities: ServerCapabilities {
                elicitation: Some(serde_json::json!({})),
                ..Default::default()
            },
            notification_handlers: RwLock::new(HashMap::new()),
            elicitation_handler: RwLock::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    pub fn session_id(&self) -> Option<String> {
        self.transport.read().as_ref().and_then(|t| t.session_id())
    }

    /// Try streamable HTTP with a bounded probe, then fall back to SSE with
    /// the full configured timeout. A URL ending in `/sse` swaps the order.
    /// Both failing yields `SERVER_UNREACHABLE` with both reasons joined.
    pub async fn connect(&self) -> GatewayResult<()> {
        if self.descriptor.transport == DescriptorTransport::Stdio {
            return Err(GatewayError::feature_not_supported(
                "stdio transport is not available in hosted mode",
            ));
        }

        {
            let mut state = self.state.lock();
            if *state == SessionState::Live {
                return Ok(());
            }
            if *state == SessionState::Closed || *state == SessionState::Closing {
                return Err(GatewayError::internal("cannot reconnect a closed session"));
            }
            *state = SessionState::Connecting;
        }

        let prefer_sse = self.descriptor.url.path().ends_with("/sse");
        let probe_timeout = STREAMABLE_PROBE_TIMEOUT.min(self.default_timeout);

        let (first, second): (
            (TransportKind, Duration),
            (TransportKind, Duration),
        ) = if prefer_sse {
            (
                (TransportKind::HttpSse, self.default_timeout),
                (TransportKind::HttpStreamable, probe_timeout),
            )
        } else {
            (
                (TransportKind::HttpStreamable, probe_timeout),
                (TransportKind::HttpSse, self.default_timeout),
            )
        };

        let first_err = match self.try_connect(first.0, first.1).await {
            Ok(transport) => {
                *self.transport.write() = Some(transport);
                *self.state.lock() = SessionState::Live;
                return Ok(());
            }
            Err(e) => e,
        };

        let second_err = match self.try_connect(second.0, second.1).await {
            Ok(transport) => {
                *self.transport.write() = Some(transport);
                *self.state.lock() = SessionState::Live;
                return Ok(());
            }
            Err(e) => e,
        };

        *self.state.lock() = SessionState::Closed;
        Err(GatewayError::server_unreachable(format!(
            "{:?} failed ({first_err}); {:?} failed ({second_err})",
            first.0, second.0
        )))
    }

    async fn try_connect(&self, kind: TransportKind, timeout: Duration) -> GatewayResult<Arc<dyn McpTransport>> {
        match kind {
            TransportKind::HttpStreamable => {
                let transport = HttpStreamableTransport::new(
                    self.http_client.clone(),
                    self.descriptor.url.clone(),
                    self.bearer.clone(),
                );
                let init = JsonRpcRequest::new(
                    RequestId::Number(0),
                    "initialize",
                    Some(serde_json::json!({ "protocolVersion": "2025-06-18" })),
                );
                transport.send_request(init, timeout).await?;
                Ok(Arc::new(transport))
            }
            TransportKind::HttpSse => {
                let transport =
                    HttpSseTransport::connect(self.http_client.clone(), self.descriptor.url.clone(), self.bearer.clone())
                        .await?;
                let init = JsonRpcRequest::new(
                    RequestId::Number(0),
                    "initialize",
                    Some(serde_json::json!({ "protocolVersion": "2025-06-18" })),
                );
                transport.send_request(init, timeout).await?;
                Ok(Arc::new(transport))
            }
        }
    }

    fn transport(&self) -> GatewayResult<Arc<dyn McpTransport>> {
        self.transport
            .read()
            .clone()
            .ok_or_else(|| GatewayError::internal("session has no live transport"))
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, method: &str, params: Option<serde_json::Value>) -> GatewayResult<T> {
        let transport = self.transport()?;
        let request = JsonRpcRequest::new(RequestId::from(next_request_id()), method, params);
        let response = transport.send_request(request, self.default_timeout).await?;
        let result = response.into_result()?;
        serde_json::from_value(result)
            .map_err(|e| GatewayError::internal(format!("unexpected shape for {method}: {e}")))
    }

    pub async fn list_tools(&self, cursor: Option<Cursor>) -> GatewayResult<ListToolsResult> {
        self.call("tools/list", Some(serde_json::json!({ "cursor": cursor }))).await
    }

    pub async fn execute_tool(&self, name: &str, arguments: ArgumentMap) -> GatewayResult<CallToolResult> {
        self.call(
            "tools/call",
            Some(serde_json::json!({ "name": name, "arguments": arguments })),
        )
        .await
    }

    pub async fn list_resources(&self, cursor: Option<Cursor>) -> GatewayResult<ListResourcesResult> {
        self.call("resources/list", Some(serde_json::json!({ "cursor": cursor }))).await
    }

    pub async fn read_resource(&self, uri: &str) -> GatewayResult<ReadResourceResult> {
        self.call("resources/read", Some(serde_json::json!({ "uri": uri }))).await
    }

    pub async fn subscribe_resource(&self, uri: &str) -> GatewayResult<()> {
        self.call("resources/subscribe", Some(serde_json::json!({ "uri": uri }))).await
    }

    pub async fn unsubscribe_resource(&self, uri: &str) -> GatewayResult<()> {
        self.call("resources/unsubscribe", Some(serde_json::json!({ "uri": uri }))).await
    }

    pub async fn list_resource_templates(&self, cursor: Option<Cursor>) -> GatewayResult<ListResourceTemplatesResult> {
        self.call(
            "resources/templates/list",
            Some(serde_json::json!({ "cursor": cursor })),
        )
        .await
    }

    pub async fn list_prompts(&self, cursor: Option<Cursor>) -> GatewayResult<ListPromptsResult> {
        self.call("prompts/list", Some(serde_json::json!({ "cursor": cursor }))).await
    }

    pub async fn get_prompt(&self, name: &str, arguments: ArgumentMap) -> GatewayResult<GetPromptResult> {
        self.call(
            "prompts/get",
            Some(serde_json::json!({ "name": name, "arguments": arguments })),
        )
        .await
    }

    /// Register a handler for notifications whose `method` equals `schema`.
    /// Handlers run in insertion order; dispatch is the caller's
    /// responsibility once a notification has been received off the wire.
    pub fn set_notification_handler(&self, schema: impl Into<String>, handler: NotificationHandler) {
        self.notification_handlers
            .write()
            .entry(schema.into())
            .or_default()
            .push(handler);
    }

    pub fn dispatch_notification(&self, method: &str, params: serde_json::Value) {
        let handlers = self.notification_handlers.read();
        if let Some(list) = handlers.get(method) {
            for handler in list {
                handler(params.clone());
            }
        }
    }

    /// Replaces any previously registered elicitation handler.
    pub fn set_elicitation_handler(&self, handler: ElicitationHandler) {
        *self.elicitation_handler.write() = Some(handler);
    }

    /// Idempotent: closing an already-closed or never-connected session is a
    /// no-op success.
    pub async fn close(&self) -> GatewayResult<()> {
        let should_close = {
            let mut state = self.state.lock();
            if *state == SessionState::Closed {
                false
            } else {
                *state = SessionState::Closing;
                true
            }
        };

        if should_close {
            let taken = self.transport.write().take();
            if let Some(transport) = taken {
                transport.close().await?;
            }
            *self.state.lock() = SessionState::Closed;
        }
        Ok(())
    }
}

fn next_request_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(url: &str) -> ServerDescriptor {
        ServerDescriptor {
            transport: DescriptorTransport::Http,
            url: url::Url::parse(url).unwrap(),
            headers: HashMap::new(),
            use_oauth: false,
        }
    }

    #[tokio::test]
    async fn stdio_descriptor_is_rejected_before_any_transport_attempt() {
        let session = McpClientSession::new(
            Client::new(),
            ServerDescriptor {
                transport: DescriptorTransport::Stdio,
                ..descriptor("https://example.invalid/mcp")
            },
            Duration::from_secs(5),
            None,
        );
        let err = session.connect().await.unwrap_err();
        assert_eq!(err.code, hostmcp_protocol::ErrorCode::FeatureNotSupported);
        assert_eq!(session.state(), SessionState::Fresh);
    }

    #[tokio::test]
    async fn close_before_connect_is_a_no_op() {
        let session = McpClientSession::new(Client::new(), descriptor("https://example.invalid/mcp"), Duration::from_secs(5), None);
        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        // Closing again must not panic or error.
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn reconnect_after_close_is_rejected() {
        let session = McpClientSession::new(Client::new(), descriptor("https://example.invalid/mcp"), Duration::from_secs(5), None);
        session.close().await.unwrap();
        let err = session.connect().await.unwrap_err();
        assert_eq!(err.code, hostmcp_protocol::ErrorCode::InternalError);
    }

    #[test]
    fn capabilities_always_advertise_elicitation() {
        let session = McpClientSession::new(Client::new(), descriptor("https://example.invalid/mcp"), Duration::from_secs(5), None);
        assert!(session.capabilities().elicitation.is_some());
    }
}
