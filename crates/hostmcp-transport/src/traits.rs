use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use hostmcp_protocol::{GatewayResult, JsonRpcRequest, JsonRpcResponse};

/// The two transports the gateway is willing to speak to a hosted MCP
/// server over. `Stdio` is deliberately not a variant here: hosted mode
/// never spawns a child process (spec Non-goal (d)); the authorizer client
/// rejects a `stdio` server descriptor before a transport is ever chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    HttpStreamable,
    HttpSse,
}

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single connection to one MCP server. Object-safe so a [`McpClientSession`]
/// can hold whichever transport actually completed the handshake without the
/// caller needing to know in advance which one that was.
///
/// [`McpClientSession`]: ../hostmcp_client/struct.McpClientSession.html
pub trait McpTransport: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> TransportKind;

    /// Present only for streamable HTTP, once the server has assigned one.
    fn session_id(&self) -> Option<String>;

    /// Send a single JSON-RPC request and await its correlated response.
    fn send_request(
        &self,
        request: JsonRpcRequest,
        timeout: Duration,
    ) -> BoxFuture<'_, GatewayResult<JsonRpcResponse>>;

    /// Send a one-way JSON-RPC notification (no response expected).
    fn send_notification(
        &self,
        method: String,
        params: Option<serde_json::Value>,
    ) -> BoxFuture<'_, GatewayResult<()>>;

    /// Tear down the underlying connection. Idempotent.
    fn close(&self) -> BoxFuture<'_, GatewayResult<()>>;
}
