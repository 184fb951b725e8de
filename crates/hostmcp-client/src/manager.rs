//! Per-request multi-server session manager. Constructed once per hosted
//! request with the set of servers that request needs; begins connecting
//! all of them the moment it is built and never outlives the request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use hostmcp_protocol::{GatewayError, GatewayResult, ServerDescriptor};
use reqwest::Client;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::session::{McpClientSession, SessionState};

pub type SessionKey = String;

/// One server a manager instance should hold a session for.
pub struct SessionEntry {
    pub key: SessionKey,
    pub descriptor: ServerDescriptor,
    pub timeout: Duration,
}

/// Per-request manager over a fixed set of MCP server sessions. `new()`
/// kicks off every connect concurrently without blocking; callers that need
/// a particular server await [`Self::ensure_connected`], which returns the
/// live session, waits on the in-flight connect, or discovers it already
/// failed — never starting a second concurrent connect for the same key.
pub struct SessionManager {
    sessions: HashMap<SessionKey, Arc<McpClientSession>>,
    connect_handles: DashMap<SessionKey, JoinHandle<GatewayResult<()>>>,
    connect_done: DashMap<SessionKey, Arc<Notify>>,
}

impl SessionManager {
    pub fn new(http_client: Client, bearer: Option<String>, entries: Vec<SessionEntry>) -> Self {
        let mut sessions = HashMap::with_capacity(entries.len());
        let connect_handles = DashMap::with_capacity(entries.len());
        let connect_done = DashMap::with_capacity(entries.len());

        for entry in entries {
            let session = Arc::new(McpClientSession::new(
                http_client.clone(),
                entry.descriptor,
                entry.timeout,
                bearer.clone(),
            ));
            sessions.insert(entry.key.clone(), session.clone());

            let notify = Arc::new(Notify::new());
            connect_done.insert(entry.key.clone(), notify.clone());

            let handle = tokio::spawn(async move {
                let result = session.connect().await;
                notify.notify_waiters();
                result
            });
            connect_handles.insert(entry.key, handle);
        }

        Self {
            sessions,
            connect_handles,
            connect_done,
        }
    }

    /// Returns the live session for `key`: immediately if already live,
    /// after awaiting the in-flight connect if one owns this key, or after
    /// waiting on the completion notification if another caller already
    /// claimed the handle.
    pub async fn ensure_connected(&self, key: &str) -> GatewayResult<Arc<McpClientSession>> {
        let session = self
            .sessions
            .get(key)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("unknown server id: {key}")))?;

        if session.state() == SessionState::Live {
            return Ok(session);
        }

        if let Some((_, handle)) = self.connect_handles.remove(key) {
            handle
                .await
                .map_err(|e| GatewayError::internal(format!("connect task for {key} panicked: {e}")))??;
            return Ok(session);
        }

        if let Some(notify) = self.connect_done.get(key).map(|n| n.clone()) {
            notify.notified().await;
        }

        if session.state() == SessionState::Live {
            Ok(session)
        } else {
            Err(GatewayError::server_unreachable(format!(
                "connect for server {key} did not succeed"
            )))
        }
    }

    /// Awaits every still-pending connect without returning a ready session;
    /// used to gather the combined tool set once all servers the chat
    /// executor needs have had a chance to connect.
    pub async fn ensure_all_connected(&self) -> Vec<(SessionKey, GatewayResult<Arc<McpClientSession>>)> {
        let keys: Vec<SessionKey> = self.sessions.keys().cloned().collect();
        join_all(keys.into_iter().map(|key| async move {
            let result = self.ensure_connected(&key).await;
            (key, result)
        }))
        .await
    }

    pub fn session_keys(&self) -> impl Iterator<Item = &SessionKey> {
        self.sessions.keys()
    }

    /// Best-effort, concurrent, idempotent: closes every session this
    /// manager holds and logs (but does not propagate) individual close
    /// failures. Safe to call more than once or on a manager whose connects
    /// never completed.
    pub async fn disconnect_all_servers(&self) {
        let sessions: Vec<Arc<McpClientSession>> = self.sessions.values().cloned().collect();
        join_all(sessions.iter().map(|session| async move {
            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "failed to close mcp session during teardown");
            }
        }))
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostmcp_protocol::DescriptorTransport;

    fn descriptor() -> ServerDescriptor {
        ServerDescriptor {
            transport: DescriptorTransport::Http,
            url: url::Url::parse("https://example.invalid/mcp").unwrap(),
            headers: HashMap::new(),
            use_oauth: false,
        }
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let manager = SessionManager::new(Client::new(), None, vec![]);
        let err = manager.ensure_connected("missing").await.unwrap_err();
        assert_eq!(err.code, hostmcp_protocol::ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn disconnect_all_servers_is_idempotent_on_an_empty_manager() {
        let manager = SessionManager::new(Client::new(), None, vec![]);
        manager.disconnect_all_servers().await;
        manager.disconnect_all_servers().await;
    }

    #[tokio::test]
    async fn unreachable_server_surfaces_as_server_unreachable_not_a_panic() {
        let manager = SessionManager::new(
            Client::new(),
            None,
            vec![SessionEntry {
                key: "primary".into(),
                descriptor: descriptor(),
                timeout: Duration::from_millis(50),
            }],
        );
        let err = manager.ensure_connected("primary").await.unwrap_err();
        assert_eq!(err.code, hostmcp_protocol::ErrorCode::ServerUnreachable);
    }
}
