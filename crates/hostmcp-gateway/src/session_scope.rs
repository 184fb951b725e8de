//! The Request-Scoped Session Pattern shared by every single-shot route
//! handler: authorize every named server, build a manager bound to exactly
//! this call, run the operation, and guarantee teardown on every exit path
//! — including a panic unwinding through the handler.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use hostmcp_client::{SessionEntry, SessionManager};
use hostmcp_protocol::{DescriptorTransport, GatewayError, GatewayResult, ServerDescriptor};

use crate::state::AppState;

/// Authorizes every `server_ids` entry in parallel and, for any descriptor
/// declaring `use_oauth`, requires a matching entry in `oauth_tokens` — a
/// missing token is `UNAUTHORIZED`, never silently dropped.
pub async fn authorize_all(
    state: &AppState,
    bearer: &str,
    workspace_id: &str,
    server_ids: &[String],
    oauth_tokens: &HashMap<String, String>,
) -> GatewayResult<Vec<SessionEntry>> {
    let authorized: Vec<GatewayResult<(String, ServerDescriptor)>> = join_all(server_ids.iter().map(|server_id| async move {
        let descriptor = state.authorizer.authorize(bearer, workspace_id, server_id).await?;
        Ok((server_id.clone(), descriptor))
    }))
    .await;

    let mut entries = Vec::with_capacity(authorized.len());
    for result in authorized {
        let (server_id, descriptor) = result?;

        if descriptor.use_oauth && !oauth_tokens.contains_key(&server_id) {
            return Err(GatewayError::unauthorized(format!(
                "server {server_id} requires an oauth access token"
            )));
        }
        if descriptor.transport == DescriptorTransport::Stdio {
            return Err(GatewayError::feature_not_supported("hosted cannot spawn subprocesses"));
        }

        entries.push(SessionEntry {
            key: server_id,
            descriptor,
            timeout: state.config.call_timeout,
        });
    }

    Ok(entries)
}

/// Runs `op` against a fresh, request-scoped [`SessionManager`] built from
/// `entries`, guaranteeing `disconnect_all_servers` fires on every exit
/// path: normal return, an error from `op`, or a panic unwinding through
/// this function.
pub async fn with_request_scoped_sessions<F, Fut, T>(
    state: &AppState,
    bearer: &str,
    entries: Vec<SessionEntry>,
    op: F,
) -> GatewayResult<T>
where
    F: FnOnce(Arc<SessionManager>) -> Fut,
    Fut: Future<Output = GatewayResult<T>>,
{
    let manager = Arc::new(SessionManager::new(
        state.http_client.clone(),
        Some(bearer.to_string()),
        entries,
    ));

    let torn_down = Arc::new(AtomicBool::new(false));
    let guard = TeardownGuard {
        manager: manager.clone(),
        torn_down: torn_down.clone(),
    };

    let result = op(manager.clone()).await;

    torn_down.store(true, Ordering::SeqCst);
    manager.disconnect_all_servers().await;
    drop(guard);

    result
}

struct TeardownGuard {
    manager: Arc<SessionManager>,
    torn_down: Arc<AtomicBool>,
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let manager = self.manager.clone();
        tokio::spawn(async move {
            manager.disconnect_all_servers().await;
        });
    }
}
