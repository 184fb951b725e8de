//! Route handlers. Every single-shot route follows the Request-Scoped
//! Session Pattern from [`crate::session_scope`]; the chat route follows
//! the stream-completion-hook pattern from [`crate::chat`] instead.

pub mod chat;
pub mod oauth;
pub mod prompts;
pub mod resources;
pub mod servers;
pub mod share;
pub mod tools;
pub mod widgets;

use std::collections::HashMap;

use serde::Deserialize;

/// Fields common to every `/web/*` single-shot route body.
#[derive(Debug, Deserialize)]
pub struct ServerCallEnvelope {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    #[serde(rename = "serverId")]
    pub server_id: String,
    #[serde(rename = "oauthAccessToken")]
    pub oauth_access_token: Option<String>,
}

impl ServerCallEnvelope {
    pub fn oauth_tokens(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(token) = &self.oauth_access_token {
            map.insert(self.server_id.clone(), token.clone());
        }
        map
    }
}
