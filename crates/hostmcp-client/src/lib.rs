//! A single MCP client session and the per-request manager that multiplexes
//! several of them. The manager is built fresh for every hosted request and
//! torn down on every exit path — see [`SessionManager::disconnect_all_servers`].

mod manager;
mod session;

pub use manager::{SessionEntry, SessionManager};
pub use session::{McpClientSession, SessionState};
