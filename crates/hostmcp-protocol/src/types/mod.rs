//! MCP domain types per the 2025-06-18 specification, trimmed to the
//! operations the gateway proxies: tools, resources, prompts, content.

mod content;
mod prompts;
mod resources;
mod tools;

pub use content::{Content, ResourceContents};
pub use prompts::{GetPromptResult, Prompt, PromptArgument};
pub use resources::{Resource, ResourceTemplate};
pub use tools::{Tool, ToolAnnotations, ToolInputSchema};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque pagination cursor, passed through unmodified.
pub type Cursor = String;

/// Capabilities negotiated with a peer during `initialize`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elicitation: Option<serde_json::Value>,
}

/// Result of `tools/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<serde_json::Value>,
}

/// Result of `resources/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

/// Result of `resources/read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

/// Result of `prompts/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

/// Result of `resources/templates/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResourceTemplatesResult {
    pub resource_templates: Vec<ResourceTemplate>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

/// Arbitrary free-form arguments passed to a tool call or prompt get.
pub type ArgumentMap = HashMap<String, serde_json::Value>;

/// An elicitation request surfaced by a server mid tool-call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitRequest {
    pub message: String,
    #[serde(rename = "requestedSchema")]
    pub requested_schema: serde_json::Value,
    #[serde(rename = "relatedTaskId", skip_serializing_if = "Option::is_none")]
    pub related_task_id: Option<String>,
}

/// Outcome of an elicitation handler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ElicitResult {
    Accept { content: serde_json::Value },
    Decline,
    Cancel,
}
