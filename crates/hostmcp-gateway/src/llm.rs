//! Provider-agnostic LLM backend client for the chat executor. The gateway
//! itself never talks to a model API directly; it posts one step of an
//! agentic loop at a time to a configured backend and gets back model text
//! plus any tool calls the model wants executed.

use std::future::Future;
use std::pin::Pin;

use hostmcp_protocol::types::ArgumentMap;
use hostmcp_protocol::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};

/// Role of one message in the running chat history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
    Tool,
}

/// One entry in the chat history posted to the backend on every step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "toolCalls", default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(rename = "toolCallId", skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A single tool invocation the model asked for in one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: ArgumentMap,
}

/// A tool's JSON-schema description as posted to the backend, namespaced by
/// the MCP server it came from (`{serverId}__{toolName}`) so a duplicate
/// tool name across two servers never collides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Why a step stopped producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    ToolCalls,
    Stop,
    Length,
    ContentFilter,
}

/// One request to the backend: the full running history and the merged
/// tool set, posted fresh on every step of the loop.
#[derive(Debug, Clone, Serialize)]
pub struct ChatStepRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSchema>,
    #[serde(rename = "systemPrompt", skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// What the backend returned for one step.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatStepResponse {
    #[serde(default)]
    pub text: String,
    #[serde(rename = "toolCalls", default)]
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(rename = "finishReason")]
    pub finish_reason: FinishReason,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The seam between the chat executor's step loop and whatever backend the
/// deployment configures. Object-safe so the gateway can hold one behind an
/// `Arc<dyn LlmBackendClient>` without knowing the concrete provider.
pub trait LlmBackendClient: Send + Sync {
    fn step<'a>(&'a self, request: &'a ChatStepRequest) -> BoxFuture<'a, GatewayResult<ChatStepResponse>>;
}

/// Posts each step as a single JSON request/response to a configured HTTP
/// endpoint. The per-token streaming a browser sees is produced by the
/// gateway re-emitting each step's text as one chunk, not by this client.
pub struct HttpLlmBackendClient {
    http_client: reqwest::Client,
    endpoint: url::Url,
}

impl HttpLlmBackendClient {
    pub fn new(http_client: reqwest::Client, endpoint: url::Url) -> Self {
        Self { http_client, endpoint }
    }
}

impl LlmBackendClient for HttpLlmBackendClient {
    fn step<'a>(&'a self, request: &'a ChatStepRequest) -> BoxFuture<'a, GatewayResult<ChatStepResponse>> {
        Box::pin(async move {
            let response = self
                .http_client
                .post(self.endpoint.clone())
                .json(request)
                .send()
                .await
                .map_err(|e| GatewayError::server_unreachable(format!("llm backend unreachable: {e}")))?;

            if !response.status().is_success() {
                return Err(GatewayError::server_unreachable(format!(
                    "llm backend responded with status {}",
                    response.status()
                )));
            }

            response
                .json()
                .await
                .map_err(|e| GatewayError::internal(format!("malformed llm backend response: {e}")))
        })
    }
}
