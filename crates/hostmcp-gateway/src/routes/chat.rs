//! `POST /web/chat-v2`: the agentic chat executor. Authorizes every
//! selected server, builds a request-scoped Session Manager bound to the
//! lifetime of the whole chat (not the first HTTP round trip), and streams
//! a bounded step loop against the configured LLM backend. The HTTP
//! response is returned before the step loop finishes; teardown is wired
//! through a completion hook rather than a `finally` around the handler,
//! because the handler itself returns long before the stream ends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hostmcp_client::SessionManager;
use hostmcp_protocol::types::ArgumentMap;
use hostmcp_protocol::{GatewayError, GatewayResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::error_response::ApiError;
use crate::extractors::Bearer;
use crate::llm::{ChatMessage, ChatRole, ChatStepRequest, FinishReason, ToolCallRecord, ToolSchema};
use crate::request_context::RequestId;
use crate::session_scope::authorize_all;
use crate::state::AppState;

const TOOL_NAMESPACE_SEPARATOR: &str = "__";

fn tool_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").expect("tool name pattern is a fixed valid regex"))
}

/// The fixed, process-local tool set injected into every chat alongside
/// whatever the selected MCP servers expose.
fn skill_tools() -> Vec<ToolSchema> {
    vec![ToolSchema {
        name: "current_time".to_string(),
        description: Some("Returns the current UTC time as an RFC 3339 timestamp.".to_string()),
        input_schema: serde_json::json!({ "type": "object", "properties": {} }),
    }]
}

const SKILL_SYSTEM_PROMPT_SECTION: &str =
    "\n\nYou have access to a current_time tool that returns the current UTC time; call it instead of guessing.";

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    #[serde(rename = "selectedServerIds")]
    pub selected_server_ids: Vec<String>,
    #[serde(rename = "oauthTokens", default)]
    pub oauth_tokens: HashMap<String, String>,
    pub messages: Vec<ChatMessage>,
    pub model: String,
    #[serde(rename = "systemPrompt")]
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    #[serde(rename = "requireToolApproval", default)]
    pub require_tool_approval: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChatStreamEvent {
    TextDelta { content: String },
    ToolResult { id: String, result: serde_json::Value, is_error: bool },
    /// Sent instead of executing a tool call when the request set
    /// `requireToolApproval`; the step loop halts with finish reason
    /// `needs-approval` rather than running the call itself.
    ToolApprovalRequired { id: String, name: String, arguments: ArgumentMap },
    Done { finish_reason: &'static str },
}

pub async fn chat_v2(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    request_id: RequestId,
    Json(body): Json<ChatRequestBody>,
) -> Result<Response, ApiError> {
    let entries = authorize_all(
        &state,
        &bearer,
        &body.workspace_id,
        &body.selected_server_ids,
        &body.oauth_tokens,
    )
    .await
    .map_err(|error| ApiError { error, request_id: Some(request_id) })?;

    let manager = Arc::new(SessionManager::new(state.http_client.clone(), Some(bearer), entries));
    let connect_results = manager.ensure_all_connected().await;
    if let Some((server_id, error)) = connect_results.into_iter().find_map(|(key, result)| match result {
        Ok(_) => None,
        Err(error) => Some((key, error)),
    }) {
        manager.disconnect_all_servers().await;
        return Err(ApiError {
            error: GatewayError::server_unreachable(format!("{server_id}: {}", error.message)),
            request_id: Some(request_id),
        });
    }

    let tools = match collect_tools(&manager).await {
        Ok(tools) => tools,
        Err(error) => {
            manager.disconnect_all_servers().await;
            return Err(ApiError { error, request_id: Some(request_id) });
        }
    };

    if let Err(error) = validate_tool_names(&tools) {
        manager.disconnect_all_servers().await;
        return Err(ApiError { error, request_id: Some(request_id) });
    }

    let system_prompt = match &body.system_prompt {
        Some(prompt) => format!("{prompt}{SKILL_SYSTEM_PROMPT_SECTION}"),
        None => SKILL_SYSTEM_PROMPT_SECTION.trim_start().to_string(),
    };

    let (tx, rx) = mpsc::channel::<GatewayResult<ChatStreamEvent>>(16);
    let guard = Arc::new(ChatTeardownGuard::new(manager.clone()));

    tokio::spawn(run_step_loop(
        tx,
        guard.clone(),
        state.llm_backend.clone(),
        manager,
        tools,
        body.messages,
        system_prompt,
        body.temperature,
        body.model,
        state.config.chat_max_steps,
        body.require_tool_approval,
    ));

    Ok(ndjson_response(rx))
}

async fn collect_tools(manager: &SessionManager) -> GatewayResult<Vec<ToolSchema>> {
    let server_ids: Vec<String> = manager.session_keys().cloned().collect();
    let mut tools = Vec::new();
    for server_id in &server_ids {
        let session = manager.ensure_connected(server_id).await?;
        let listed = session.list_tools(None).await?;
        for tool in listed.tools {
            tools.push(ToolSchema {
                name: format!("{server_id}{TOOL_NAMESPACE_SEPARATOR}{}", tool.name),
                description: tool.description,
                input_schema: tool.input_schema,
            });
        }
    }
    tools.extend(skill_tools());
    Ok(tools)
}

fn validate_tool_names(tools: &[ToolSchema]) -> GatewayResult<()> {
    let pattern = tool_name_pattern();
    let offenders: Vec<&str> = tools
        .iter()
        .map(|t| t.name.as_str())
        .filter(|name| !pattern.is_match(name))
        .collect();
    if offenders.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::validation(format!(
            "tool names are not valid for this model family: {}",
            offenders.join(", ")
        )))
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_step_loop(
    tx: mpsc::Sender<GatewayResult<ChatStreamEvent>>,
    guard: Arc<ChatTeardownGuard>,
    backend: Arc<dyn crate::llm::LlmBackendClient>,
    manager: Arc<SessionManager>,
    tools: Vec<ToolSchema>,
    mut history: Vec<ChatMessage>,
    system_prompt: String,
    temperature: Option<f32>,
    model: String,
    max_steps: u32,
    require_tool_approval: bool,
) {
    let mut step_count = 0u32;
    let finish_reason = 'steps: loop {
        if step_count >= max_steps {
            break 'steps "max-steps";
        }
        step_count += 1;

        if tx.is_closed() {
            break 'steps "aborted";
        }

        let request = ChatStepRequest {
            model: model.clone(),
            messages: history.clone(),
            tools: tools.clone(),
            system_prompt: Some(system_prompt.clone()),
            temperature,
        };

        let step = match backend.step(&request).await {
            Ok(step) => step,
            Err(error) => {
                let _ = tx.send(Err(error)).await;
                break 'steps "error";
            }
        };

        if !step.text.is_empty()
            && tx.send(Ok(ChatStreamEvent::TextDelta { content: step.text.clone() })).await.is_err()
        {
            break 'steps "aborted";
        }

        history.push(ChatMessage {
            role: ChatRole::Assistant,
            content: if step.text.is_empty() { None } else { Some(step.text.clone()) },
            tool_calls: step.tool_calls.clone(),
            tool_call_id: None,
        });

        if step.finish_reason != FinishReason::ToolCalls {
            break 'steps match step.finish_reason {
                FinishReason::Stop => "stop",
                FinishReason::Length => "length",
                FinishReason::ContentFilter => "content-filter",
                FinishReason::ToolCalls => unreachable!(),
            };
        }

        if step.tool_calls.is_empty() {
            break 'steps "stop";
        }

        if tx.is_closed() {
            break 'steps "aborted";
        }

        if require_tool_approval {
            let mut send_failed = false;
            for call in &step.tool_calls {
                if tx
                    .send(Ok(ChatStreamEvent::ToolApprovalRequired {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    }))
                    .await
                    .is_err()
                {
                    send_failed = true;
                    break;
                }
            }
            break 'steps if send_failed { "aborted" } else { "needs-approval" };
        }

        for call in &step.tool_calls {
            let (result, is_error) = execute_tool_call(&manager, call).await;
            if tx
                .send(Ok(ChatStreamEvent::ToolResult {
                    id: call.id.clone(),
                    result: result.clone(),
                    is_error,
                }))
                .await
                .is_err()
            {
                break 'steps "aborted";
            }
            history.push(ChatMessage {
                role: ChatRole::Tool,
                content: Some(result.to_string()),
                tool_calls: Vec::new(),
                tool_call_id: Some(call.id.clone()),
            });
        }
    };

    let _ = tx.send(Ok(ChatStreamEvent::Done { finish_reason })).await;
    guard.fire().await;
}

async fn execute_tool_call(manager: &SessionManager, call: &ToolCallRecord) -> (serde_json::Value, bool) {
    match call.name.split_once(TOOL_NAMESPACE_SEPARATOR) {
        Some((server_id, tool_name)) => execute_mcp_tool_call(manager, server_id, tool_name, &call.arguments).await,
        None => execute_skill_tool_call(&call.name, &call.arguments),
    }
}

async fn execute_mcp_tool_call(
    manager: &SessionManager,
    server_id: &str,
    tool_name: &str,
    arguments: &ArgumentMap,
) -> (serde_json::Value, bool) {
    let session = match manager.ensure_connected(server_id).await {
        Ok(session) => session,
        Err(error) => return (serde_json::json!({ "error": error.message }), true),
    };
    match session.execute_tool(tool_name, arguments.clone()).await {
        Ok(result) => (
            serde_json::to_value(&result).unwrap_or(serde_json::Value::Null),
            result.is_error,
        ),
        Err(error) => (serde_json::json!({ "error": error.message }), true),
    }
}

fn execute_skill_tool_call(name: &str, _arguments: &ArgumentMap) -> (serde_json::Value, bool) {
    match name {
        "current_time" => (serde_json::json!({ "utc": chrono::Utc::now().to_rfc3339() }), false),
        other => (serde_json::json!({ "error": format!("unknown skill tool {other}") }), true),
    }
}

/// Fires `disconnect_all_servers` exactly once: explicitly at the end of
/// the step loop (normal end, backend error, or caller abort detected via
/// a closed channel), and defensively on `Drop` for the case where the
/// spawned task itself is aborted or panics before reaching that point.
struct ChatTeardownGuard {
    manager: Arc<SessionManager>,
    fired: AtomicBool,
}

impl ChatTeardownGuard {
    fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            manager,
            fired: AtomicBool::new(false),
        }
    }

    async fn fire(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        self.manager.disconnect_all_servers().await;
    }
}

impl Drop for ChatTeardownGuard {
    fn drop(&mut self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        let manager = self.manager.clone();
        tokio::spawn(async move {
            manager.disconnect_all_servers().await;
        });
    }
}

/// Renders the step loop as a newline-delimited JSON body, one
/// `ChatStreamEvent` per line, forwarded to the client as it is produced
/// rather than buffered.
fn ndjson_response(rx: mpsc::Receiver<GatewayResult<ChatStreamEvent>>) -> Response {
    let body_stream = ReceiverStream::new(rx).map(|event| {
        let payload = match event {
            Ok(event) => serde_json::to_string(&event).unwrap_or_default(),
            Err(error) => serde_json::to_string(&error.into_report(None)).unwrap_or_default(),
        };
        Ok::<_, std::io::Error>(format!("{payload}\n").into_bytes())
    });

    let mut response = Response::new(Body::from_stream(body_stream));
    response
        .headers_mut()
        .insert(axum::http::header::CONTENT_TYPE, "application/x-ndjson".parse().unwrap());
    response.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_tool_names_over_the_model_family_cap() {
        let tools = vec![ToolSchema {
            name: "x".repeat(65),
            description: None,
            input_schema: serde_json::json!({}),
        }];
        assert!(validate_tool_names(&tools).is_err());
    }

    #[test]
    fn accepts_namespaced_tool_names_within_the_cap() {
        let tools = vec![ToolSchema {
            name: "srv1__list_files".to_string(),
            description: None,
            input_schema: serde_json::json!({}),
        }];
        assert!(validate_tool_names(&tools).is_ok());
    }

    #[test]
    fn skill_tool_current_time_never_errors() {
        let (value, is_error) = execute_skill_tool_call("current_time", &ArgumentMap::new());
        assert!(!is_error);
        assert!(value["utc"].is_string());
    }

    #[test]
    fn unknown_skill_tool_is_reported_as_an_error_result_not_a_panic() {
        let (_, is_error) = execute_skill_tool_call("not_a_real_tool", &ArgumentMap::new());
        assert!(is_error);
    }
}
