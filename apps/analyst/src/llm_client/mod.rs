//! LLM Client — the single point of entry for all model calls in the analyst.
//!
//! ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
//! The agent loop and the tools only see the `LanguageModel` trait, so tests
//! swap in scripted stubs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::agent::conversation::{ConversationTurn, Role, ToolInvocation};
use crate::tools::catalog::ToolSpec;

pub mod prompts;

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM requested tool '{0}' where a text answer was expected")]
    UnexpectedToolCall(String),
}

/// What the model wants next: run a tool, or stop with an answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelDecision {
    ToolCall {
        /// Free text the model emitted alongside the call, if any.
        preamble: Option<String>,
        call: ToolInvocation,
    },
    Final(String),
}

/// The language-model collaborator.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends the conversation and the tool catalog, returns the model's decision.
    async fn complete(
        &self,
        system: &str,
        conversation: &[ConversationTurn],
        tools: &[ToolSpec],
    ) -> Result<ModelDecision, LlmError>;

    /// Upper bound on conversation size, in characters.
    fn max_context_chars(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Single-shot text completion with no tools offered.
pub async fn complete_text(
    llm: &dyn LanguageModel,
    system: &str,
    prompt: &str,
) -> Result<String, LlmError> {
    let turn = ConversationTurn {
        role: Role::User,
        content: prompt.to_string(),
        tool_call: None,
        is_error: false,
        at: chrono::Utc::now(),
    };

    match llm.complete(system, &[turn], &[]).await? {
        ModelDecision::Final(text) if !text.trim().is_empty() => Ok(text),
        ModelDecision::Final(_) => Err(LlmError::EmptyContent),
        ModelDecision::ToolCall { call, .. } => Err(LlmError::UnexpectedToolCall(call.name)),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<RequestBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Concatenated text blocks, if any.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } if !text.trim().is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join("\n"))
    }

    /// Turns the response into a decision. Only the first tool call is honoured.
    pub fn into_decision(self) -> Result<ModelDecision, LlmError> {
        let preamble = self.text();
        let call = self.content.into_iter().find_map(|b| match b {
            ContentBlock::ToolUse { id, name, input } => Some(ToolInvocation {
                id,
                name,
                arguments: input,
            }),
            _ => None,
        });

        match (call, preamble) {
            (Some(call), preamble) => Ok(ModelDecision::ToolCall { preamble, call }),
            (None, Some(text)) => Ok(ModelDecision::Final(text)),
            (None, None) => Err(LlmError::EmptyContent),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Maps turns onto Anthropic messages, merging consecutive turns that share a role.
fn to_messages(conversation: &[ConversationTurn]) -> Vec<AnthropicMessage> {
    let mut messages: Vec<AnthropicMessage> = Vec::new();

    for turn in conversation {
        let (role, blocks) = match turn.role {
            Role::User => ("user", text_block(&turn.content)),
            Role::Agent => {
                let mut blocks = text_block(&turn.content);
                if let Some(call) = &turn.tool_call {
                    blocks.push(RequestBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: object_or_empty(&call.arguments),
                    });
                }
                ("assistant", blocks)
            }
            Role::Tool => {
                let Some(call) = &turn.tool_call else {
                    continue;
                };
                (
                    "user",
                    vec![RequestBlock::ToolResult {
                        tool_use_id: call.id.clone(),
                        content: turn.content.clone(),
                        is_error: turn.is_error,
                    }],
                )
            }
        };

        if blocks.is_empty() {
            continue;
        }

        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => messages.push(AnthropicMessage {
                role,
                content: blocks,
            }),
        }
    }

    messages
}

fn text_block(text: &str) -> Vec<RequestBlock> {
    if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![RequestBlock::Text {
            text: text.to_string(),
        }]
    }
}

fn object_or_empty(value: &Value) -> Value {
    if value.is_object() {
        value.clone()
    } else {
        json!({})
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub context_chars: usize,
}

/// Anthropic Messages API client with retry logic and native tool use.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, settings })
    }

    /// Makes a raw call to the API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn call(&self, request_body: &AnthropicRequest<'_>) -> Result<LlmResponse, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.settings.api_url)
                .header("x-api-key", &self.settings.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            let llm_response: LlmResponse = serde_json::from_str(&body)?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}, stop_reason={:?}",
                llm_response.usage.input_tokens,
                llm_response.usage.output_tokens,
                llm_response.stop_reason
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(
        &self,
        system: &str,
        conversation: &[ConversationTurn],
        tools: &[ToolSpec],
    ) -> Result<ModelDecision, LlmError> {
        let tools: Vec<AnthropicTool<'_>> = tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name,
                description: t.description,
                input_schema: &t.input_schema,
            })
            .collect();

        // One tool per turn keeps the loop strictly sequential.
        let tool_choice = (!tools.is_empty())
            .then(|| json!({ "type": "auto", "disable_parallel_tool_use": true }));

        let request = AnthropicRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            system,
            messages: to_messages(conversation),
            tools,
            tool_choice,
        };

        self.call(&request).await?.into_decision()
    }

    fn max_context_chars(&self) -> usize {
        self.settings.context_chars
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::conversation::Conversation;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_response_with_tool_use_becomes_tool_call() {
        let body = json!({
            "content": [
                {"type": "text", "text": "Let me read the file."},
                {"type": "tool_use", "id": "toolu_1", "name": "read_resume", "input": {"file_path": "cv.pdf"}}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5},
            "stop_reason": "tool_use"
        });
        let response: LlmResponse = serde_json::from_value(body).unwrap();
        match response.into_decision().unwrap() {
            ModelDecision::ToolCall { preamble, call } => {
                assert_eq!(preamble.as_deref(), Some("Let me read the file."));
                assert_eq!(call.id, "toolu_1");
                assert_eq!(call.name, "read_resume");
                assert_eq!(call.arguments["file_path"], "cv.pdf");
            }
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn test_text_only_response_is_final() {
        let body = json!({
            "content": [{"type": "text", "text": "All done."}, {"type": "thinking", "thinking": "..."}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        });
        let response: LlmResponse = serde_json::from_value(body).unwrap();
        assert_eq!(
            response.into_decision().unwrap(),
            ModelDecision::Final("All done.".to_string())
        );
    }

    #[test]
    fn test_empty_response_is_error() {
        let body = json!({ "content": [], "usage": {"input_tokens": 1, "output_tokens": 0} });
        let response: LlmResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(response.into_decision(), Err(LlmError::EmptyContent)));
    }

    #[test]
    fn test_to_messages_pairs_tool_use_with_result() {
        let mut conv = Conversation::new();
        conv.push_user("Analyze cv.pdf");
        let call = ToolInvocation {
            id: "toolu_1".to_string(),
            name: "read_resume".to_string(),
            arguments: json!({"file_path": "cv.pdf"}),
        };
        conv.push_tool_call(None, call.clone());
        conv.push_tool_result(&call, "resume text", false);
        conv.push_user("Now summarize");

        let messages = to_messages(conv.turns());
        let roles: Vec<&str> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);

        let value = serde_json::to_value(&messages[2].content).unwrap();
        assert_eq!(value[0]["type"], "tool_result");
        assert_eq!(value[0]["tool_use_id"], "toolu_1");
        assert_eq!(value[1]["type"], "text");
    }

    #[test]
    fn test_to_messages_skips_empty_agent_text() {
        let mut conv = Conversation::new();
        conv.push_user("hi");
        conv.push_agent_text("");
        let messages = to_messages(conv.turns());
        assert_eq!(messages.len(), 1);
    }
}
