use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::message::{ToolInvocation, WireMessage, WireToolCall};
use crate::tool;

pub const DEFAULT_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";
pub const DEFAULT_MODEL: &str = "moonshotai/kimi-k2-thinking";
pub const API_KEY_ENV: &str = "NVIDIA_API_KEY";

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 500;

/// Errors from one relay round trip. The server collapses every variant
/// to a generic 500; the distinction only feeds the log line.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("provider response contained no choices")]
    Empty,
}

/// The normalized outcome of one completion call: assistant text (empty
/// string when the model sent none), the invocations verbatim, and
/// whether the model stopped naturally rather than to call a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReply {
    pub content: String,
    pub tool_calls: Vec<ToolInvocation>,
    pub finished: bool,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    tools: Vec<Value>,
    temperature: f32,
    max_tokens: u32,
    // Kimi-specific: keep the extended thinking pass off for chat turns.
    chat_template_kwargs: Value,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

/// Client for the hosted completion endpoint (OpenAI-compatible).
/// Constructed once at server startup and injected into the router
/// state; there is deliberately no process-wide instance.
#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ProviderClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// One complete request/response cycle: prepend the scenario's system
    /// prompt, forward the transcript unchanged, return the first
    /// choice normalized. No retries, no streaming.
    pub async fn complete(
        &self,
        system_prompt: &str,
        messages: &[WireMessage],
    ) -> Result<RelayReply, RelayError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: build_messages(system_prompt, messages),
            tools: vec![tool::ask_user_question_tool()],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            chat_template_kwargs: serde_json::json!({ "thinking": false }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RelayError::Status(response.status()));
        }

        let completion: CompletionResponse = response.json().await?;
        let choice = completion.choices.into_iter().next().ok_or(RelayError::Empty)?;

        let finished = choice.finish_reason.as_deref() == Some("stop");
        Ok(RelayReply {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(ToolInvocation::from)
                .collect(),
            finished,
        })
    }
}

fn build_messages(system_prompt: &str, messages: &[WireMessage]) -> Vec<WireMessage> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(WireMessage {
        role: "system".into(),
        content: system_prompt.to_string(),
        tool_calls: None,
        tool_call_id: None,
    });
    out.extend(messages.iter().cloned());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn system_prompt_comes_first() {
        let transcript = vec![Message::assistant("Hi!").to_wire(), Message::user("hello").to_wire()];
        let built = build_messages("You are a coach.", &transcript);
        assert_eq!(built.len(), 3);
        assert_eq!(built[0].role, "system");
        assert_eq!(built[0].content, "You are a coach.");
        assert_eq!(built[1].role, "assistant");
        assert_eq!(built[2].role, "user");
    }

    #[test]
    fn request_carries_tools_and_thinking_flag() {
        let request = CompletionRequest {
            model: DEFAULT_MODEL,
            messages: build_messages("prompt", &[]),
            tools: vec![tool::ask_user_question_tool()],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            chat_template_kwargs: serde_json::json!({ "thinking": false }),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["tools"][0]["function"]["name"], "AskUserQuestion");
        assert_eq!(body["chat_template_kwargs"]["thinking"], false);
        assert_eq!(body["max_tokens"], 500);
    }

    #[test]
    fn finished_only_on_natural_stop() {
        let stop: CompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "Done."}, "finish_reason": "stop"}]
        }))
        .unwrap();
        let choice = stop.choices.into_iter().next().unwrap();
        assert_eq!(choice.finish_reason.as_deref(), Some("stop"));

        let tool_stop: CompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "AskUserQuestion", "arguments": "{}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();
        let choice = tool_stop.choices.into_iter().next().unwrap();
        assert_ne!(choice.finish_reason.as_deref(), Some("stop"));
        assert_eq!(choice.message.content, None);
        assert_eq!(choice.message.tool_calls.unwrap().len(), 1);
    }
}
