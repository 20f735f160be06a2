use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{anyhow, Result};

use crate::message::{ToolInvocation, WireMessage, WireToolCall};
use crate::relay::RelayReply;

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(rename = "scenarioId")]
    scenario_id: &'a str,
    messages: &'a [WireMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    message: AssistantMessage,
    finished: bool,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the relay server's /api/chat endpoint.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn chat(&self, scenario_id: &str, messages: &[WireMessage]) -> Result<RelayReply> {
        let request = ChatRequest {
            scenario_id,
            messages,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| "request failed".to_string());
            return Err(anyhow!(
                "chat request failed with status {status}: {detail}. Is `socratic serve` running?"
            ));
        }

        let chat: ChatResponse = response.json().await?;
        Ok(RelayReply {
            content: chat.message.content.unwrap_or_default(),
            tool_calls: chat
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(ToolInvocation::from)
                .collect(),
            finished: chat.finished,
        })
    }
}
