use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One function call requested by the model. The only function this app
/// recognizes is `AskUserQuestion`; `arguments` is the raw JSON-object
/// string exactly as the provider sent it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Message payload, tagged by kind so that invalid combinations (a tool
/// result without a back-reference, a user message carrying invocations)
/// cannot be constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    User {
        content: String,
    },
    Assistant {
        content: String,
    },
    /// Assistant turn that requested tool calls. Content may be empty.
    ToolCall {
        content: String,
        calls: Vec<ToolInvocation>,
    },
    /// The user's answers fed back for a specific invocation.
    ToolResult {
        call_id: String,
        content: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    pub fn new(body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            body,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageBody::User {
            content: content.into(),
        })
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageBody::Assistant {
            content: content.into(),
        })
    }

    pub fn tool_call(content: impl Into<String>, calls: Vec<ToolInvocation>) -> Self {
        Self::new(MessageBody::ToolCall {
            content: content.into(),
            calls,
        })
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(MessageBody::ToolResult {
            call_id: call_id.into(),
            content: content.into(),
        })
    }

    pub fn to_wire(&self) -> WireMessage {
        match &self.body {
            MessageBody::User { content } => WireMessage {
                role: "user".into(),
                content: content.clone(),
                tool_calls: None,
                tool_call_id: None,
            },
            MessageBody::Assistant { content } => WireMessage {
                role: "assistant".into(),
                content: content.clone(),
                tool_calls: None,
                tool_call_id: None,
            },
            MessageBody::ToolCall { content, calls } => WireMessage {
                role: "assistant".into(),
                content: content.clone(),
                tool_calls: Some(calls.iter().map(WireToolCall::from).collect()),
                tool_call_id: None,
            },
            MessageBody::ToolResult { call_id, content } => WireMessage {
                role: "tool".into(),
                content: content.clone(),
                tool_calls: None,
                tool_call_id: Some(call_id.clone()),
            },
        }
    }
}

/// The shape both HTTP hops speak: role plus content (always a string,
/// empty when the model sent none) plus optional tool metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireFunction {
    pub name: String,
    pub arguments: String,
}

impl From<&ToolInvocation> for WireToolCall {
    fn from(call: &ToolInvocation) -> Self {
        Self {
            id: call.id.clone(),
            kind: "function".into(),
            function: WireFunction {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }
}

impl From<WireToolCall> for ToolInvocation {
    fn from(wire: WireToolCall) -> Self {
        Self {
            id: wire.id,
            name: wire.function.name,
            arguments: wire.function.arguments,
        }
    }
}

/// An append-only transcript owned by one scenario. The message order is
/// replayed verbatim to the model on every turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    pub scenario_id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Start a transcript for a scenario with its opening question
    /// already in place as the first assistant turn.
    pub fn open(scenario_id: &str, opening_question: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            scenario_id: scenario_id.to_string(),
            messages: vec![Message::assistant(opening_question)],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Whether some assistant turn in this transcript emitted the
    /// invocation a tool result would refer to.
    pub fn contains_invocation(&self, call_id: &str) -> bool {
        self.messages.iter().any(|m| match &m.body {
            MessageBody::ToolCall { calls, .. } => calls.iter().any(|c| c.id == call_id),
            _ => false,
        })
    }

    pub fn to_wire(&self) -> Vec<WireMessage> {
        self.messages.iter().map(Message::to_wire).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation() -> ToolInvocation {
        ToolInvocation {
            id: "call_1".into(),
            name: "AskUserQuestion".into(),
            arguments: r#"{"questions":[]}"#.into(),
        }
    }

    #[test]
    fn tool_call_serializes_invocations_on_the_wire() {
        let msg = Message::tool_call("", vec![invocation()]);
        let wire = msg.to_wire();
        assert_eq!(wire.role, "assistant");
        assert_eq!(wire.content, "");
        let calls = wire.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, "function");
        assert_eq!(calls[0].function.name, "AskUserQuestion");
        assert!(wire.tool_call_id.is_none());
    }

    #[test]
    fn tool_result_carries_back_reference() {
        let wire = Message::tool_result("call_1", r#"{"question_0":"Growth"}"#).to_wire();
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(wire.content, r#"{"question_0":"Growth"}"#);
        assert!(wire.tool_calls.is_none());
    }

    #[test]
    fn plain_messages_pass_role_and_content_through() {
        let wire = Message::user("hello").to_wire();
        assert_eq!(wire.role, "user");
        assert_eq!(wire.content, "hello");
        assert!(wire.tool_calls.is_none() && wire.tool_call_id.is_none());
    }

    #[test]
    fn wire_message_tolerates_missing_content() {
        let wire: WireMessage = serde_json::from_str(r#"{"role":"assistant"}"#).unwrap();
        assert_eq!(wire.content, "");
    }

    #[test]
    fn conversation_tracks_emitted_invocations() {
        let mut convo = Conversation::open("decision-making", "What choice are you facing?");
        assert!(!convo.contains_invocation("call_1"));
        convo.push(Message::tool_call("", vec![invocation()]));
        assert!(convo.contains_invocation("call_1"));
        assert!(!convo.contains_invocation("call_2"));
    }

    #[test]
    fn message_round_trips_through_json() {
        let original = Message::tool_call("picking options", vec![invocation()]);
        let json = serde_json::to_string(&original).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(original, back);
    }
}
