//! Chat messages and the chat model abstraction.
//!
//! The agent graph only talks to [`ChatModel`]; the concrete client for
//! OpenAI-compatible endpoints lives in [`OpenAiChatModel`].

mod openai;

pub use openai::OpenAiChatModel;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single conversational message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::Tool {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    /// Text content of the message.
    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    /// Tool calls requested by an assistant message; empty for other roles.
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Human-readable role label.
    pub fn role_label(&self) -> &'static str {
        match self {
            Message::System { .. } => "System Message",
            Message::User { .. } => "Human Message",
            Message::Assistant { .. } => "Ai Message",
            Message::Tool { .. } => "Tool Message",
        }
    }

    /// Render the message as a bannered block for terminals and debug logs.
    pub fn pretty(&self) -> String {
        let mut out = format!("{:=^80}\n", format!(" {} ", self.role_label()));

        if let Message::Tool { name, .. } = self {
            out.push_str(&format!("Name: {}\n", name));
        }

        out.push('\n');
        out.push_str(self.content());

        let calls = self.tool_calls();
        if !calls.is_empty() {
            if !self.content().is_empty() {
                out.push('\n');
            }
            out.push_str("Tool Calls:");
            for call in calls {
                out.push_str(&format!(
                    "\n  {} ({})\n  Args: {}",
                    call.name, call.id, call.arguments
                ));
            }
        }

        out
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

/// Function definition bound to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// A chat model that can optionally request tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the conversation with the bound tools and return the assistant reply.
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_calls_only_on_assistant() {
        let msg = Message::Assistant {
            content: String::new(),
            tool_calls: vec![ToolCallRequest {
                id: "call_1".to_string(),
                name: "wikipedia".to_string(),
                arguments: r#"{"query":"Rust"}"#.to_string(),
            }],
        };
        assert_eq!(msg.tool_calls().len(), 1);
        assert!(Message::user("hi").tool_calls().is_empty());
        assert!(Message::tool("call_1", "wikipedia", "x").tool_calls().is_empty());
    }

    #[test]
    fn test_pretty_banner() {
        let rendered = Message::user("What is Rust?").pretty();
        let first = rendered.lines().next().unwrap();
        assert_eq!(first.chars().count(), 80);
        assert!(first.contains(" Human Message "));
        assert!(rendered.ends_with("What is Rust?"));
    }

    #[test]
    fn test_pretty_lists_tool_calls() {
        let msg = Message::Assistant {
            content: String::new(),
            tool_calls: vec![ToolCallRequest {
                id: "call_9".to_string(),
                name: "arxiv".to_string(),
                arguments: r#"{"query":"attention"}"#.to_string(),
            }],
        };
        let rendered = msg.pretty();
        assert!(rendered.contains("Tool Calls:"));
        assert!(rendered.contains("arxiv (call_9)"));
        assert!(rendered.contains(r#"Args: {"query":"attention"}"#));
    }

    #[test]
    fn test_message_serializes_with_role_tag() {
        let json = serde_json::to_value(Message::tool("c1", "wikipedia", "Page: Rust")).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["name"], "wikipedia");
    }
}
