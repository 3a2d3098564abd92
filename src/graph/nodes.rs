//! Prebuilt nodes: the model call and tool execution.

use super::{AgentState, Node};
use crate::error::{Result, WikiAgentError};
use crate::llm::{ChatModel, Message, ToolCallRequest, ToolSpec};
use crate::tools::ToolSet;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// Calls the chat model with the conversation and the bound tools.
pub struct ChatbotNode {
    model: Arc<dyn ChatModel>,
    tools: Vec<ToolSpec>,
}

impl ChatbotNode {
    pub fn new(model: Arc<dyn ChatModel>, tools: Vec<ToolSpec>) -> Self {
        Self { model, tools }
    }
}

#[async_trait]
impl Node for ChatbotNode {
    fn name(&self) -> &str {
        "chatbot"
    }

    async fn process(&self, state: &AgentState) -> Result<Vec<Message>> {
        let reply = self.model.invoke(&state.messages, &self.tools).await?;
        Ok(vec![reply])
    }
}

/// Executes the tool calls of the last assistant message.
///
/// Failures are reported back to the model as tool messages instead of
/// aborting the run.
pub struct ToolNode {
    tools: ToolSet,
}

impl ToolNode {
    pub fn new(tools: ToolSet) -> Self {
        Self { tools }
    }

    async fn run_call(&self, call: &ToolCallRequest) -> Message {
        info!("Agent calling tool: {} with args: {}", call.name, call.arguments);

        let content = match self.execute(call).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %call.name, "Tool call failed: {}", e);
                format!("Error: {}\n Please fix your mistakes.", e)
            }
        };

        Message::tool(&call.id, &call.name, content)
    }

    async fn execute(&self, call: &ToolCallRequest) -> Result<String> {
        let tool = self.tools.get(&call.name).ok_or_else(|| {
            WikiAgentError::UnknownTool(format!(
                "{} is not a valid tool, try one of [{}]",
                call.name,
                self.tools.names().join(", ")
            ))
        })?;

        let args = if call.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&call.arguments)?
        };

        tool.call(args).await
    }
}

#[async_trait]
impl Node for ToolNode {
    fn name(&self) -> &str {
        "tools"
    }

    async fn process(&self, state: &AgentState) -> Result<Vec<Message>> {
        let calls = state.last().map(Message::tool_calls).unwrap_or_default();
        if calls.is_empty() {
            return Err(WikiAgentError::Graph(
                "Tools node reached without pending tool calls".to_string(),
            ));
        }

        Ok(join_all(calls.iter().map(|call| self.run_call(call))).await)
    }
}
