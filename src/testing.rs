//! Test doubles for the model and tool seams.

use crate::error::{Result, WikiAgentError};
use crate::llm::{ChatModel, Message, ToolCallRequest, ToolSpec};
use crate::tools::{query_arg, Tool};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Replays canned assistant replies and records what it was sent.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
    seen: Mutex<Vec<Vec<Message>>>,
    bound: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
            bound: Mutex::new(Vec::new()),
        }
    }

    /// Conversations passed to each invocation.
    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }

    /// Tool names bound on the latest invocation.
    pub fn bound_tools(&self) -> Vec<String> {
        self.bound.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message> {
        self.seen.lock().unwrap().push(messages.to_vec());
        *self.bound.lock().unwrap() = tools.iter().map(|t| t.name.clone()).collect();
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| WikiAgentError::Llm("script exhausted".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Sleeps before every answer, like a provider that hangs.
pub struct SlowModel {
    delay: Duration,
}

impl SlowModel {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ChatModel for SlowModel {
    async fn invoke(&self, _messages: &[Message], _tools: &[ToolSpec]) -> Result<Message> {
        tokio::time::sleep(self.delay).await;
        Ok(Message::assistant("too late"))
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

/// Asks for the same tool on every turn and never answers.
pub struct LoopingModel {
    tool: String,
    calls: AtomicUsize,
}

impl LoopingModel {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChatModel for LoopingModel {
    async fn invoke(&self, _messages: &[Message], _tools: &[ToolSpec]) -> Result<Message> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Message::Assistant {
            content: String::new(),
            tool_calls: vec![ToolCallRequest {
                id: format!("call-{}", n),
                name: self.tool.clone(),
                arguments: r#"{"query":"again"}"#.to_string(),
            }],
        })
    }

    fn model_name(&self) -> &str {
        "looping"
    }
}

/// Answers `"{name} result for {query}"`.
pub struct EchoTool {
    name: String,
}

impl EchoTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Echoes the query"
    }

    async fn call(&self, args: Value) -> Result<String> {
        let query = query_arg(&self.name, &args)?;
        Ok(format!("{} result for {}", self.name, query))
    }
}

/// Always fails like an unreachable upstream.
pub struct FailingTool {
    name: String,
}

impl FailingTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    async fn call(&self, _args: Value) -> Result<String> {
        Err(WikiAgentError::tool(&self.name, "service unavailable"))
    }
}
