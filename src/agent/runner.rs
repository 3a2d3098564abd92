//! Agent runner: streams the graph and collapses it into one answer.

use crate::config::Settings;
use crate::error::{Result, WikiAgentError};
use crate::graph::{build_agent_graph, AgentState, CompiledGraph};
use crate::llm::{ChatModel, Message, OpenAiChatModel};
use crate::tools::ToolSet;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Question-answering agent over the chatbot/tools graph.
pub struct WikiAgent {
    graph: CompiledGraph,
    model_name: String,
    tool_names: Vec<String>,
    system_prompt: Option<String>,
}

impl WikiAgent {
    /// Create an agent from any chat model and tool set.
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolSet, recursion_limit: usize) -> Result<Self> {
        let model_name = model.model_name().to_string();
        let tool_names = tools.names().iter().map(|n| n.to_string()).collect();
        let graph = build_agent_graph(model, tools, recursion_limit)?;

        Ok(Self {
            graph,
            model_name,
            tool_names,
            system_prompt: None,
        })
    }

    /// Create the production agent: configured LLM endpoint plus enabled tools.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.api_key()?;
        let model = OpenAiChatModel::from_settings(&settings.llm, &api_key)?;
        let tools = ToolSet::from_settings(&settings.tools)?;

        let agent = Self::new(Arc::new(model), tools, settings.agent.recursion_limit)?
            .with_system_prompt(settings.llm.system_prompt.clone());
        info!(
            model = %agent.model_name,
            tools = ?agent.tool_names,
            "Agent ready"
        );
        Ok(agent)
    }

    /// Set or clear the system prompt.
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    /// Run the agent on one user input.
    pub async fn run(&self, input: &str) -> Result<AgentResponse> {
        self.run_with_steps(input, |_| {}).await
    }

    /// Run the agent, handing every intermediate state to `on_step`.
    #[instrument(skip(self, input, on_step), fields(input_len = input.len()))]
    pub async fn run_with_steps<F>(&self, input: &str, mut on_step: F) -> Result<AgentResponse>
    where
        F: FnMut(&AgentState) + Send,
    {
        if input.trim().is_empty() {
            return Err(WikiAgentError::InvalidInput(
                "user input must not be empty".to_string(),
            ));
        }

        let mut initial = Vec::new();
        if let Some(prompt) = &self.system_prompt {
            initial.push(Message::system(prompt.clone()));
        }
        initial.push(Message::user(input));

        let mut steps = self.graph.stream(AgentState::new(initial));
        let mut collector = Collector::default();

        while let Some(state) = steps.next().await {
            let state = state?;
            for message in collector.observe(&state) {
                debug!("\n{}", message.pretty());
            }
            on_step(&state);
        }

        collector.finish()
    }
}

/// Who sent a message, in the terms the chat frontend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Agent,
    Tool,
}

/// A conversation message flattened for clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawMessage {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// When the message was first observed during the run.
    pub timestamp: DateTime<Utc>,
}

/// Response from an agent run.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// Content of the final message.
    pub answer: String,
    /// Output of the last tool that ran, if any.
    pub tool_response: Option<String>,
    /// Every user, agent and tool message of the run.
    pub raw_messages: Vec<RawMessage>,
    /// Tool calls made, paired with their results.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of states the graph produced.
    pub steps: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: String,
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// Accumulates the streamed states.
#[derive(Default)]
struct Collector {
    last: Option<AgentState>,
    observed_at: Vec<DateTime<Utc>>,
    steps: usize,
}

impl Collector {
    /// Record a state and return the messages it added.
    fn observe<'a>(&mut self, state: &'a AgentState) -> &'a [Message] {
        let seen = self.observed_at.len().min(state.messages.len());
        let now = Utc::now();
        self.observed_at
            .extend(std::iter::repeat(now).take(state.messages.len() - seen));
        self.steps += 1;
        self.last = Some(state.clone());
        &state.messages[seen..]
    }

    fn finish(self) -> Result<AgentResponse> {
        let state = self
            .last
            .ok_or_else(|| WikiAgentError::Agent("Agent produced no output".to_string()))?;

        let answer = state
            .last()
            .map(|m| m.content().to_string())
            .unwrap_or_default();

        let tool_response = state.messages.iter().rev().find_map(|m| match m {
            Message::Tool { content, .. } => Some(content.clone()),
            _ => None,
        });

        let raw_messages = state
            .messages
            .iter()
            .zip(self.observed_at.iter())
            .filter_map(|(message, at)| raw_message(message, *at))
            .collect();

        Ok(AgentResponse {
            answer,
            tool_response,
            raw_messages,
            tool_calls: tool_call_records(&state.messages),
            steps: self.steps,
        })
    }
}

fn raw_message(message: &Message, timestamp: DateTime<Utc>) -> Option<RawMessage> {
    let (kind, text) = match message {
        Message::System { .. } => return None,
        Message::User { content } => (MessageKind::User, content.clone()),
        Message::Assistant {
            content,
            tool_calls,
        } => {
            let text = if content.is_empty() && !tool_calls.is_empty() {
                tool_calls
                    .iter()
                    .map(|c| format!("{}({})", c.name, c.arguments))
                    .collect::<Vec<_>>()
                    .join(", ")
            } else {
                content.clone()
            };
            (MessageKind::Agent, text)
        }
        Message::Tool { content, .. } => (MessageKind::Tool, content.clone()),
    };

    Some(RawMessage {
        text,
        kind,
        timestamp,
    })
}

/// Pair each requested call with the tool message that answered it.
fn tool_call_records(messages: &[Message]) -> Vec<ToolCallRecord> {
    let results: HashMap<&str, &str> = messages
        .iter()
        .filter_map(|m| match m {
            Message::Tool {
                tool_call_id,
                content,
                ..
            } => Some((tool_call_id.as_str(), content.as_str())),
            _ => None,
        })
        .collect();

    messages
        .iter()
        .flat_map(|m| m.tool_calls())
        .map(|call| ToolCallRecord {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result: results
                .get(call.id.as_str())
                .map(|r| r.to_string())
                .unwrap_or_default(),
        })
        .collect()
}
