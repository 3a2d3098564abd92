//! Message-state graph that drives the agent.
//!
//! Nodes read the conversation so far and return messages to append. Edges
//! are either direct or routed by a function of the state. Running the graph
//! yields the full state after every node, so callers can observe each step
//! and keep the last one as the answer.

mod nodes;

pub use nodes::{ChatbotNode, ToolNode};

use crate::error::{Result, WikiAgentError};
use crate::llm::{ChatModel, Message};
use crate::tools::ToolSet;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Virtual entry node.
pub const START: &str = "__start__";
/// Virtual exit node.
pub const END: &str = "__end__";

/// Default cap on node executions per run.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// Conversation state shared by all nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentState {
    pub messages: Vec<Message>,
}

impl AgentState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// A unit of work in the graph.
#[async_trait]
pub trait Node: Send + Sync {
    fn name(&self) -> &str;

    /// Messages to append to the state.
    async fn process(&self, state: &AgentState) -> Result<Vec<Message>>;
}

/// Chooses the next node from the current state.
pub type Router = Arc<dyn Fn(&AgentState) -> String + Send + Sync>;

#[derive(Clone)]
enum Edge {
    Direct(String),
    Conditional(Router),
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Direct(target) => f.debug_tuple("Direct").field(target).finish(),
            Edge::Conditional(_) => f.debug_tuple("Conditional").field(&"<router>").finish(),
        }
    }
}

/// Route to the tools node when the model asked for tools, otherwise finish.
pub fn tools_condition(state: &AgentState) -> &'static str {
    match state.last() {
        Some(message) if !message.tool_calls().is_empty() => "tools",
        _ => END,
    }
}

/// Assembles nodes and edges into a [`CompiledGraph`].
#[derive(Default)]
pub struct StateGraphBuilder {
    nodes: HashMap<String, Arc<dyn Node>>,
    edges: HashMap<String, Edge>,
    problems: Vec<String>,
    recursion_limit: Option<usize>,
}

impl StateGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Arc<dyn Node>) -> &mut Self {
        let name = node.name().to_string();
        if name == START || name == END {
            self.problems.push(format!("'{}' is a reserved node name", name));
        } else if self.nodes.insert(name.clone(), node).is_some() {
            self.problems.push(format!("Node '{}' added twice", name));
        }
        self
    }

    pub fn add_edge(&mut self, from: &str, to: &str) -> &mut Self {
        self.set_edge(from, Edge::Direct(to.to_string()));
        self
    }

    /// Route out of `from` with `router`; the returned name must be a node or [`END`].
    pub fn add_conditional_edges<F, R>(&mut self, from: &str, router: F) -> &mut Self
    where
        F: Fn(&AgentState) -> R + Send + Sync + 'static,
        R: Into<String>,
    {
        let router: Router =
            Arc::new(move |state: &AgentState| -> String { router(state).into() });
        self.set_edge(from, Edge::Conditional(router));
        self
    }

    pub fn recursion_limit(&mut self, limit: usize) -> &mut Self {
        self.recursion_limit = Some(limit);
        self
    }

    fn set_edge(&mut self, from: &str, edge: Edge) {
        if self.edges.insert(from.to_string(), edge).is_some() {
            self.problems
                .push(format!("Node '{}' already has an outgoing edge", from));
        }
    }

    /// Validate the topology and freeze it.
    pub fn compile(self) -> Result<CompiledGraph> {
        let mut problems = self.problems;

        if !self.edges.contains_key(START) {
            problems.push("Graph has no entry edge from START".to_string());
        }

        for (from, edge) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                problems.push(format!("Edge from unknown node '{}'", from));
            }
            if let Edge::Direct(to) = edge {
                if to != END && !self.nodes.contains_key(to) {
                    problems.push(format!("Edge from '{}' to unknown node '{}'", from, to));
                }
            }
        }

        if !problems.is_empty() {
            problems.sort();
            return Err(WikiAgentError::Graph(problems.join("; ")));
        }

        Ok(CompiledGraph {
            nodes: self.nodes,
            edges: self.edges,
            recursion_limit: self.recursion_limit.unwrap_or(DEFAULT_RECURSION_LIMIT),
        })
    }
}

/// Where a run currently stands.
enum Cursor {
    Initial(AgentState),
    Pending {
        state: AgentState,
        from: String,
        steps: usize,
    },
    Finished,
}

/// An executable graph.
pub struct CompiledGraph {
    nodes: HashMap<String, Arc<dyn Node>>,
    edges: HashMap<String, Edge>,
    recursion_limit: usize,
}

impl fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut nodes: Vec<_> = self.nodes.keys().collect();
        nodes.sort();
        f.debug_struct("CompiledGraph")
            .field("nodes", &nodes)
            .field("edges", &self.edges)
            .field("recursion_limit", &self.recursion_limit)
            .finish()
    }
}

impl CompiledGraph {
    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// Run from `initial`, yielding the input state and then the state after each node.
    ///
    /// The stream ends after [`END`] is reached or after the first error.
    pub fn stream(&self, initial: AgentState) -> BoxStream<'_, Result<AgentState>> {
        stream::unfold(Cursor::Initial(initial), move |cursor| self.step(cursor)).boxed()
    }

    /// Run to completion and return the final state.
    #[instrument(skip(self, initial), fields(messages = initial.messages.len()))]
    pub async fn invoke(&self, initial: AgentState) -> Result<AgentState> {
        let mut steps = self.stream(initial);
        let mut last = None;
        while let Some(state) = steps.next().await {
            last = Some(state?);
        }
        last.ok_or_else(|| WikiAgentError::Graph("Graph produced no state".to_string()))
    }

    async fn step(&self, cursor: Cursor) -> Option<(Result<AgentState>, Cursor)> {
        let (state, from, steps) = match cursor {
            Cursor::Finished => return None,
            Cursor::Initial(state) => {
                let snapshot = state.clone();
                return Some((
                    Ok(snapshot),
                    Cursor::Pending {
                        state,
                        from: START.to_string(),
                        steps: 0,
                    },
                ));
            }
            Cursor::Pending { state, from, steps } => (state, from, steps),
        };

        let target = match self.next_node(&from, &state) {
            Ok(target) => target,
            Err(e) => return Some((Err(e), Cursor::Finished)),
        };
        if target == END {
            debug!("Graph finished after {} steps", steps);
            return None;
        }
        if steps >= self.recursion_limit {
            return Some((
                Err(WikiAgentError::RecursionLimit(self.recursion_limit)),
                Cursor::Finished,
            ));
        }

        let node = match self.nodes.get(&target) {
            Some(node) => node,
            None => {
                return Some((
                    Err(WikiAgentError::Graph(format!("Node '{}' not found", target))),
                    Cursor::Finished,
                ))
            }
        };

        debug!(node = %target, step = steps + 1, "Running node");
        let updates = match node.process(&state).await {
            Ok(updates) => updates,
            Err(e) => return Some((Err(e), Cursor::Finished)),
        };

        let mut state = state;
        state.messages.extend(updates);
        Some((
            Ok(state.clone()),
            Cursor::Pending {
                state,
                from: target,
                steps: steps + 1,
            },
        ))
    }

    fn next_node(&self, from: &str, state: &AgentState) -> Result<String> {
        match self.edges.get(from) {
            Some(Edge::Direct(to)) => Ok(to.clone()),
            Some(Edge::Conditional(router)) => {
                let to = router(state);
                if to == END || self.nodes.contains_key(&to) {
                    Ok(to)
                } else {
                    Err(WikiAgentError::Graph(format!(
                        "Router from '{}' chose unknown node '{}'",
                        from, to
                    )))
                }
            }
            // A node without outgoing edges ends the run.
            None => Ok(END.to_string()),
        }
    }
}

/// Build the chatbot/tools loop:
/// `START -> chatbot`, `chatbot -> tools | END` by [`tools_condition`], `tools -> chatbot`.
pub fn build_agent_graph(
    model: Arc<dyn ChatModel>,
    tools: ToolSet,
    recursion_limit: usize,
) -> Result<CompiledGraph> {
    let mut builder = StateGraphBuilder::new();
    builder
        .add_node(Arc::new(ChatbotNode::new(model, tools.specs())))
        .add_node(Arc::new(ToolNode::new(tools)))
        .add_edge(START, "chatbot")
        .add_conditional_edges("chatbot", tools_condition)
        .add_edge("tools", "chatbot")
        .recursion_limit(recursion_limit);
    builder.compile()
}
