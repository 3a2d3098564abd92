//! The question-answering agent.
//!
//! Wires the configured chat model and knowledge tools into the
//! chatbot/tools graph and turns a run into a single response with the
//! intermediate messages attached.

mod runner;

pub use runner::{AgentResponse, MessageKind, RawMessage, ToolCallRecord, WikiAgent};
