//! wikiagent - LLM question answering backed by Wikipedia and Arxiv
//!
//! A small HTTP backend that forwards user text to a tool-calling LLM agent.
//! The agent may look things up on Wikipedia or Arxiv before answering; the
//! intermediate steps are collapsed into one JSON response for the chat
//! frontend.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `llm` - Chat messages and the OpenAI-compatible chat model
//! - `tools` - Wikipedia and Arxiv lookups exposed to the model
//! - `graph` - Message-state graph with the chatbot and tools nodes
//! - `agent` - Runs the graph and collapses it into a response
//! - `server` - CORS-enabled HTTP routes
//!
//! # Example
//!
//! ```rust,no_run
//! use wikiagent::agent::WikiAgent;
//! use wikiagent::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let agent = WikiAgent::from_settings(&settings)?;
//!
//!     let response = agent.run("Who discovered penicillin?").await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod openai;
pub mod server;
pub mod tools;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, WikiAgentError};
