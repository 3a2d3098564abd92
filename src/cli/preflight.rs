//! Pre-flight checks before starting work that needs the LLM provider.
//!
//! Catches missing credentials up front instead of on the first request.

use crate::config::Settings;
use crate::error::{Result, WikiAgentError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Serving requires the API key and at least a sane port.
    Serve,
    /// Asking requires the API key.
    Ask,
    /// Direct tool calls need sane tool settings, no credentials.
    Tool,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_tool_settings(settings)?;
    match operation {
        Operation::Serve => {
            settings.api_key()?;
            check_recursion_limit(settings)?;
            if settings.server.port == 0 {
                return Err(WikiAgentError::Config(
                    "server.port must be non-zero".to_string(),
                ));
            }
        }
        Operation::Ask => {
            settings.api_key()?;
            check_recursion_limit(settings)?;
        }
        Operation::Tool => {
            // No credentials needed for public lookups
        }
    }
    Ok(())
}

fn check_tool_settings(settings: &Settings) -> Result<()> {
    let tools = &settings.tools;
    for (name, top_k) in [
        ("wikipedia", tools.wikipedia.top_k_results),
        ("arxiv", tools.arxiv.top_k_results),
    ] {
        if top_k == 0 {
            return Err(WikiAgentError::Config(format!(
                "tools.{}.top_k_results must be at least 1",
                name
            )));
        }
    }
    Ok(())
}

fn check_recursion_limit(settings: &Settings) -> Result<()> {
    // chatbot + tools + chatbot is the shortest run that uses a tool
    if settings.agent.recursion_limit < 3 {
        return Err(WikiAgentError::Config(format!(
            "agent.recursion_limit is {}; at least 3 is needed for a tool round trip",
            settings.agent.recursion_limit
        )));
    }
    Ok(())
}
