//! Error types for wikiagent.

use thiserror::Error;

/// Library-level error type for wikiagent operations.
#[derive(Error, Debug)]
pub enum WikiAgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API error: {0}")]
    Llm(String),

    #[error("Tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Recursion limit of {0} reached without hitting a stop condition")]
    RecursionLimit(usize),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Agent error: {0}")]
    Agent(String),
}

impl WikiAgentError {
    /// Shorthand for a failure inside a named tool.
    pub fn tool(tool: &str, message: impl Into<String>) -> Self {
        WikiAgentError::Tool {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error came from a remote service rather than from this process.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            WikiAgentError::Http(_) | WikiAgentError::Llm(_) | WikiAgentError::Tool { .. }
        )
    }
}

/// Result type alias for wikiagent operations.
pub type Result<T> = std::result::Result<T, WikiAgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        assert!(WikiAgentError::Llm("timeout".to_string()).is_upstream());
        assert!(WikiAgentError::tool("wikipedia", "503").is_upstream());
        assert!(!WikiAgentError::RecursionLimit(25).is_upstream());
        assert!(!WikiAgentError::InvalidInput("empty".to_string()).is_upstream());
    }

    #[test]
    fn test_tool_error_display() {
        let err = WikiAgentError::tool("arxiv", "bad feed");
        assert_eq!(err.to_string(), "Tool 'arxiv' failed: bad feed");
    }
}
