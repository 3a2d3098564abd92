//! External knowledge tools exposed to the model.
//!
//! Each tool wraps a small HTTP client (Wikipedia, Arxiv) and renders its
//! results as plain text the model can quote.

mod arxiv;
mod wikipedia;

pub use arxiv::{ArxivClient, ArxivTool};
pub use wikipedia::{WikipediaClient, WikipediaTool};

use crate::config::ToolSettings;
use crate::error::{Result, WikiAgentError};
use crate::llm::ToolSpec;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Queries longer than this are cut before being sent upstream.
pub(crate) const MAX_QUERY_LENGTH: usize = 300;

const HTTP_TIMEOUT_SECS: u64 = 30;

/// A capability the model may invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call the tool.
    fn name(&self) -> &str;

    /// When the model should reach for this tool.
    fn description(&self) -> &str;

    /// JSON schema of the arguments object. Defaults to a single `query` string.
    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "search query to look up"
                }
            },
            "required": ["query"]
        })
    }

    /// Run the tool with model-provided arguments.
    async fn call(&self, args: Value) -> Result<String>;

    /// Definition bound to the chat model.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Extract the `query` argument; a bare JSON string is accepted as well.
pub(crate) fn query_arg(tool: &str, args: &Value) -> Result<String> {
    let query = match args {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("query").and_then(Value::as_str),
        _ => None,
    };

    query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| WikiAgentError::tool(tool, "Missing 'query' argument"))
}

/// HTTP client shared by the tools.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("wikiagent/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|e| WikiAgentError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Ordered set of tools, looked up by name.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool; a tool with the same name replaces the previous one.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
        self
    }

    /// Build the enabled tools from settings.
    pub fn from_settings(settings: &ToolSettings) -> Result<Self> {
        let http = http_client()?;
        let mut set = ToolSet::new();

        for name in &settings.enabled {
            let tool: Arc<dyn Tool> = match name.as_str() {
                "wikipedia" => Arc::new(WikipediaTool::new(WikipediaClient::from_settings(
                    &settings.wikipedia,
                    http.clone(),
                ))),
                "arxiv" => Arc::new(ArxivTool::new(ArxivClient::from_settings(
                    &settings.arxiv,
                    http.clone(),
                ))),
                other => {
                    return Err(WikiAgentError::Config(format!(
                        "Unknown tool '{}' in tools.enabled (available: wikipedia, arxiv)",
                        other
                    )))
                }
            };
            set = set.with_tool(tool);
        }

        Ok(set)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Definitions for binding to the model, in insertion order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolSettings;

    #[test]
    fn test_query_arg_forms() {
        let args = serde_json::json!({"query": "  Alan Turing "});
        assert_eq!(query_arg("wikipedia", &args).unwrap(), "Alan Turing");

        let bare = serde_json::json!("Alan Turing");
        assert_eq!(query_arg("wikipedia", &bare).unwrap(), "Alan Turing");

        assert!(query_arg("wikipedia", &serde_json::json!({})).is_err());
        assert!(query_arg("wikipedia", &serde_json::json!({"query": "  "})).is_err());
        assert!(query_arg("wikipedia", &serde_json::json!(42)).is_err());
    }

    #[test]
    fn test_toolset_from_settings() {
        let set = ToolSet::from_settings(&ToolSettings::default()).unwrap();
        assert_eq!(set.names(), vec!["wikipedia", "arxiv"]);

        let specs = set.specs();
        assert_eq!(specs[0].name, "wikipedia");
        assert_eq!(specs[0].parameters["required"][0], "query");
        assert!(set.get("arxiv").is_some());
        assert!(set.get("calculator").is_none());
    }

    #[test]
    fn test_toolset_rejects_unknown_tool() {
        let settings = ToolSettings {
            enabled: vec!["wikipedia".to_string(), "calculator".to_string()],
            ..ToolSettings::default()
        };
        let err = ToolSet::from_settings(&settings).err().unwrap();
        assert!(err.to_string().contains("calculator"));
    }

    #[test]
    fn test_toolset_dedupes_by_name() {
        let settings = ToolSettings {
            enabled: vec!["wikipedia".to_string(), "wikipedia".to_string()],
            ..ToolSettings::default()
        };
        let set = ToolSet::from_settings(&settings).unwrap();
        assert_eq!(set.len(), 1);
    }
}
