//! Configuration settings for wikiagent.

use crate::error::{Result, WikiAgentError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub tools: ToolSettings,
    pub agent: AgentSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound for a single agent run triggered by a request.
    pub request_timeout_secs: u64,
    /// Largest accepted upload body in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 120,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Chat model provider settings.
///
/// Any OpenAI-compatible endpoint works; the default points at Groq.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// API key set directly in the config file (takes precedence over the env).
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
    /// Optional system prompt prepended to every conversation.
    pub system_prompt: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "gemma2-9b-it".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            api_key: None,
            timeout_secs: 300,
            temperature: None,
            system_prompt: None,
        }
    }
}

/// Which tools are bound to the model and how they are configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Tool names bound to the model, in order.
    pub enabled: Vec<String>,
    pub wikipedia: WikipediaSettings,
    pub arxiv: ArxivSettings,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            enabled: vec!["wikipedia".to_string(), "arxiv".to_string()],
            wikipedia: WikipediaSettings::default(),
            arxiv: ArxivSettings::default(),
        }
    }
}

/// Wikipedia lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikipediaSettings {
    pub top_k_results: usize,
    pub doc_content_chars_max: usize,
    /// Wikipedia language edition (subdomain).
    pub lang: String,
}

impl Default for WikipediaSettings {
    fn default() -> Self {
        Self {
            top_k_results: 1,
            doc_content_chars_max: 300,
            lang: "en".to_string(),
        }
    }
}

/// Arxiv lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivSettings {
    pub top_k_results: usize,
    pub doc_content_chars_max: usize,
    pub base_url: String,
}

impl Default for ArxivSettings {
    fn default() -> Self {
        Self {
            top_k_results: 1,
            doc_content_chars_max: 300,
            base_url: "http://export.arxiv.org/api/query".to_string(),
        }
    }
}

/// Agent graph execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum number of node executions per run.
    pub recursion_limit: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            recursion_limit: 25,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => Self::expand_path(&p.to_string_lossy()),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| WikiAgentError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wikiagent")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Resolve the LLM API key.
    ///
    /// Order: `llm.api_key`, the variable named by `llm.api_key_env`, then its
    /// lowercase spelling (older `.env` files use `groq_api_key`).
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = self.llm.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }

        let env_name = &self.llm.api_key_env;
        [env_name.clone(), env_name.to_lowercase()]
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                WikiAgentError::Config(format!(
                    "{} not set. Set it with: export {}='...' or add it to .env",
                    env_name, env_name
                ))
            })
    }

    /// Server bind address as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
