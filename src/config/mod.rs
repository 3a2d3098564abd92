//! Configuration module for wikiagent.
//!
//! Handles loading and saving application settings.

mod settings;

pub use settings::{
    AgentSettings, ArxivSettings, GeneralSettings, LlmSettings, ServerSettings, Settings,
    ToolSettings, WikipediaSettings,
};
