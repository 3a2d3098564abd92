//! Tool command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::tools::ToolSet;
use anyhow::{bail, Result};

/// Call a single tool with `query` and print its output.
pub async fn run_tool(name: &str, query: &str, mut settings: Settings) -> Result<()> {
    preflight::check(Operation::Tool, &settings)?;

    // Any known tool can be called directly, enabled or not.
    settings.tools.enabled = vec![name.to_string()];
    let tools = match ToolSet::from_settings(&settings.tools) {
        Ok(tools) => tools,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let Some(tool) = tools.get(name) else {
        bail!("Tool '{}' is not available", name);
    };

    let spinner = Output::spinner(&format!("Querying {}...", name));
    let result = tool.call(serde_json::json!({ "query": query })).await;
    spinner.finish_and_clear();

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("{} failed: {}", name, e));
            Err(e.into())
        }
    }
}
