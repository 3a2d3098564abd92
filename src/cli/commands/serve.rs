//! Serve command implementation.

use crate::agent::WikiAgent;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::server::{self, AppState};
use anyhow::Result;
use std::sync::Arc;

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, mut settings: Settings) -> Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }

    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let agent = WikiAgent::from_settings(&settings)?;
    let model = agent.model_name().to_string();
    let tools = agent.tool_names().join(", ");

    let state = Arc::new(AppState::new(agent, &settings));
    let app = server::router(state, settings.server.max_upload_bytes);

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("wikiagent API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Model", &model);
    Output::kv("Tools", &tools);
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ask the agent", "POST /process-data/");
    Output::kv("Upload a file", "POST /upload-file/");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    server::serve(listener, app).await
}
