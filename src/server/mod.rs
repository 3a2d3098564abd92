//! HTTP API server.
//!
//! Exposes the agent to the chat frontend: `POST /process-data/` answers a
//! question, `POST /upload-file/` accepts a document, `GET /health` reports
//! liveness. CORS is wide open, as the frontend is served from another origin.

mod handlers;

use crate::agent::WikiAgent;
use crate::config::Settings;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::info;

/// Shared application state.
pub struct AppState {
    pub agent: WikiAgent,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(agent: WikiAgent, settings: &Settings) -> Self {
        Self {
            agent,
            request_timeout: Duration::from_secs(settings.server.request_timeout_secs),
        }
    }
}

/// Allow every origin, method and header, with credentials.
///
/// Credentials cannot be combined with a literal `*`, so the request's own
/// origin, method and headers are echoed back instead.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build the application router.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let upload = post(handlers::upload_file).layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/process-data/", post(handlers::process_data))
        .route("/process-data", post(handlers::process_data))
        .route("/upload-file/", upload.clone())
        .route("/upload-file", upload)
        .layer(cors_layer())
        .with_state(state)
}

/// Bind and serve until Ctrl+C.
pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
