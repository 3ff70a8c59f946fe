/// Server setup and initialization
///
/// Wires together configuration, the workflow store and the HTTP routes.
/// The store is constructed exactly once here and shared with handlers by `Arc`.

use crate::{
    api::workflows::{create_workflow_routes, AppState},
    config::Config,
    workflow::WorkflowStore,
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Create the main Axum application with all routes
///
/// Ensures the workflows directory exists before any handler can touch it.
pub async fn create_app(config: &Config) -> Result<Router> {
    tracing::info!(
        "📁 Ensuring workflows directory exists: {}",
        config.storage.workflows_dir.display()
    );
    let store = Arc::new(WorkflowStore::new(config.storage.workflows_dir.clone()));
    store
        .init()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create workflows directory: {}", e))?;

    Ok(build_router(store))
}

/// Build the router around an existing store
pub fn build_router(store: Arc<WorkflowStore>) -> Router {
    let app_state = AppState { store };

    Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        // Workflow management API routes
        .merge(create_workflow_routes().with_state(app_state))
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging, honouring RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Starting task board server...");

    let app = create_app(&config).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
