/// Taskboard server entry point
///
/// Loads configuration from the environment and starts the HTTP server.
/// The server provides:
/// - Workflow management API at /api/workflows/*
/// - Per-workflow ACLs at /api/workflows/{id}/acl
/// - Health check at /healthz

use taskboard::{config::Config, server::start_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (defaults to 0.0.0.0:3001 and ./data/workflows)
    let config = Config::default();

    start_server(config).await
}
