/// HTTP API Layer
///
/// REST endpoints over the workflow store:
/// - Workflow CRUD operations
/// - Per-workflow ACL read/replace

// Workflow management endpoints (GET/POST/PUT/DELETE)
pub mod workflows;

// Re-export router builder and state
pub use workflows::{create_workflow_routes, AppState};
