/// Taskboard: kanban board backend for orchestrating AI coding-agent workflows
///
/// This library provides the workflow definition store: identifier normalization,
/// referential-integrity validation, cache-coherent CRUD over YAML entries, a
/// shared ACL document and an append-only audit log.

// Core configuration and setup
pub mod config;

// Error type shared by the store and the HTTP layer
pub mod error;

// Workflow management layer - definitions, validation, storage and store
pub mod workflow;

// HTTP API layer - REST endpoints over the workflow store
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{Result, WorkflowError};
pub use server::start_server;
pub use workflow::{WorkflowAcl, WorkflowAuditEvent, WorkflowDefinition, WorkflowStore};
