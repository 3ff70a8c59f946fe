/// Workflow Management Layer
///
/// This module handles workflow definitions, validation and file-backed storage:
/// - Type definitions (WorkflowDefinition, StepDefinition, WorkflowAcl, WorkflowAuditEvent)
/// - Identifier normalization and referential-integrity validation
/// - Directory-backed entry storage
/// - Cache-coherent store with ACL and audit operations

// Core workflow type definitions
pub mod types;

// Identifier safety and definition checks
pub mod validation;

// Filesystem persistence for workflow entries, ACL document and audit log
pub mod storage;

// Read-through cached store over storage
pub mod store;

// Re-export commonly used types
pub use store::WorkflowStore;
pub use types::{
    AgentDefinition, AuditEventType, LoopConfig, OnFailConfig, StepDefinition, StepType,
    WorkflowAcl, WorkflowAuditEvent, WorkflowDefinition,
};
pub use validation::{normalize_workflow_id, validate_workflow};
