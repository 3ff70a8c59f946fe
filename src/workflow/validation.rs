/// Workflow identifier normalization and definition validation
///
/// Identifiers double as storage entry names, so every store operation runs them
/// through [`normalize_workflow_id`] before touching the filesystem. Definitions
/// are validated both when saved and when loaded back from disk.

use crate::error::{Result, WorkflowError};
use crate::workflow::types::WorkflowDefinition;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static WORKFLOW_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("workflow id pattern is valid")
});

/// Trim and check a raw workflow id
///
/// Rejects empty ids, anything carrying a path separator or `..`, and ids outside
/// `[A-Za-z0-9][A-Za-z0-9_-]*`. Returns the trimmed id.
pub fn normalize_workflow_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::validation("Workflow ID is required"));
    }

    // Traversal guard runs before the charset check so the error names the real problem
    if trimmed.contains('/') || trimmed.contains('\\') || trimmed.contains("..") {
        return Err(WorkflowError::validation(
            "Workflow ID contains illegal path characters",
        ));
    }

    if !WORKFLOW_ID_PATTERN.is_match(trimmed) {
        return Err(WorkflowError::validation(
            "Workflow ID must start with an alphanumeric character and may only contain letters, numbers, hyphen, or underscore",
        ));
    }

    Ok(trimmed.to_string())
}

/// Check required fields and internal references of a definition
///
/// Stops at the first failure. Duplicate agent or step ids are tolerated: only
/// membership in the id sets matters for reference checks.
pub fn validate_workflow(workflow: &WorkflowDefinition) -> Result<()> {
    if workflow.id.is_empty() || workflow.name.is_empty() || workflow.version.is_none() {
        return Err(WorkflowError::validation(
            "Workflow must have id, name, and version",
        ));
    }

    // The declared id must already be in normalized form, or a later path join could see a different name
    let normalized_id = normalize_workflow_id(&workflow.id)?;
    if normalized_id != workflow.id {
        return Err(WorkflowError::validation(
            "Workflow ID contains invalid characters",
        ));
    }

    if workflow.agents.is_empty() {
        return Err(WorkflowError::validation(
            "Workflow must define at least one agent",
        ));
    }

    if workflow.steps.is_empty() {
        return Err(WorkflowError::validation(
            "Workflow must define at least one step",
        ));
    }

    let agent_ids: HashSet<&str> = workflow.agents.iter().map(|a| a.id.as_str()).collect();
    let step_ids: HashSet<&str> = workflow.steps.iter().map(|s| s.id.as_str()).collect();

    for step in &workflow.steps {
        if step.step_type.requires_agent() {
            match step.agent.as_deref() {
                Some(agent) if agent_ids.contains(agent) => {}
                Some(agent) => {
                    return Err(WorkflowError::validation(format!(
                        "Step {} references unknown agent {}",
                        step.id, agent
                    )));
                }
                None => {
                    return Err(WorkflowError::validation(format!(
                        "Step {} of type {} must reference an agent",
                        step.id, step.step_type
                    )));
                }
            }
        }

        if let Some(target) = step
            .on_fail
            .as_ref()
            .and_then(|on_fail| on_fail.retry_step.as_deref())
            .filter(|target| !target.is_empty())
        {
            if !step_ids.contains(target) {
                return Err(WorkflowError::validation(format!(
                    "Step {} retry_step references unknown step {}",
                    step.id, target
                )));
            }
        }

        if let Some(target) = step
            .loop_config
            .as_ref()
            .and_then(|loop_config| loop_config.verify_step.as_deref())
            .filter(|target| !target.is_empty())
        {
            if !step_ids.contains(target) {
                return Err(WorkflowError::validation(format!(
                    "Step {} verify_step references unknown step {}",
                    step.id, target
                )));
            }
        }
    }

    Ok(())
}
