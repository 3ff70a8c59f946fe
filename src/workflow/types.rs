/// Core workflow type definitions
///
/// Defines the workflow definition (agents + ordered steps + control edges), the
/// per-workflow ACL record and the audit event. Definitions are stored as YAML and
/// served as JSON; unknown keys are carried in `extra` maps so a save→load cycle
/// never drops data the board or an external editor put there.

use crate::error::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A complete workflow definition
///
/// Loaded from `<id>.yml` in the workflows directory. Referential integrity
/// (step → agent, retry/verify step targets) is checked by
/// [`validate_workflow`](crate::workflow::validation::validate_workflow), not by
/// deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique workflow identifier, also the storage entry name (e.g., "feature-dev")
    #[serde(default)]
    pub id: String,
    /// Human-readable workflow name
    #[serde(default)]
    pub name: String,
    /// Version marker; any value is accepted, including `0` and `null`, but the key must be present
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Agents that steps may reference by id
    #[serde(default)]
    pub agents: Vec<AgentDefinition>,
    /// Ordered execution steps
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    /// Any other top-level keys, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An agent role a step can be assigned to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single unit of execution within a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Step identifier, unique within the workflow; target of `retry_step`/`verify_step`
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Agent id; required for `agent` and `loop` steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_fail: Option<OnFailConfig>,
    #[serde(default, rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_config: Option<LoopConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Step kind
///
/// Only `agent` and `loop` steps reference an agent. Unrecognised kinds are kept
/// as `Other` with their original tag so they survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepType {
    Agent,
    Loop,
    Gate,
    Parallel,
    Other(String),
}

impl StepType {
    pub fn as_str(&self) -> &str {
        match self {
            StepType::Agent => "agent",
            StepType::Loop => "loop",
            StepType::Gate => "gate",
            StepType::Parallel => "parallel",
            StepType::Other(tag) => tag,
        }
    }

    /// Whether steps of this kind must name an agent
    pub fn requires_agent(&self) -> bool {
        matches!(self, StepType::Agent | StepType::Loop)
    }
}

impl From<String> for StepType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "agent" => StepType::Agent,
            "loop" => StepType::Loop,
            "gate" => StepType::Gate,
            "parallel" => StepType::Parallel,
            _ => StepType::Other(tag),
        }
    }
}

impl From<StepType> for String {
    fn from(step_type: StepType) -> Self {
        match step_type {
            StepType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure policy of a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnFailConfig {
    /// Number of retries before escalating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    /// Step to jump back to on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalate_to: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Iteration settings of a `loop` step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Expression yielding the items to iterate over
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub over: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_var: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<String>,
    /// Step run after each iteration to verify its output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_step: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowDefinition {
    /// Parse a definition from YAML
    ///
    /// Shape errors (missing step id, wrong field types) come back as validation
    /// errors; referential checks are left to the validator.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| WorkflowError::validation(format!("Invalid workflow YAML: {}", e)))
    }

    /// Parse a definition from an already-decoded JSON body
    pub fn from_json_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| WorkflowError::validation(format!("Invalid workflow definition: {}", e)))
    }

    /// Canonical serialized form written to storage
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Access control record for one workflow
///
/// All ACLs live in a single `.acl.json` document keyed by `workflowId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowAcl {
    #[serde(default)]
    pub workflow_id: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub editors: Vec<String>,
    #[serde(default)]
    pub viewers: Vec<String>,
    #[serde(default)]
    pub executors: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Kind of change recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEventType {
    #[serde(rename = "workflow.created")]
    Created,
    #[serde(rename = "workflow.updated")]
    Updated,
    #[serde(rename = "workflow.deleted")]
    Deleted,
    #[serde(rename = "workflow.run")]
    Run,
}

/// Immutable entry of the append-only audit log (`.audit.jsonl`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowAuditEvent {
    #[serde(rename = "type")]
    pub event_type: AuditEventType,
    pub workflow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_version: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Value>,
}

impl WorkflowAuditEvent {
    /// Create an event stamped with the current time
    pub fn new(event_type: AuditEventType, workflow_id: impl Into<String>) -> Self {
        Self {
            event_type,
            workflow_id: workflow_id.into(),
            workflow_version: None,
            user_id: None,
            timestamp: Utc::now(),
            changes: None,
        }
    }

    pub fn with_version(mut self, version: Option<Value>) -> Self {
        self.workflow_version = version;
        self
    }
}

/// Keeps an explicit `null` distinct from a missing key
fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
