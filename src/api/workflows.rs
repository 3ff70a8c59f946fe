/// Workflow management REST API endpoints
///
/// Thin handlers over [`WorkflowStore`]: identifiers and definitions are passed
/// through raw and the store does all normalization and validation. Every
/// successful mutation is followed by an audit event.

use crate::{
    error::{Result, WorkflowError},
    workflow::{
        normalize_workflow_id, AuditEventType, WorkflowAcl, WorkflowAuditEvent,
        WorkflowDefinition, WorkflowStore,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// The process-wide workflow store, constructed once by the entry point
    pub store: Arc<WorkflowStore>,
}

/// Response for workflow creation/update operations
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub message: String,
}

/// Create workflow management routes
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", get(list_workflows).post(create_workflow))
        .route(
            "/api/workflows/{id}",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
        .route("/api/workflows/{id}/acl", get(get_acl).put(put_acl))
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// List all workflows
///
/// GET /api/workflows
/// Returns: { "workflows": [ { "id": "...", "name": "...", "agents": [...], "steps": [...] } ] }
async fn list_workflows(State(state): State<AppState>) -> Result<Json<Value>> {
    let workflows = state.store.list().await?;
    Ok(Json(json!({ "workflows": workflows })))
}

/// Get a specific workflow by ID
///
/// GET /api/workflows/{id}
async fn get_workflow(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    match state.store.load(&id).await? {
        Some(workflow) => Ok(Json(workflow).into_response()),
        None => Ok(error_response(
            StatusCode::NOT_FOUND,
            format!("Workflow {} not found", id.trim()),
        )),
    }
}

/// Create a new workflow
///
/// POST /api/workflows
/// Body: a workflow definition
async fn create_workflow(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Response> {
    let workflow = WorkflowDefinition::from_json_value(body)?;

    if state.store.load(&workflow.id).await?.is_some() {
        return Ok(error_response(
            StatusCode::CONFLICT,
            format!("Workflow {} already exists", workflow.id),
        ));
    }

    state.store.save(&workflow).await?;
    state
        .store
        .audit_change(
            &WorkflowAuditEvent::new(AuditEventType::Created, workflow.id.clone())
                .with_version(workflow.version.clone()),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(WorkflowResponse {
            id: workflow.id.clone(),
            message: format!("Workflow '{}' created successfully", workflow.name),
        }),
    )
        .into_response())
}

/// Update an existing workflow
///
/// PUT /api/workflows/{id}
/// Body: a workflow definition whose `id` matches the path
async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response> {
    let id = normalize_workflow_id(&id)?;
    let workflow = WorkflowDefinition::from_json_value(body)?;

    if workflow.id != id {
        return Err(WorkflowError::validation(format!(
            "Workflow ID {} does not match URL ID {}",
            workflow.id, id
        )));
    }

    if state.store.load(&id).await?.is_none() {
        return Ok(error_response(
            StatusCode::NOT_FOUND,
            format!("Workflow {} not found", id),
        ));
    }

    state.store.save(&workflow).await?;
    state
        .store
        .audit_change(
            &WorkflowAuditEvent::new(AuditEventType::Updated, id.clone())
                .with_version(workflow.version.clone()),
        )
        .await?;

    Ok(Json(WorkflowResponse {
        id,
        message: format!("Workflow '{}' updated successfully", workflow.name),
    })
    .into_response())
}

/// Delete a workflow
///
/// DELETE /api/workflows/{id}
async fn delete_workflow(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let id = normalize_workflow_id(&id)?;
    state.store.delete(&id).await?;
    state
        .store
        .audit_change(&WorkflowAuditEvent::new(AuditEventType::Deleted, id.clone()))
        .await?;

    Ok(Json(json!({ "message": format!("Workflow {} deleted successfully", id) })))
}

/// Get the ACL of a workflow
///
/// GET /api/workflows/{id}/acl
async fn get_acl(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let id = normalize_workflow_id(&id)?;
    match state.store.load_acl(&id).await? {
        Some(acl) => Ok(Json(acl).into_response()),
        None => Ok(error_response(
            StatusCode::NOT_FOUND,
            format!("No ACL for workflow {}", id),
        )),
    }
}

/// Replace the ACL of a workflow
///
/// PUT /api/workflows/{id}/acl
/// Body: { "owner": "...", "editors": [...], "viewers": [...], "executors": [...], "isPublic": false }
async fn put_acl(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut acl): Json<WorkflowAcl>,
) -> Result<Json<WorkflowAcl>> {
    acl.workflow_id = normalize_workflow_id(&id)?;
    state.store.save_acl(&acl).await?;
    Ok(Json(acl))
}
