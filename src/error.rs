/// Error types for workflow definition storage
///
/// `WorkflowError` is returned by every store operation. Validation failures are
/// user-correctable and carry a message naming the offending field or entity;
/// storage failures wrap the underlying I/O error untouched so callers can tell
/// "not found" apart from permission or disk problems.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Bad identifier, missing field, dangling reference or malformed content
    #[error("{0}")]
    Validation(String),

    /// Filesystem failure (including not-found where the operation does not tolerate it)
    #[error("storage error: {0}")]
    Storage(#[from] io::Error),

    /// Failure to serialize a definition, or a corrupt ACL document
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for workflow store operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }

    /// True when the underlying storage entry does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkflowError::Storage(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for WorkflowError {
    fn from(err: serde_yaml::Error) -> Self {
        WorkflowError::Serialization(err.to_string())
    }
}

impl axum::response::IntoResponse for WorkflowError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
