use artemis_core::{RepositoryError, WorkflowError};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Workflow(WorkflowError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Invalid(err) => ApiError::Validation(err.to_string()),
            RepositoryError::Workflow(err @ WorkflowError::NotFound { .. }) => {
                ApiError::NotFound(err.to_string())
            }
            RepositoryError::Workflow(err) => ApiError::Workflow(err),
            err @ RepositoryError::Duplicate { .. } => ApiError::Conflict(err.to_string()),
            RepositoryError::Storage(err) => ApiError::Internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Workflow(err) => {
                let body = json!({
                    "error": err.to_string(),
                    "code": err.code(),
                    "currentStage": err.current_stage(),
                    "attemptedStage": err.attempted_stage(),
                });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::Internal(err) => {
                error!(error = ?err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
