//! HTTP error mapping shared by all handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::ingest::IngestError;
use crate::query::InvalidDate;
use crate::store::StoreError;

/// Errors surfaced by the HTTP API. Rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A blocking task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::ProjectNotFound(_) => ApiError::NotFound("Project"),
            IngestError::InvalidSignature => ApiError::InvalidSignature,
            IngestError::Storage(e) => ApiError::Store(e),
        }
    }
}

impl From<InvalidDate> for ApiError {
    fn from(err: InvalidDate) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::InvalidSignature => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Store(StoreError::DuplicateName(_)) => (
                StatusCode::BAD_REQUEST,
                "Project name already exists".to_string(),
            ),
            ApiError::Store(StoreError::ProjectNotFound(_)) => {
                (StatusCode::NOT_FOUND, "Project not found".to_string())
            }
            ApiError::Store(_) | ApiError::Internal(_) => {
                error!(error = %self, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProjectId;
    use http_body_util::BodyExt;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn maps_statuses_and_messages() {
        let (status, body) = render(ApiError::NotFound("Project")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Project not found");

        let (status, body) = render(IngestError::InvalidSignature.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid signature");

        let (status, body) = render(StoreError::DuplicateName("demo".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Project name already exists");
    }

    #[tokio::test]
    async fn ingest_storage_errors_are_500() {
        let err = IngestError::Storage(StoreError::Poisoned);
        let (status, _) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let missing = StoreError::ProjectNotFound(ProjectId::parse("p1").unwrap());
        let (status, _) = render(missing.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
