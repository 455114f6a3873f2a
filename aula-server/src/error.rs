//! Server error types and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use aula_core::StoreError;

/// Errors that can occur while serving a request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or wrong credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// The request body failed validation.
    #[error("{0}")]
    BadRequest(String),

    /// The referenced entity does not exist.
    #[error("not found")]
    NotFound,

    /// The store rejected a read or write.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A vendor API call failed.
    #[error("provider error: {0}")]
    Provider(#[from] aula_providers::ProviderError),

    /// The job log rejected an append.
    #[error("queue error: {0}")]
    Queue(#[from] aula_queue::Error),

    /// An inline processing run failed.
    #[error("processing error: {0}")]
    Processing(#[from] aula_worker::WorkerError),

    /// Failed to bind the listen address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::LessonNotFound(_))
            | ApiError::Store(StoreError::AssignmentNotFound { .. }) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn unauthorized_maps_to_401() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn missing_lesson_maps_to_404() {
        let err = ApiError::Store(StoreError::LessonNotFound(Uuid::new_v4()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn backend_store_error_maps_to_500() {
        let err = ApiError::Store(StoreError::Backend("down".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
