//! Mapping from domain errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use vodpipe_core::{MediaError, OrchestratorError, StorageError};

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(self) -> String {
        match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Internal(m) => m,
        }
    }

    pub fn media_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Media not found: {}", id))
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::NotFound(id) => ApiError::media_not_found(&id),
            MediaError::Validation(_) => ApiError::BadRequest(err.to_string()),
            MediaError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            MediaError::Database(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::NotFound(id) => ApiError::media_not_found(&id),
            OrchestratorError::InvalidState { .. } | OrchestratorError::AlreadyProcessing(_) => {
                ApiError::Conflict(err.to_string())
            }
            OrchestratorError::Store(e) => e.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        if err.is_unauthorized() {
            return ApiError::Unauthorized(err.to_string());
        }
        match err {
            StorageError::InvalidKey { .. } => ApiError::BadRequest(err.to_string()),
            StorageError::NotFound { .. } | StorageError::LocalFileNotFound { .. } => {
                ApiError::NotFound(err.to_string())
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.message();
        if status.is_server_error() {
            error!(status = %status, "Request failed: {}", error);
        }
        (status, Json(ErrorResponse { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vodpipe_core::MediaStatus;

    #[test]
    fn test_orchestrator_errors_map_to_status() {
        let cases = [
            (
                OrchestratorError::NotFound("a".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                OrchestratorError::InvalidState {
                    id: "a".into(),
                    status: MediaStatus::Ready,
                },
                StatusCode::CONFLICT,
            ),
            (
                OrchestratorError::AlreadyProcessing("a".into()),
                StatusCode::CONFLICT,
            ),
            (
                OrchestratorError::Store(MediaError::Database("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_storage_signature_errors_are_unauthorized() {
        assert_eq!(
            ApiError::from(StorageError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(StorageError::SignatureMismatch).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(StorageError::invalid_key("../x")).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_validation_is_bad_request() {
        let err = MediaError::validation("title must not be empty");
        assert_eq!(ApiError::from(err).status(), StatusCode::BAD_REQUEST);
    }
}
