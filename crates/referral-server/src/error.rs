use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{FormRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use referral_shared::SharedError;
use referral_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing or malformed form field, password mismatch, bad enum value.
    #[error("{0}")]
    Validation(String),

    /// Duplicate unique field or already-existing connection pair.
    #[error("{0}")]
    Conflict(String),

    /// No session, or credentials did not match.
    #[error("{0}")]
    Unauthenticated(&'static str),

    /// Caller is not the party allowed to perform this mutation.
    #[error("Unauthorized")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Upload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Upload storage error: {0}")]
    UploadStorage(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SharedError> for ServerError {
    fn from(e: SharedError) -> Self {
        ServerError::Validation(e.to_string())
    }
}

/// Malformed or wrongly typed form bodies answer in the same JSON shape as
/// every other error.
impl From<FormRejection> for ServerError {
    fn from(rejection: FormRejection) -> Self {
        ServerError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ServerError {
    fn from(rejection: MultipartRejection) -> Self {
        ServerError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(rejection: PathRejection) -> Self {
        ServerError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ServerError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, self.to_string())
            }
            ServerError::UploadStorage(_) => {
                tracing::error!(error = %self, "upload storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Upload storage error".to_string())
            }
            ServerError::Storage(_) | ServerError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ServerError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServerError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServerError::Unauthenticated("x"), StatusCode::UNAUTHORIZED),
            (ServerError::Forbidden, StatusCode::FORBIDDEN),
            (ServerError::NotFound("Doctor"), StatusCode::NOT_FOUND),
            (
                ServerError::Storage(StoreError::NotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_forbidden_message_is_generic() {
        assert_eq!(ServerError::Forbidden.to_string(), "Unauthorized");
    }
}
