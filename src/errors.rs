use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Body written for every failed API call.
///
/// `error` carries the canonical reason phrase of the status code so the
/// portal can branch on it without parsing `message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} was not found")]
    NotFound(String),

    #[error("invalid request: {0}")]
    ValidationError(String),

    #[error("invalid value: {0}")]
    InvalidInput(String),

    #[error("sign-in required: {0}")]
    Unauthorized(String),

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("backend call failed: {0}")]
    ExternalServiceError(String),

    #[error("unexpected backend payload: {0}")]
    SerializationError(String),

    #[error("backend unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::ValidationError(errors.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ServiceUnavailable("backend request timed out".to_string())
        } else {
            Self::ExternalServiceError(err.to_string())
        }
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        use ServiceError::*;
        match self {
            NotFound(_) => StatusCode::NOT_FOUND,
            ValidationError(_) | InvalidInput(_) => StatusCode::BAD_REQUEST,
            Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Forbidden(_) => StatusCode::FORBIDDEN,
            ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SerializationError(_) | InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the caller. Backend and internal failures are logged in
    /// full but answered with a fixed phrase.
    pub fn public_message(&self) -> String {
        match self {
            Self::ExternalServiceError(_) => "Backend request failed".to_string(),
            Self::SerializationError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "api call failed");
        }

        let body = ErrorBody {
            error: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.public_message(),
            request_id: crate::tracing::current_request_id().map(|id| id.as_str().to_owned()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
