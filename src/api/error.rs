//! Centralized API error handling.
//!
//! Every handler returns [`ApiError`] on failure; its `IntoResponse` impl is
//! the single place that writes `{success: false, error: {message, details}}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::llm::ConfigurationError;
use crate::task::TaskError;

use super::types::{ErrorBody, ErrorResponse, ValidationError};

#[derive(Debug, Error)]
pub enum ApiError {
    /// The body could not be read or decoded as a task request.
    #[error("Invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Body(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::Body(_) | ApiError::Validation(_) | ApiError::Configuration(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Task(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Body(_) | ApiError::Validation(_) => "ValidationError",
            ApiError::Configuration(_) => "ConfigurationError",
            ApiError::Task(TaskError::Provider(_)) => "ProviderError",
            ApiError::Task(_) | ApiError::Internal(_) => "InternalError",
        }
    }

    /// Best-effort structured description of the error.
    pub fn details(&self) -> Value {
        let mut details = json!({
            "name": self.error_type(),
            "message": self.to_string(),
        });

        match self {
            ApiError::Validation(e) => {
                details["field"] = json!(e.field);
            }
            ApiError::Task(TaskError::Provider(e)) => {
                details["kind"] = json!(e.kind.as_str());
                if let Some(status) = e.status {
                    details["status"] = json!(status);
                }
            }
            ApiError::Internal(e) => {
                let causes: Vec<String> = e.chain().skip(1).map(|c| c.to_string()).collect();
                if !causes.is_empty() {
                    details["causes"] = json!(causes);
                }
            }
            _ => {}
        }

        details
    }
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        ErrorResponse {
            success: false,
            error: ErrorBody {
                message: err.to_string(),
                details: err.details(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }
        (status, Json(ErrorResponse::from(self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    #[test]
    fn test_validation_error() {
        let err = ApiError::from(ValidationError::new("task", "task must not be empty"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let details = err.details();
        assert_eq!(details["name"], "ValidationError");
        assert_eq!(details["field"], "task");
    }

    #[test]
    fn test_configuration_error() {
        let err = ApiError::from(ConfigurationError::UnsupportedProvider("openai".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Unsupported provider: openai");
        assert_eq!(err.error_type(), "ConfigurationError");
    }

    #[test]
    fn test_provider_error_details() {
        let err = ApiError::from(TaskError::Provider(LlmError::from_status(429, "slow down")));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse::from(err);
        assert!(!body.success);
        assert_eq!(body.error.message, "rate_limited (429): slow down");
        assert_eq!(body.error.details["kind"], "rate_limited");
        assert_eq!(body.error.details["status"], 429);
    }

    #[test]
    fn test_internal_error_causes() {
        let inner = anyhow::anyhow!("disk full");
        let err = ApiError::from(inner.context("write failed"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.details()["causes"], json!(["disk full"]));
    }
}
