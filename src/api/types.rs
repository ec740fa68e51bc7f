//! API request and response types.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::ProviderConfig;
use crate::prompt::image_payload;
use crate::task::TaskInput;

/// Body of `POST /api/task` and `POST /api/task/stream`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub task: String,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub custom_instructions: Option<String>,
    #[serde(alias = "providerConfig")]
    pub api_configuration: ProviderConfig,
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedTask {
    pub input: TaskInput,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl TaskRequest {
    /// Check the request shape. Runs before any provider is built.
    pub fn validate(self) -> Result<ValidatedTask, ValidationError> {
        if self.task.trim().is_empty() {
            return Err(ValidationError::new("task", "task must not be empty"));
        }

        let provider = self.api_configuration;
        if provider.provider.trim().is_empty() {
            return Err(ValidationError::new(
                "apiConfiguration.provider",
                "provider must not be empty",
            ));
        }
        if provider.api_key.trim().is_empty() {
            return Err(ValidationError::new(
                "apiConfiguration.apiKey",
                "apiKey must not be empty",
            ));
        }

        let images = self.images.unwrap_or_default();
        for (i, image) in images.iter().enumerate() {
            let (_, data) = image_payload(image);
            if data.is_empty() || STANDARD.decode(data).is_err() {
                return Err(ValidationError::new(
                    format!("images[{}]", i),
                    format!("images[{}] is not a valid base64 payload", i),
                ));
            }
        }

        Ok(ValidatedTask {
            input: TaskInput {
                task: self.task,
                images,
                custom_instructions: self.custom_instructions,
            },
            provider,
        })
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<String>,
}

/// Generic success response wrapper.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub details: serde_json::Value,
}

/// Body written by the centralized error handler.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> TaskRequest {
        serde_json::from_value(value).unwrap()
    }

    fn base() -> serde_json::Value {
        json!({
            "task": "write a haiku",
            "apiConfiguration": {"provider": "anthropic", "apiKey": "sk-ant"}
        })
    }

    #[test]
    fn test_minimal_request_is_valid() {
        let validated = parse(base()).validate().unwrap();
        assert_eq!(validated.input.task, "write a haiku");
        assert!(validated.input.images.is_empty());
        assert_eq!(validated.input.custom_instructions, None);
        assert_eq!(validated.provider.provider, "anthropic");
        assert_eq!(validated.provider.model, None);
    }

    #[test]
    fn test_provider_config_alias() {
        let request = parse(json!({
            "task": "t",
            "customInstructions": "be nice",
            "providerConfig": {"provider": "anthropic", "apiKey": "k", "model": "claude-3-haiku"}
        }));
        let validated = request.validate().unwrap();
        assert_eq!(validated.provider.model.as_deref(), Some("claude-3-haiku"));
        assert_eq!(validated.input.custom_instructions.as_deref(), Some("be nice"));
    }

    #[test]
    fn test_empty_task_rejected() {
        let mut value = base();
        value["task"] = json!("   ");
        let err = parse(value).validate().unwrap_err();
        assert_eq!(err.field, "task");
    }

    #[test]
    fn test_empty_credential_rejected() {
        let mut value = base();
        value["apiConfiguration"]["apiKey"] = json!("");
        let err = parse(value).validate().unwrap_err();
        assert_eq!(err.field, "apiConfiguration.apiKey");
    }

    #[test]
    fn test_images_must_be_base64() {
        let mut value = base();
        value["images"] = json!(["iVBORw0KGgo=", "data:image/png;base64,iVBORw0KGgo=", "not base64!"]);
        let err = parse(value).validate().unwrap_err();
        assert_eq!(err.field, "images[2]");

        let mut value = base();
        value["images"] = json!(["iVBORw0KGgo=", "data:image/png;base64,iVBORw0KGgo="]);
        assert_eq!(parse(value).validate().unwrap().input.images.len(), 2);
    }

    #[test]
    fn test_missing_configuration_fails_to_parse() {
        let result: Result<TaskRequest, _> = serde_json::from_value(json!({"task": "t"}));
        assert!(result.is_err());
    }
}
