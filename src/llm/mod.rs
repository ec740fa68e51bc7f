//! LLM provider module.
//!
//! This module provides a trait-based abstraction over streaming LLM
//! providers, with Anthropic as the built-in implementation.
//!
//! Supports multimodal content (text + base64 images).

mod anthropic;
mod error;
mod registry;
#[cfg(test)]
pub(crate) mod testing;

pub use anthropic::{AnthropicClient, AnthropicSettings};
pub use error::{classify_http_status, LlmError, LlmErrorKind};
pub use registry::{ConfigurationError, ProviderConfig, ProviderFactory, ProviderRegistry};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Role in a chat conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Providers only accept `user` and `assistant` turns; anything else is
    /// sent as `user`.
    pub fn normalized(self) -> Self {
        match self {
            Role::Assistant => Role::Assistant,
            Role::User | Role::System => Role::User,
        }
    }
}

/// Base64 image payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    /// Always `"base64"`.
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

/// Content part for multimodal messages (text or image).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { source: ImageSource },
}

impl ContentPart {
    /// Create a text content part.
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Create a base64 image content part.
    pub fn image(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        ContentPart::Image {
            source: ImageSource {
                source_type: "base64".to_string(),
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }
}

/// Message content - either simple text or multimodal (text + images).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    /// Create a simple text message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a multimodal message.
    pub fn with_parts(role: Role, parts: Vec<ContentPart>) -> Self {
        ChatMessage {
            role,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Static description of the model an adapter talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: String,
    /// Whether the model accepts screenshots and other rich input.
    pub supports_computer_use: bool,
    pub context_window: u32,
}

/// Token usage information (if provided by the upstream provider).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// One item of a provider stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Visible output text.
    Text(String),
    /// Extended-thinking text; never part of the response.
    Thinking(String),
    /// Cumulative usage as last reported by the provider.
    Usage(TokenUsage),
}

/// Lazy, non-restartable stream of provider output.
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, LlmError>>;

/// Uniform interface over a streaming LLM provider.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Describe the configured model. Performs no I/O.
    fn model(&self) -> ModelInfo;

    /// Open a streaming completion.
    ///
    /// `cancel` is observed while waiting for every provider event; once it
    /// fires the stream yields a `Cancelled` error and ends.
    async fn create_message(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        cancel: CancellationToken,
    ) -> Result<ChunkStream, LlmError>;
}
