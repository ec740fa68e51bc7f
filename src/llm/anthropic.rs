//! Anthropic Messages API client with SSE streaming.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{retry, Event, EventSource};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::error::{extract_provider_message, LlmError};
use super::{ChatMessage, ChunkStream, ModelInfo, ProviderAdapter, StreamChunk, TokenUsage};

pub const DEFAULT_ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-opus-20240229";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const CONTEXT_WINDOW: u32 = 128_000;

/// Process-wide knobs for the Anthropic adapter.
#[derive(Debug, Clone)]
pub struct AnthropicSettings {
    pub base_url: String,
    pub max_tokens: u32,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ANTHROPIC_API_URL.to_string(),
            max_tokens: 4096,
        }
    }
}

/// Streaming client for one API key and model.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    settings: AnthropicSettings,
}

impl AnthropicClient {
    /// Create a client. `model` falls back to [`DEFAULT_ANTHROPIC_MODEL`].
    pub fn new(
        client: Client,
        api_key: String,
        model: Option<String>,
        settings: AnthropicSettings,
    ) -> Self {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
        Self {
            client,
            api_key,
            model,
            settings,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.settings.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(
        &'a self,
        system_prompt: &'a str,
        messages: &[ChatMessage],
    ) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            system: system_prompt,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.normalized(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: self.settings.max_tokens,
            stream: true,
        }
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicClient {
    fn model(&self) -> ModelInfo {
        ModelInfo {
            id: self.model.clone(),
            supports_computer_use: true,
            context_window: CONTEXT_WINDOW,
        }
    }

    async fn create_message(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        cancel: CancellationToken,
    ) -> Result<ChunkStream, LlmError> {
        if messages.is_empty() {
            return Err(LlmError::invalid_request("At least one message is required"));
        }

        let request = self.build_request(system_prompt, messages);
        let builder = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request);

        let mut source = EventSource::new(builder)
            .map_err(|e| LlmError::invalid_request(format!("Failed to build request: {}", e)))?;
        source.set_retry_policy(Box::new(retry::Never));

        tracing::debug!(
            "Opening Anthropic stream: model={}, messages={}",
            self.model,
            messages.len()
        );

        let stream = async_stream::stream! {
            let mut source = source;
            let mut parser = StreamParser::default();

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    next = source.next() => Some(next),
                };

                let item = match next {
                    Some(Some(item)) => item,
                    Some(None) => {
                        yield Err(truncated());
                        break;
                    }
                    None => {
                        source.close();
                        yield Err(LlmError::cancelled());
                        break;
                    }
                };

                match item {
                    Ok(Event::Open) => {
                        tracing::trace!("Anthropic stream opened");
                    }
                    Ok(Event::Message(message)) => {
                        match parser.parse_event(&message.event, &message.data) {
                            Ok(Some(Parsed::Chunk(chunk))) => yield Ok(chunk),
                            Ok(Some(Parsed::Stop)) => {
                                source.close();
                                break;
                            }
                            Ok(None) => {}
                            Err(e) => {
                                source.close();
                                yield Err(e);
                                break;
                            }
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => {
                        source.close();
                        yield Err(truncated());
                        break;
                    }
                    Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                        source.close();
                        let body = response.text().await.unwrap_or_default();
                        yield Err(LlmError::from_status(status.as_u16(), &body));
                        break;
                    }
                    Err(reqwest_eventsource::Error::Transport(e)) => {
                        source.close();
                        let message = if e.is_timeout() {
                            format!("Request timeout: {}", e)
                        } else if e.is_connect() {
                            format!("Connection failed: {}", e)
                        } else {
                            format!("Request failed: {}", e)
                        };
                        yield Err(LlmError::network_error(message));
                        break;
                    }
                    Err(e) => {
                        source.close();
                        yield Err(LlmError::parse_error(format!("Invalid event stream: {}", e)));
                        break;
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}

/// Anthropic API request format.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Parsed {
    Chunk(StreamChunk),
    Stop,
}

/// Turns `(event, data)` pairs into stream chunks.
///
/// Usage arrives split across `message_start` (input tokens) and
/// `message_delta` (running output tokens), so it is accumulated here.
#[derive(Debug, Default)]
struct StreamParser {
    usage: TokenUsage,
}

impl StreamParser {
    fn parse_event(&mut self, event: &str, data: &str) -> Result<Option<Parsed>, LlmError> {
        match event {
            "content_block_delta" => {
                let v = parse_json(data)?;
                let delta = &v["delta"];
                match delta["type"].as_str().unwrap_or_default() {
                    "text_delta" => Ok(Some(Parsed::Chunk(StreamChunk::Text(
                        json_string(delta, "text"),
                    )))),
                    "thinking_delta" => Ok(Some(Parsed::Chunk(StreamChunk::Thinking(
                        json_string(delta, "thinking"),
                    )))),
                    other => {
                        tracing::trace!("Ignoring content delta of type {}", other);
                        Ok(None)
                    }
                }
            }

            "message_start" => {
                let v = parse_json(data)?;
                let usage = &v["message"]["usage"];
                self.usage.input_tokens = usage["input_tokens"].as_u64().unwrap_or(0);
                self.usage.output_tokens = usage["output_tokens"].as_u64().unwrap_or(0);
                Ok(Some(Parsed::Chunk(StreamChunk::Usage(self.usage))))
            }

            "message_delta" => {
                let v = parse_json(data)?;
                match v["usage"]["output_tokens"].as_u64() {
                    Some(output) => {
                        self.usage.output_tokens = output;
                        Ok(Some(Parsed::Chunk(StreamChunk::Usage(self.usage))))
                    }
                    None => Ok(None),
                }
            }

            "message_stop" => Ok(Some(Parsed::Stop)),

            "error" => {
                let message = extract_provider_message(data).unwrap_or_else(|| data.to_string());
                let error_type = serde_json::from_str::<Value>(data)
                    .ok()
                    .and_then(|v| v["error"]["type"].as_str().map(|s| s.to_string()))
                    .unwrap_or_else(|| "error".to_string());
                Err(LlmError::server_error(format!("{}: {}", error_type, message)))
            }

            "ping" | "content_block_start" | "content_block_stop" => Ok(None),

            other => {
                tracing::trace!("Ignoring unknown stream event {}", other);
                Ok(None)
            }
        }
    }
}

/// The connection closed before `message_stop`; partial output is discarded.
fn truncated() -> LlmError {
    LlmError::network_error("Stream ended before message_stop")
}

fn parse_json(data: &str) -> Result<Value, LlmError> {
    serde_json::from_str(data)
        .map_err(|e| LlmError::parse_error(format!("Failed to parse stream event: {}, data: {}", e, data)))
}

fn json_string(v: &Value, field: &str) -> String {
    v[field].as_str().unwrap_or_default().to_string()
}
