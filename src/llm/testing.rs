//! Scripted provider for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::{ChatMessage, ChunkStream, LlmError, ModelInfo, ProviderAdapter, StreamChunk};

/// Replays a fixed script of chunks, yielding to the scheduler between items.
pub(crate) struct StubProvider {
    script: Vec<Result<StreamChunk, LlmError>>,
    /// Never finish after the script has been replayed.
    hang: bool,
    open_error: Option<LlmError>,
    calls: AtomicUsize,
    last_request: Mutex<Option<(String, Vec<ChatMessage>)>>,
    last_cancel: Mutex<Option<CancellationToken>>,
}

impl StubProvider {
    fn scripted(script: Vec<Result<StreamChunk, LlmError>>) -> Self {
        Self {
            script,
            hang: false,
            open_error: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            last_cancel: Mutex::new(None),
        }
    }

    fn texts(chunks: &[&str]) -> Vec<Result<StreamChunk, LlmError>> {
        chunks
            .iter()
            .map(|c| Ok(StreamChunk::Text(c.to_string())))
            .collect()
    }

    pub fn text(chunks: &[&str]) -> Self {
        Self::scripted(Self::texts(chunks))
    }

    pub fn with_script(script: Vec<Result<StreamChunk, LlmError>>) -> Self {
        Self::scripted(script)
    }

    pub fn failing_after(chunks: &[&str], error: LlmError) -> Self {
        let mut script = Self::texts(chunks);
        script.push(Err(error));
        Self::scripted(script)
    }

    pub fn failing_to_open(error: LlmError) -> Self {
        let mut stub = Self::scripted(Vec::new());
        stub.open_error = Some(error);
        stub
    }

    pub fn hanging(chunks: &[&str]) -> Self {
        let mut stub = Self::text(chunks);
        stub.hang = true;
        stub
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Token handed to the most recent `create_message` call.
    pub fn last_cancel(&self) -> Option<CancellationToken> {
        self.last_cancel.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<(String, Vec<ChatMessage>)> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAdapter for StubProvider {
    fn model(&self) -> ModelInfo {
        ModelInfo {
            id: "stub-model".to_string(),
            supports_computer_use: false,
            context_window: 8_000,
        }
    }

    async fn create_message(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        cancel: CancellationToken,
    ) -> Result<ChunkStream, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some((system_prompt.to_string(), messages.to_vec()));
        *self.last_cancel.lock().unwrap() = Some(cancel);

        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }

        let replay = futures::stream::iter(self.script.clone()).then(|item| async move {
            tokio::task::yield_now().await;
            item
        });

        if self.hang {
            Ok(replay.chain(futures::stream::pending()).boxed())
        } else {
            Ok(replay.boxed())
        }
    }
}
