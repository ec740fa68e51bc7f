//! Per-task execution state machine.
//!
//! A [`TaskExecutor`] drives exactly one task: it builds the prompt, opens the
//! provider stream, republishes each text fragment as a
//! [`LifecycleEvent::Chunk`] and finishes with one terminal event. The
//! terminal event is always sent to subscribers before `execute_task`
//! returns, so a subscriber attached beforehand never observes the result
//! ahead of the event.

use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::llm::{LlmError, ProviderAdapter, StreamChunk, TokenUsage};
use crate::prompt::{self, PromptContext};

use super::types::{
    now_millis, LifecycleEvent, TaskError, TaskFailure, TaskId, TaskInput, TaskResult, TaskState,
};

pub struct TaskExecutor {
    id: TaskId,
    provider: Arc<dyn ProviderAdapter>,
    working_dir: PathBuf,
    state: TaskState,
    subscribers: Vec<mpsc::UnboundedSender<LifecycleEvent>>,
}

impl TaskExecutor {
    pub fn new(provider: Arc<dyn ProviderAdapter>, working_dir: PathBuf) -> Self {
        Self {
            id: TaskId::new(),
            provider,
            working_dir,
            state: TaskState::Idle,
            subscribers: Vec::new(),
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Receive every lifecycle event emitted from now on.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<LifecycleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_subscriber(tx);
        rx
    }

    /// Forward events into an existing channel.
    pub fn add_subscriber(&mut self, tx: mpsc::UnboundedSender<LifecycleEvent>) {
        self.subscribers.push(tx);
    }

    /// A subscriber that has gone away is not an error for the task.
    fn emit(&self, event: LifecycleEvent) {
        for tx in &self.subscribers {
            let _ = tx.send(event.clone());
        }
    }

    /// Run the task to completion.
    ///
    /// On failure the `Error` event is emitted and the original error is
    /// returned. A second call on the same executor returns
    /// [`TaskError::AlreadyStarted`] without emitting anything.
    pub async fn execute_task(
        &mut self,
        input: TaskInput,
        cancel: CancellationToken,
    ) -> Result<TaskResult, TaskError> {
        if self.state != TaskState::Idle {
            return Err(TaskError::AlreadyStarted(self.id));
        }

        self.state = TaskState::Running;
        tracing::debug!("Task {} running", self.id);
        self.emit(LifecycleEvent::Start {
            task_id: self.id,
            timestamp: now_millis(),
        });

        match self.run(input, cancel).await {
            Ok(result) => {
                self.state = TaskState::Succeeded;
                tracing::debug!(
                    "Task {} succeeded ({} chars)",
                    self.id,
                    result.response.len()
                );
                self.emit(LifecycleEvent::Completion(result.clone()));
                Ok(result)
            }
            Err(error) => {
                self.state = TaskState::Failed;
                if error.is_cancelled() {
                    tracing::info!("Task {} cancelled", self.id);
                } else {
                    tracing::warn!("Task {} failed: {}", self.id, error);
                }
                self.emit(LifecycleEvent::Error(TaskFailure::new(
                    self.id,
                    error.to_string(),
                )));
                Err(TaskError::Provider(error))
            }
        }
    }

    async fn run(&self, input: TaskInput, cancel: CancellationToken) -> Result<TaskResult, LlmError> {
        let model = self.provider.model();
        let system_prompt = prompt::system_prompt(&PromptContext {
            cwd: self.working_dir.clone(),
            supports_computer_use: model.supports_computer_use,
            custom_instructions: input.custom_instructions,
        });
        let messages = prompt::user_messages(&input.task, &input.images);

        tracing::debug!(
            "Task {} opening stream: model={}, images={}",
            self.id,
            model.id,
            input.images.len()
        );
        let mut stream = self
            .provider
            .create_message(&system_prompt, &messages, cancel.clone())
            .await?;

        let mut response = String::new();
        let mut usage: Option<TokenUsage> = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LlmError::cancelled()),
                next = stream.next() => next,
            };

            let Some(chunk) = next else {
                break;
            };

            match chunk? {
                StreamChunk::Text(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    response.push_str(&text);
                    self.emit(LifecycleEvent::Chunk {
                        task_id: self.id,
                        content: text,
                        timestamp: now_millis(),
                    });
                }
                StreamChunk::Thinking(text) => {
                    tracing::trace!("Task {} thinking: {} chars", self.id, text.len());
                }
                StreamChunk::Usage(u) => usage = Some(u),
            }
        }

        Ok(TaskResult {
            task_id: self.id,
            response,
            success: true,
            timestamp: now_millis(),
            usage,
        })
    }
}
