//! Task identifiers, lifecycle events and results.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::llm::{LlmError, TokenUsage};

/// Identifier minted once per task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Input for one task execution.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub task: String,
    /// Base64 image payloads, in client order.
    pub images: Vec<String>,
    pub custom_instructions: Option<String>,
}

/// Orchestrator state. `Succeeded` and `Failed` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Successful task outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub task_id: TaskId,
    pub response: String,
    pub success: bool,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Failed task outcome, as carried by [`LifecycleEvent::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFailure {
    pub task_id: TaskId,
    pub error: String,
    pub success: bool,
    pub timestamp: i64,
}

impl TaskFailure {
    pub fn new(task_id: TaskId, error: impl Into<String>) -> Self {
        Self {
            task_id,
            error: error.into(),
            success: false,
            timestamp: now_millis(),
        }
    }
}

/// Event emitted while a task runs.
///
/// For one task the order is always `Start`, zero or more `Chunk`, then
/// exactly one of `Completion` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LifecycleEvent {
    #[serde(rename_all = "camelCase")]
    Start { task_id: TaskId, timestamp: i64 },
    /// `content` is the new fragment only; consumers concatenate.
    #[serde(rename_all = "camelCase")]
    Chunk {
        task_id: TaskId,
        content: String,
        timestamp: i64,
    },
    Completion(TaskResult),
    Error(TaskFailure),
}

impl LifecycleEvent {
    pub fn task_id(&self) -> TaskId {
        match self {
            LifecycleEvent::Start { task_id, .. } | LifecycleEvent::Chunk { task_id, .. } => {
                *task_id
            }
            LifecycleEvent::Completion(result) => result.task_id,
            LifecycleEvent::Error(failure) => failure.task_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleEvent::Completion(_) | LifecycleEvent::Error(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("Task {0} has already been started")]
    AlreadyStarted(TaskId),
}
