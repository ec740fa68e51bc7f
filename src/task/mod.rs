//! Task module - lifecycle events and the per-task executor.
//!
//! - All types use algebraic data types with exhaustive matching
//! - One executor owns one task; nothing is shared between executions

mod executor;
mod types;

pub use executor::TaskExecutor;
pub use types::{
    now_millis, LifecycleEvent, TaskError, TaskFailure, TaskId, TaskInput, TaskResult, TaskState,
};
