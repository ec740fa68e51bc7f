//! # Task Relay
//!
//! An HTTP relay that runs a single natural-language task against an LLM
//! provider and relays the model's output to the caller, either as a Server-Sent
//! Events stream of lifecycle events or as one aggregated JSON result.
//!
//! ## Architecture
//!
//! ```text
//!   HTTP client
//!       │  POST /api/task{,/stream}
//!       ▼
//!  ┌──────────┐   validate, build provider   ┌──────────────────┐
//!  │   api    │ ───────────────────────────▶ │ ProviderRegistry │
//!  └────┬─────┘                              └──────────────────┘
//!       │ spawn
//!       ▼
//!  ┌──────────────┐  system prompt + task    ┌──────────────────┐
//!  │ TaskExecutor │ ───────────────────────▶ │ ProviderAdapter  │
//!  └────┬─────────┘ ◀─── StreamChunk ─────── └──────────────────┘
//!       │ LifecycleEvent
//!       ▼
//!  SSE frames / aggregated result
//! ```
//!
//! ## Modules
//! - `llm`: Provider adapter trait, Anthropic client, provider registry
//! - `prompt`: System prompt and user message construction
//! - `task`: Per-task execution state machine and lifecycle events
//! - `api`: HTTP routes and error mapping
//! - `config`: Environment-driven configuration

pub mod api;
pub mod config;
pub mod llm;
pub mod prompt;
pub mod task;

pub use config::Config;
