//! HTTP API.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /api/providers` - Registered provider names
//! - `POST /api/task` - Run a task, respond with the aggregated result
//! - `POST /api/task/stream` - Run a task, relay lifecycle events via SSE

pub mod error;
pub mod routes;
pub mod types;

pub use error::ApiError;
pub use routes::{router, serve, AppState};
