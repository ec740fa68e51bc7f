//! HTTP route handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::llm::ProviderRegistry;
use crate::task::{TaskExecutor, TaskInput, TaskResult};

use super::error::ApiError;
use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub providers: ProviderRegistry,
    /// Parent of every task's cancellation token; cancelled on shutdown.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config, providers: ProviderRegistry) -> Self {
        Self {
            config,
            providers,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/providers", get(list_providers))
        .route("/api/task", post(run_task))
        .route("/api/task/stream", post(stream_task))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let http = reqwest::Client::new();
    let providers = ProviderRegistry::with_defaults(http, config.anthropic.clone());
    tracing::info!("Registered providers: {:?}", providers.providers());
    tracing::info!("Working directory: {}", config.working_dir.display());

    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config, providers));
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, cancelling in-flight tasks...");
            shutdown.cancel();
        })
        .await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// List registered provider names.
async fn list_providers(State(state): State<Arc<AppState>>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: state.providers.providers(),
    })
}

/// Validate the body and build an executor for it.
///
/// Nothing here touches the network: an invalid body or unknown provider is
/// rejected before any provider call.
fn prepare(
    state: &AppState,
    body: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<(TaskExecutor, TaskInput), ApiError> {
    let Json(request) = body?;
    let validated = request.validate()?;
    let provider = state.providers.build(&validated.provider)?;
    let executor = TaskExecutor::new(provider, state.config.working_dir.clone());
    Ok((executor, validated.input))
}

/// Run a task and return the aggregated result.
async fn run_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse<TaskResult>>, ApiError> {
    let (mut executor, input) = prepare(&state, body)?;
    tracing::info!("Task {} started (aggregate)", executor.task_id());

    // Dropping this handler (client gone) cancels the provider stream.
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let result = executor.execute_task(input, cancel).await?;
    Ok(Json(SuccessResponse::new(result)))
}

/// Run a task and relay its lifecycle events via SSE.
///
/// The stream ends right after the terminal event. If the client disconnects
/// first, the dropped stream cancels the task.
async fn stream_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (mut executor, input) = prepare(&state, body)?;
    let task_id = executor.task_id();
    tracing::info!("Task {} started (stream)", task_id);

    let mut events = executor.subscribe();
    let cancel = state.shutdown.child_token();
    let guard = cancel.clone().drop_guard();

    // The outcome reaches the client as the terminal event.
    tokio::spawn(async move {
        let _ = executor.execute_task(input, cancel).await;
    });

    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = events.recv().await {
            let terminal = event.is_terminal();
            match Event::default().json_data(&event) {
                Ok(frame) => yield Ok(frame),
                Err(e) => tracing::error!("Failed to encode event for task {}: {}", task_id, e),
            }
            if terminal {
                break;
            }
        }
    };

    Ok(Sse::new(stream))
}
