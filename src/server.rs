//! HTTP server.
//!
//! Exposes the mode services as a JSON API for the browser front end.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/search` | Web search with contents, highlights, and summaries |
//! | `POST` | `/api/answer` | Direct answer with citations |
//! | `POST` | `/api/code` | Programming answer with conversation context |
//! | `POST` | `/api/contents` | Full contents for result ids |
//! | `POST` | `/api/research` | Run a research task to completion |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Every failure is a JSON body with a single message:
//!
//! ```json
//! { "error": "Query is required" }
//! ```
//!
//! Research failures and timeouts also carry the task outcome:
//!
//! ```json
//! { "error": "Research task timed out", "status": "timeout" }
//! ```
//!
//! Status codes: 400 invalid input, 404 empty answer, 500 configuration or
//! upstream failure, 503 cancelled, 504 research timeout.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the front end can be
//! served from a different origin.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ScoutError;
use crate::models::{
    AnswerRequest, AnswerResponse, CodeRequest, ContentsRequest, ContentsResponse,
    ResearchReport, ResearchRequest, SearchRequest, SearchResponse,
};
use crate::research::ResearchOutcome;
use crate::service::Scout;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    scout: Scout,
    /// Cancelled on graceful shutdown; research loops watch child tokens.
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(scout: Scout, shutdown: CancellationToken) -> Self {
        Self { scout, shutdown }
    }
}

/// Builds the router with all routes and layers attached.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/search", post(handle_search))
        .route("/api/answer", post(handle_answer))
        .route("/api/code", post(handle_code))
        .route("/api/contents", post(handle_contents))
        .route("/api/research", post(handle_research))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind`.
///
/// Runs until Ctrl-C. On shutdown, in-flight research loops are cancelled so
/// the process does not wait out their poll budget.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let scout = Scout::from_config(Arc::new(config.clone()))?;
    let shutdown = CancellationToken::new();
    let app = build_router(AppState::new(scout, shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    body: ErrorBody,
}

impl From<ScoutError> for AppError {
    fn from(err: ScoutError) -> Self {
        let status = err.status_code();
        if status.is_server_error() {
            tracing::error!(error = %err, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %err, status = status.as_u16(), "request rejected");
        }
        AppError {
            status,
            body: ErrorBody {
                error: err.to_string(),
                status: err.research_status(),
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::from(ScoutError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    /// Whether an Exa API key was found at startup.
    configured: bool,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        configured: state.scout.config().has_credential(),
    })
}

// ============ POST /api/* ============

async fn handle_search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(req) = payload?;
    Ok(Json(state.scout.search(req).await?))
}

async fn handle_answer(
    State(state): State<AppState>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError> {
    let Json(req) = payload?;
    Ok(Json(state.scout.answer(req).await?))
}

async fn handle_code(
    State(state): State<AppState>,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError> {
    let Json(req) = payload?;
    Ok(Json(state.scout.code(req).await?))
}

async fn handle_contents(
    State(state): State<AppState>,
    payload: Result<Json<ContentsRequest>, JsonRejection>,
) -> Result<Json<ContentsResponse>, AppError> {
    let Json(req) = payload?;
    Ok(Json(state.scout.contents(req).await?))
}

/// Handler for `POST /api/research`.
///
/// Blocks until the task finishes. The poll loop runs on its own task; if
/// the client disconnects, axum drops this future and the drop guard
/// cancels the loop.
async fn handle_research(
    State(state): State<AppState>,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<Json<ResearchReport>, AppError> {
    let Json(req) = payload?;

    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let scout = state.scout.clone();
    let outcome = tokio::spawn(async move { scout.research(req, &cancel).await })
        .await
        .map_err(|e| ScoutError::PollFailed(format!("research task aborted: {}", e)))??;

    match outcome {
        ResearchOutcome::Completed(report) => Ok(Json(report)),
        ResearchOutcome::TimedOut { task_id, attempts } => {
            Err(ScoutError::TimedOut { task_id, attempts }.into())
        }
    }
}
