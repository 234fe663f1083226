//! HTTP surface: `POST /api/chat`, `GET /health`, CORS and request tracing.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mindgraph_core::{ChatOutcome, ChatPipeline};
use mindgraph_shared::MindGraphError;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for all handlers.
pub(crate) struct AppState {
    pub pipeline: ChatPipeline,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub outcome: ChatOutcome,
}

/// Build the application router.
pub(crate) fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy for the configured browser origins.
pub(crate) fn cors_layer(origins: &[String]) -> Result<CorsLayer, MindGraphError> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|e| MindGraphError::config(format!("invalid CORS origin {o:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    let outcome = state.pipeline.run(&request.message).await?;
    Ok(Json(ChatResponse {
        status: "success",
        outcome,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Client-facing failure: a status code and a `{"detail": ...}` body.
///
/// Internal error text is never sent to the client, except for validation
/// messages which describe the client's own input. Failures are logged once,
/// by the pipeline, together with the stage they happened in.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<MindGraphError> for ApiError {
    fn from(err: MindGraphError) -> Self {
        let (status, detail) = match &err {
            MindGraphError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone()),
            MindGraphError::AiTransport(_) => (
                StatusCode::BAD_GATEWAY,
                "The AI service is unavailable. Please try again later.".to_string(),
            ),
            MindGraphError::EmptyResponse | MindGraphError::MalformedResponse { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The AI service returned an invalid response.".to_string(),
            ),
            MindGraphError::Persistence(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save the knowledge graph.".to_string(),
            ),
            MindGraphError::Config { .. } | MindGraphError::Io { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error.".to_string(),
            ),
        };

        Self { status, detail }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}
