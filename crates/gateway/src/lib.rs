//! HTTP API gateway for Routewise.
//!
//! Exposes the orchestrator over REST: chat, category listing and
//! session inspection. Built on Axum.

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use routewise_agent::Orchestrator;
use routewise_core::message::{SessionId, Turn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS allowing any origin
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/categories", get(categories_handler))
        .route("/api/agents", get(categories_handler))
        .route(
            "/api/sessions/{id}",
            get(session_handler).delete(delete_session_handler),
        )
        .route("/api/sessions/{id}/clear", post(clear_session_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: routewise_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let providers = routewise_providers::router::build_from_config(&config);
    let orchestrator = Orchestrator::from_config(&config, &providers).await?;
    let state = Arc::new(GatewayState {
        orchestrator: Arc::new(orchestrator),
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- DTOs ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default, alias = "conversation_id")]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
    category: String,
    session_id: String,
}

#[derive(Serialize)]
struct CategoryDto {
    name: String,
    description: String,
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: String,
    turns: Vec<Turn>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// --- Handlers ---

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "message must not be empty"));
    }

    let session_id = payload
        .session_id
        .filter(|id| !id.trim().is_empty())
        .map(SessionId::from);

    match state
        .orchestrator
        .route_query(&payload.message, session_id)
        .await
    {
        Ok(outcome) => Ok(Json(ChatResponse {
            response: outcome.response,
            category: outcome.category,
            session_id: outcome.session_id.0,
        })),
        Err(e) => {
            warn!(error = %e, "Chat request failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn categories_handler(
    State(state): State<SharedState>,
) -> Json<serde_json::Map<String, serde_json::Value>> {
    let categories = state
        .orchestrator
        .categories()
        .into_iter()
        .map(|c| {
            let dto = CategoryDto {
                name: c.name,
                description: c.description,
            };
            (c.id, serde_json::to_value(dto).unwrap_or_default())
        })
        .collect();
    Json(categories)
}

async fn session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<SessionResponse> {
    let session_id = SessionId::from(id);
    let turns = state.orchestrator.sessions().history(&session_id).await;
    Json(SessionResponse {
        session_id: session_id.0,
        turns,
    })
}

async fn clear_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> StatusCode {
    state
        .orchestrator
        .sessions()
        .clear(&SessionId::from(id))
        .await;
    StatusCode::NO_CONTENT
}

async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> StatusCode {
    state
        .orchestrator
        .sessions()
        .delete(&SessionId::from(id))
        .await;
    StatusCode::NO_CONTENT
}
