//! HTTP API.
//!
//! Endpoints:
//!
//! - `POST /api/chat`              — Chat with temporal context
//! - `POST /api/chat-with-search`  — Chat with temporal context and web search
//! - `GET  /api/health`            — Service configuration status
//! - `GET  /api/config`            — Public client configuration

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use concierge_core::error::{Error, ProviderError};
use concierge_core::message::Message;
use concierge_core::provider::Usage;
use concierge_pipeline::{ChatInput, ChatMode, ChatOutcome, ChatPipeline, SearchMetadata};
use concierge_providers::display_name;

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the API.
pub struct ApiState {
    pub pipeline: Arc<ChatPipeline>,
}

pub type SharedApiState = Arc<ApiState>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the API router. Nest this under "/api" in the main router.
pub fn api_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config", get(config_handler))
        .route("/chat", post(chat_handler))
        .route("/chat-with-search", post(chat_with_search_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

const INVALID_BODY: &str = "Invalid request body. Must include model and messages array.";

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    model: Option<String>,
    messages: Vec<Message>,
}

/// OpenAI-style completion body, plus search metadata when searched.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    id: String,
    object: String,
    created: i64,
    model: String,
    choices: Vec<ChoiceDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    usage: Option<UsageDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    search_metadata: Option<SearchMetadata>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct ChoiceDto {
    index: u32,
    message: Message,
    finish_reason: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct UsageDto {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<Usage> for UsageDto {
    fn from(u: Usage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

impl From<ChatOutcome> for ChatResponse {
    fn from(outcome: ChatOutcome) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4()),
            object: "chat.completion".into(),
            created: chrono::Utc::now().timestamp(),
            model: outcome.model,
            choices: vec![ChoiceDto {
                index: 0,
                message: outcome.message,
                finish_reason: "stop".into(),
            }],
            usage: outcome.usage.map(UsageDto::from),
            search_metadata: outcome.search,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    timestamp: String,
    services: ServicesDto,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServicesDto {
    open_router: bool,
    tavily: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigResponse {
    #[serde(default)]
    model_id: Option<String>,
    web_search_enabled: bool,
    search_available: bool,
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a pipeline error to its HTTP status and body.
fn map_error(err: Error, provider_name: &str) -> ApiError {
    let label = display_name(provider_name);
    match err {
        Error::Validation(message) => error(StatusCode::BAD_REQUEST, message),
        Error::NotConfigured(_) => error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{label} API key not configured"),
        ),
        Error::Provider(ProviderError::ApiError {
            status_code,
            message,
        }) => error(
            StatusCode::from_u16(status_code).unwrap_or(StatusCode::BAD_GATEWAY),
            format!("{label} API error: {status_code} - {message}"),
        ),
        Error::Provider(ProviderError::NotConfigured(_)) => error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{label} API key not configured"),
        ),
        Error::Provider(ProviderError::Timeout(message)) => {
            error(StatusCode::GATEWAY_TIMEOUT, format!("{label} timeout: {message}"))
        }
        Error::Provider(other) => {
            error(StatusCode::BAD_GATEWAY, format!("{label} request failed: {other}"))
        }
        other => {
            tracing::error!(error = %other, "Chat request failed");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    run_chat(&state, payload, ChatMode::Plain).await
}

async fn chat_with_search_handler(
    State(state): State<SharedApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    run_chat(&state, payload, ChatMode::WithSearch).await
}

async fn run_chat(
    state: &ApiState,
    payload: Result<Json<ChatRequest>, JsonRejection>,
    mode: ChatMode,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "Rejected chat request body");
            return error(StatusCode::BAD_REQUEST, INVALID_BODY).into_response();
        }
    };

    info!(
        messages = request.messages.len(),
        search = mode == ChatMode::WithSearch,
        "Chat request"
    );

    let input = ChatInput {
        model: request.model,
        messages: request.messages,
    };

    match state.pipeline.run(input, mode).await {
        Ok(outcome) => Json(ChatResponse::from(outcome)).into_response(),
        Err(e) => map_error(e, state.pipeline.provider_name()).into_response(),
    }
}

async fn health_handler(State(state): State<SharedApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".into(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        services: ServicesDto {
            open_router: state.pipeline.completion_configured(),
            tavily: state.pipeline.search_configured(),
        },
    })
}

async fn config_handler(State(state): State<SharedApiState>) -> Json<ConfigResponse> {
    let snapshot = state.pipeline.knowledge().snapshot();
    Json(ConfigResponse {
        model_id: snapshot.model_id().map(String::from),
        web_search_enabled: snapshot.web_search().enabled,
        search_available: state.pipeline.search_configured(),
    })
}
