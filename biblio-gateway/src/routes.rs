//! Route definitions for Biblio Gateway.
//!
//! Provides the chat endpoints and health checks.

use crate::error::GatewayError;
use crate::session::Session;
use crate::AppState;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use biblio_common::logging::trace_id_from_headers;
use biblio_common::request_span;
use biblio_memory::ConversationTurn;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

/// Longest question accepted, in characters.
pub const MAX_QUESTION_CHARS: usize = 2000;

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

/// One exchange as shown to the client.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnView {
    pub question: String,
    pub answer: String,
    pub created_at: i64,
}

impl From<&ConversationTurn> for TurnView {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            question: turn.question().to_string(),
            answer: turn.answer().to_string(),
            created_at: turn.created_at(),
        }
    }
}

/// Chat response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub answer: String,
    pub history: Vec<TurnView>,
}

/// Transcript response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub history: Vec<TurnView>,
}

/// Clear response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub session_id: String,
    pub cleared: usize,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub store: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Route Builders
// ─────────────────────────────────────────────────────────────────────────────

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/health", get(health_handler))
}

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/chat", get(history_handler).post(chat_handler))
        .route("/api/v1/chat/clear", post(clear_handler))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let healthy = state.store.health_check().await;
    Json(HealthResponse {
        status: (if healthy { "healthy" } else { "degraded" }).into(),
        version: env!("CARGO_PKG_VERSION").into(),
        service: "biblio-gateway".into(),
        store: state.store.name().into(),
    })
}

async fn history_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, GatewayError> {
    let history = state
        .store
        .get(session.id())
        .await
        .map_err(|e| GatewayError::storage("loading history", e))?;

    Ok((
        session.cookie(),
        Json(HistoryResponse {
            session_id: session.id().to_string(),
            history: history.iter().map(TurnView::from).collect(),
        }),
    ))
}

async fn chat_handler(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    if request.question.chars().count() > MAX_QUESTION_CHARS {
        return Err(GatewayError::invalid_request(format!(
            "question longer than {MAX_QUESTION_CHARS} characters"
        )));
    }

    let trace_id = trace_id_from_headers(&headers);
    let span = request_span!("chat", trace_id, session_id = %session.id());

    async move {
        let mut history = state
            .store
            .get(session.id())
            .await
            .map_err(|e| GatewayError::storage("loading history", e))?;

        let answer = state.orchestrator.answer(&request.question, &history).await;

        let turn = ConversationTurn::new(request.question, answer.clone());
        state
            .store
            .append(session.id(), turn.clone())
            .await
            .map_err(|e| GatewayError::storage("saving turn", e))?;
        history.push(turn);

        tracing::info!(turns = history.len(), new_session = session.is_new(), "Answered");

        Ok::<_, GatewayError>((
            session.cookie(),
            Json(ChatResponse {
                session_id: session.id().to_string(),
                answer,
                history: history.iter().map(TurnView::from).collect(),
            }),
        ))
    }
    .instrument(span)
    .await
}

async fn clear_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, GatewayError> {
    let cleared = state
        .store
        .clear(session.id())
        .await
        .map_err(|e| GatewayError::storage("clearing history", e))?;

    tracing::debug!(session_id = %session.id(), cleared, "Session cleared");

    Ok((
        session.cookie(),
        Json(ClearResponse {
            session_id: session.id().to_string(),
            cleared,
        }),
    ))
}
