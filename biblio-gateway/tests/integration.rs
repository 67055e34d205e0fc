//! Integration tests for Biblio Gateway.
//!
//! Drives the full router with an in-memory session store and a pipeline
//! whose catalog and generative stages are stubbed.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use biblio_common::config::PipelineConfig;
use biblio_core::{
    BookRecord, Catalog, CatalogError, Intent, IntentClassifier, IntentKind, Justifier,
    Orchestrator, PassthroughTranslator, QuestionGuard, SearchKind,
};
use biblio_gateway::routes::{ChatResponse, ClearResponse, HealthResponse, HistoryResponse};
use biblio_gateway::{build_router, AppState};
use biblio_memory::{ConversationTurn, InMemorySessionStore, SessionStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct TitleClassifier;

#[async_trait]
impl IntentClassifier for TitleClassifier {
    async fn classify(&self, _question: &str, _history: &[ConversationTurn]) -> Intent {
        Intent::new(IntentKind::Book, Some("Dune".into()))
    }
}

struct DuneCatalog;

#[async_trait]
impl Catalog for DuneCatalog {
    fn name(&self) -> &str {
        "dune"
    }

    async fn search(
        &self,
        kind: SearchKind,
        _term: &str,
    ) -> Result<Option<BookRecord>, CatalogError> {
        Ok((kind == SearchKind::Title).then(|| {
            BookRecord::new(
                Some("Dune".into()),
                vec!["Frank Herbert".into()],
                Some("1965".into()),
                None,
            )
        }))
    }
}

struct FixedJustifier;

#[async_trait]
impl Justifier for FixedJustifier {
    async fn justify(&self, _book: &BookRecord, _question: &str) -> String {
        "Uma saga épica sobre poder e ecologia.".into()
    }
}

struct BrokenStore;

#[async_trait]
impl SessionStore for BrokenStore {
    fn name(&self) -> &str {
        "broken"
    }

    async fn get(&self, _session_id: &str) -> anyhow::Result<Vec<ConversationTurn>> {
        anyhow::bail!("disk full")
    }

    async fn append(&self, _session_id: &str, _turn: ConversationTurn) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }

    async fn clear(&self, _session_id: &str) -> anyhow::Result<usize> {
        anyhow::bail!("disk full")
    }

    async fn health_check(&self) -> bool {
        false
    }
}

fn orchestrator() -> Orchestrator {
    Orchestrator::new(
        QuestionGuard::from_config(&PipelineConfig::default()).unwrap(),
        Arc::new(TitleClassifier),
        Arc::new(DuneCatalog),
        Arc::new(FixedJustifier),
        Arc::new(PassthroughTranslator),
    )
}

fn test_app_with_store(store: Arc<dyn SessionStore>) -> axum::Router {
    build_router(AppState::new(orchestrator(), store), Duration::from_secs(10))
}

fn test_app() -> axum::Router {
    test_app_with_store(Arc::new(InMemorySessionStore::new()))
}

/// Send a request, returning status, the session cookie pair, and the JSON body.
async fn send(
    app: &axum::Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    cookie: Option<&str>,
) -> (StatusCode, Option<String>, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(c) = cookie {
        request = request.header(header::COOKIE, c);
    }

    let request = match body {
        Some(b) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&b).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(String::from);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, cookie, json)
}

#[tokio::test]
async fn test_health_reports_store() {
    let app = test_app();
    let (status, _, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.service, "biblio-gateway");
    assert_eq!(health.store, "memory");
}

#[tokio::test]
async fn test_health_degraded_when_store_down() {
    let app = test_app_with_store(Arc::new(BrokenStore));
    let (status, _, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_chat_issues_session_and_answers() {
    let app = test_app();
    let (status, cookie, body) = send(
        &app,
        Method::POST,
        "/api/v1/chat",
        Some(json!({"question": "Quero ler Dune"})),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let cookie = cookie.expect("session cookie");
    assert!(cookie.starts_with("session_id="));

    let chat: ChatResponse = serde_json::from_value(body).unwrap();
    assert_eq!(
        chat.answer,
        "📚 Dune de Frank Herbert, publicado em 1965. Uma saga épica sobre poder e ecologia."
    );
    assert_eq!(chat.history.len(), 1);
    assert_eq!(chat.history[0].question, "Quero ler Dune");
    assert_eq!(format!("session_id={}", chat.session_id), cookie);
}

#[tokio::test]
async fn test_session_history_roundtrip_and_clear() {
    let app = test_app();
    let cookie = "session_id=leitor-1";

    for question in ["Quero ler Dune", "Me indica Dune de novo"] {
        let (status, _, _) = send(
            &app,
            Method::POST,
            "/api/v1/chat",
            Some(json!({ "question": question })),
            Some(cookie),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, _, body) = send(&app, Method::GET, "/api/v1/chat", None, Some(cookie)).await;
    let history: HistoryResponse = serde_json::from_value(body).unwrap();
    assert_eq!(history.session_id, "leitor-1");
    assert_eq!(history.history.len(), 2);
    assert_eq!(history.history[1].question, "Me indica Dune de novo");

    let (status, _, body) =
        send(&app, Method::POST, "/api/v1/chat/clear", None, Some(cookie)).await;
    assert_eq!(status, StatusCode::OK);
    let cleared: ClearResponse = serde_json::from_value(body).unwrap();
    assert_eq!(cleared.cleared, 2);

    let (_, _, body) = send(&app, Method::GET, "/api/v1/chat", None, Some(cookie)).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let app = test_app();
    send(
        &app,
        Method::POST,
        "/api/v1/chat",
        Some(json!({"question": "Quero ler Dune"})),
        Some("session_id=a"),
    )
    .await;

    let (_, _, body) = send(&app, Method::GET, "/api/v1/chat", None, Some("session_id=b")).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_greeting_goes_through_guard() {
    let app = test_app();
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/v1/chat",
        Some(json!({"question": "Oi, tudo bem?"})),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], biblio_core::messages::GREETING_PROMPT);
}

#[tokio::test]
async fn test_overlong_question_rejected() {
    let app = test_app();
    let question = "livro ".repeat(500);
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/v1/chat",
        Some(json!({ "question": question })),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_store_failure_is_json_error() {
    let app = test_app_with_store(Arc::new(BrokenStore));
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/v1/chat",
        Some(json!({"question": "Quero ler Dune"})),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "STORE_UNAVAILABLE");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("disk full"));
}
