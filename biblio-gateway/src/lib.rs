//! Biblio Gateway - HTTP front-end for the Biblio book assistant.
//!
//! Binds browser sessions to the question-answering pipeline:
//! ```text
//! POST /api/v1/chat → session cookie → SessionStore::get → Orchestrator::answer
//!                                                        → SessionStore::append
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod error;
pub mod routes;
pub mod session;

pub use error::GatewayError;
pub use session::Session;

use axum::Router;
use biblio_common::config::Config;
use biblio_core::Orchestrator;
use biblio_memory::{create_session_store, SessionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Request body cap; questions are short.
const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, store: Arc<dyn SessionStore>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            store,
        }
    }

    /// Production wiring from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let orchestrator = Orchestrator::from_config(config)?;
        let store = create_session_store(&config.memory)?;
        tracing::info!(store = %store.name(), "Session store ready");
        Ok(Self::new(orchestrator, store))
    }
}

/// Build the gateway router with all routes and middleware.
///
/// The request timeout leaves room for the pipeline's own worst case: a
/// classification, a full sweep and a justification.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::chat_routes())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Worst-case pipeline time: up to six generative calls and four catalog
/// searches (each with a description fetch).
pub fn pipeline_budget(config: &Config) -> Duration {
    Duration::from_secs(config.llm.timeout_secs * 6 + config.catalog.timeout_secs * 8)
}

/// Start the gateway server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        config.bind_address().parse::<std::net::IpAddr>()?,
        config.port(),
    ));

    let state = AppState::from_config(config)?;
    let router = build_router(state, pipeline_budget(config));

    tracing::info!("Starting Biblio Gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
