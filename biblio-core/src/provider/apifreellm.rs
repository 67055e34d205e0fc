//! apifreellm.com provider.
//!
//! The endpoint takes a single `message` string and answers with
//! `{"status": "success", "response": "..."}`; there is no separate system
//! role, so the system prompt is prepended to the message.

use super::{ChatRequest, ChatResponse, Provider, ProviderError, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub struct ApiFreeLlmProvider {
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ApiFreeRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiFreeResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiFreeLlmProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn error(&self, model: &str, message: String, status_code: Option<u16>) -> ProviderError {
        ProviderError {
            provider: "apifreellm".into(),
            model: model.to_string(),
            message,
            status_code,
        }
    }
}

/// Flatten system prompt and messages into the single text the endpoint accepts.
fn flatten_prompt(request: &ChatRequest) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system.as_deref() {
        parts.push(system);
    }
    parts.extend(request.messages.iter().map(|m| m.content.as_str()));
    parts.join("\n")
}

#[async_trait]
impl Provider for ApiFreeLlmProvider {
    fn name(&self) -> &str {
        "apifreellm"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let start = Instant::now();
        let message = flatten_prompt(&request);
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ApiFreeRequest { message: &message })
            .send()
            .await
            .map_err(|e| self.error(&request.model, format!("Request failed: {}", e), None))?;

        let http_status = response.status().as_u16();
        let body: ApiFreeResponse = response.json().await.map_err(|e| {
            self.error(
                &request.model,
                format!("Failed to parse response: {}", e),
                Some(http_status),
            )
        })?;

        match (body.status.as_deref(), body.response) {
            (Some("success"), Some(content)) => Ok(ChatResponse {
                provider: "apifreellm".into(),
                model: request.model,
                content,
                usage: TokenUsage::default(),
                finish_reason: None,
                latency_ms: start.elapsed().as_millis() as u64,
            }),
            (status, _) => Err(self.error(
                &request.model,
                format!(
                    "Erro: {} - {}",
                    status.unwrap_or("unknown"),
                    body.error.unwrap_or_default()
                ),
                Some(http_status),
            )),
        }
    }
}
