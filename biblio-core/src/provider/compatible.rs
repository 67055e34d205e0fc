//! Generic OpenAI-compatible provider.
//!
//! Most hosted LLM APIs (OpenAI, Groq, DeepSeek, Mistral, local Ollama / vLLM
//! servers, ...) accept the same `/v1/chat/completions` format, so one
//! implementation covers all of them.

use super::{ChatRequest, ChatResponse, Provider, ProviderError, TokenUsage};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// How the provider expects the API key to be sent.
#[derive(Debug, Clone)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-api-key: <key>`
    XApiKey,
    /// Custom header name
    Custom(String),
}

/// A provider that speaks the OpenAI-compatible chat completions API.
pub struct CompatibleProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    auth_style: AuthStyle,
    client: Client,
}

#[derive(Debug, Serialize)]
struct CompatibleRequest<'a> {
    model: &'a str,
    messages: Vec<CompatibleMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CompatibleMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompatibleResponse {
    choices: Vec<CompatibleChoice>,
    #[serde(default)]
    usage: Option<CompatibleUsage>,
}

#[derive(Debug, Deserialize)]
struct CompatibleChoice {
    message: CompatibleResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompatibleResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompatibleUsage {
    prompt_tokens: Option<i64>,
    completion_tokens: Option<i64>,
    total_tokens: Option<i64>,
}

impl From<CompatibleUsage> for TokenUsage {
    fn from(u: CompatibleUsage) -> Self {
        Self {
            input_tokens: u.prompt_tokens.unwrap_or(0),
            output_tokens: u.completion_tokens.unwrap_or(0),
            total_tokens: u.total_tokens.unwrap_or(0),
        }
    }
}

impl CompatibleProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(name: &str, base_url: &str, api_key: Option<&str>, auth_style: AuthStyle) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(ToString::to_string),
            auth_style,
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn authorize(&self, req: RequestBuilder, api_key: &str) -> RequestBuilder {
        match &self.auth_style {
            AuthStyle::Bearer => req.bearer_auth(api_key),
            AuthStyle::XApiKey => req.header("x-api-key", api_key),
            AuthStyle::Custom(header) => req.header(header.as_str(), api_key),
        }
    }

    fn error(&self, model: &str, message: String, status_code: Option<u16>) -> ProviderError {
        ProviderError {
            provider: self.name.clone(),
            model: model.to_string(),
            message,
            status_code,
        }
    }
}

#[async_trait]
impl Provider for CompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let start = Instant::now();
        let model = request.model.as_str();

        let Some(api_key) = self.api_key.as_deref() else {
            return Err(self.error(
                model,
                format!("{} API key not set. Set llm.api_key or BIBLIO_LLM_API_KEY.", self.name),
                None,
            ));
        };

        let system = request.system.as_deref().map(|content| CompatibleMessage {
            role: "system",
            content,
        });
        let body = CompatibleRequest {
            model,
            messages: system
                .into_iter()
                .chain(request.messages.iter().map(|m| CompatibleMessage {
                    role: &m.role,
                    content: &m.content,
                }))
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let http = self
            .authorize(
                self.client
                    .post(format!("{}/v1/chat/completions", self.base_url))
                    .json(&body),
                api_key,
            )
            .send()
            .await
            .map_err(|e| self.error(model, format!("Request failed: {}", e), None))?;

        let status = http.status();
        if !status.is_success() {
            let detail = http.text().await.unwrap_or_default();
            return Err(self.error(
                model,
                format!("API error ({}): {}", status.as_u16(), detail),
                Some(status.as_u16()),
            ));
        }

        let parsed: CompatibleResponse = http
            .json()
            .await
            .map_err(|e| self.error(model, format!("Failed to parse response: {}", e), None))?;

        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(self.error(model, format!("No response from {}", self.name), None));
        };

        let usage = parsed.usage.map(TokenUsage::from).unwrap_or_default();

        Ok(ChatResponse {
            provider: self.name.clone(),
            model: request.model.clone(),
            content: choice.message.content.unwrap_or_default(),
            usage,
            finish_reason: choice.finish_reason,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
