//! Generative text backends.
//!
//! Provides a unified interface for the LLM calls the pipeline makes
//! (intent classification, recommendation prose, translation), plus
//! [`Generator`], which bounds every call with a timeout.

mod apifreellm;
mod compatible;

pub use apifreellm::ApiFreeLlmProvider;
pub use compatible::{AuthStyle, CompatibleProvider};

use async_trait::async_trait;
use biblio_common::config::{LlmConfig, LlmProviderKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Provider Trait
// ============================================================================

/// Unified interface for LLM providers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Send a chat completion request.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// Error from a provider.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub provider: String,
    pub model: String,
    pub message: String,
    pub status_code: Option<u16>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.provider, self.model, self.message)
    }
}

impl std::error::Error for ProviderError {}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Unified chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model to use
    pub model: String,
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    /// Temperature (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// System prompt (if not in messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Unified chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Provider name
    pub provider: String,
    /// Model used
    pub model: String,
    /// Response content
    pub content: String,
    /// Token usage
    pub usage: TokenUsage,
    /// Finish reason
    pub finish_reason: Option<String>,
    /// Response latency in milliseconds
    pub latency_ms: u64,
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
}

/// Build the provider selected in configuration.
pub fn create_provider(config: &LlmConfig) -> Arc<dyn Provider> {
    let base_url = config.effective_base_url();
    match config.provider {
        LlmProviderKind::Compatible => Arc::new(CompatibleProvider::new(
            "compatible",
            &base_url,
            config.api_key.as_deref(),
            AuthStyle::Bearer,
        )),
        LlmProviderKind::ApiFreeLlm => Arc::new(ApiFreeLlmProvider::new(&base_url)),
    }
}

// ============================================================================
// Generator
// ============================================================================

/// A provider bound to one model and a hard per-call timeout.
///
/// The pipeline never waits on a generative call longer than `timeout`; an
/// expired call is reported as a [`ProviderError`] like any other failure.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn Provider>,
    model: String,
    timeout: Duration,
}

impl Generator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            create_provider(config),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// One system + user prompt round-trip, returning the trimmed text.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: i64,
        temperature: f64,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::user(user)],
            max_tokens: Some(max_tokens),
            temperature: Some(temperature),
            system: Some(system.to_string()),
        };

        match tokio::time::timeout(self.timeout, self.provider.chat(request)).await {
            Ok(Ok(response)) => {
                tracing::debug!(
                    provider = %response.provider,
                    latency_ms = response.latency_ms,
                    output_tokens = response.usage.output_tokens,
                    "Generative call completed"
                );
                Ok(response.content.trim().to_string())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProviderError {
                provider: self.provider.name().to_string(),
                model: self.model.clone(),
                message: format!("Timed out after {}ms", self.timeout.as_millis()),
                status_code: None,
            }),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    struct SlowProvider;

    #[async_trait]
    impl Provider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            unreachable!("the generator timeout fires first")
        }
    }

    #[tokio::test]
    async fn complete_trims_and_forwards_prompts() {
        let provider = ScriptedProvider::replying("  resposta  \n");
        let generator = generator(provider.clone());

        let text = generator.complete("sistema", "usuário", 100, 0.3).await.unwrap();
        assert_eq!(text, "resposta");

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts[0].0.as_deref(), Some("sistema"));
        assert_eq!(prompts[0].1, "usuário");
    }

    #[tokio::test]
    async fn complete_times_out() {
        let generator = Generator::new(Arc::new(SlowProvider), "m", Duration::from_millis(20));
        let err = generator.complete("s", "u", 10, 0.0).await.unwrap_err();
        assert_eq!(err.provider, "slow");
        assert!(err.message.contains("Timed out"));
    }

    #[tokio::test]
    async fn complete_propagates_provider_error() {
        let generator = generator(ScriptedProvider::failing("boom"));
        let err = generator.complete("s", "u", 10, 0.0).await.unwrap_err();
        assert_eq!(err.message, "boom");
        assert_eq!(err.status_code, Some(500));
    }

    #[test]
    fn create_provider_follows_config() {
        let mut config = LlmConfig::default();
        assert_eq!(create_provider(&config).name(), "compatible");

        config.provider = LlmProviderKind::ApiFreeLlm;
        assert_eq!(create_provider(&config).name(), "apifreellm");
    }

    #[test]
    fn chat_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![Message::user("Quero ler Duna")],
            max_tokens: Some(120),
            temperature: None,
            system: Some("Classifique".into()),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("gpt-4o-mini"));
        assert!(json.contains("Quero ler Duna"));
        assert!(!json.contains("temperature"));
    }
}
