//! Normalizes text fragments to the display language.

use crate::language::LanguageProfile;
use crate::provider::Generator;
use async_trait::async_trait;
use biblio_common::util::truncate_with_ellipsis;

/// Translation capability. Total: on failure the input comes back unchanged.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> String;
}

/// Translator backed by a generative model.
pub struct LlmTranslator {
    generator: Generator,
    profile: LanguageProfile,
    max_tokens: i64,
    temperature: f64,
}

impl LlmTranslator {
    pub fn new(
        generator: Generator,
        profile: LanguageProfile,
        max_tokens: i64,
        temperature: f64,
    ) -> Self {
        Self {
            generator,
            profile,
            max_tokens,
            temperature,
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "Você é um tradutor. Traduza o texto do usuário para o {}. \
             Responda apenas com a tradução, sem comentários nem aspas.",
            self.profile.name()
        )
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(&self, text: &str) -> String {
        if text.trim().is_empty() || self.profile.is_target_language(text) {
            return text.to_string();
        }

        match self
            .generator
            .complete(&self.system_prompt(), text, self.max_tokens, self.temperature)
            .await
        {
            Ok(translated) if !translated.is_empty() => translated,
            Ok(_) => {
                tracing::warn!("Translation came back empty, keeping original text");
                text.to_string()
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    text = %truncate_with_ellipsis(text, 80),
                    "Translation failed, keeping original text"
                );
                text.to_string()
            }
        }
    }
}

/// Returns text untouched; for deployments without a translation backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str) -> String {
        text.to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{generator, ScriptedProvider};
    use biblio_common::config::PipelineConfig;

    fn translator(provider: std::sync::Arc<ScriptedProvider>) -> LlmTranslator {
        LlmTranslator::new(
            generator(provider),
            LanguageProfile::from_config(&PipelineConfig::default()),
            700,
            0.2,
        )
    }

    #[tokio::test]
    async fn target_language_text_is_a_no_op() {
        let provider = ScriptedProvider::replying("não deveria ser chamado");
        let text = "Uma história de amor e guerra que se passa no sertão.";

        assert_eq!(translator(provider.clone()).translate(text).await, text);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn foreign_text_is_translated() {
        let provider = ScriptedProvider::replying("Uma saga no deserto.");
        let out = translator(provider.clone())
            .translate("A saga in the desert.")
            .await;

        assert_eq!(out, "Uma saga no deserto.");
        assert_eq!(provider.call_count(), 1);
        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].0.as_deref().unwrap().contains("português"));
    }

    #[tokio::test]
    async fn failure_returns_original() {
        let provider = ScriptedProvider::failing("down");
        let out = translator(provider).translate("A saga in the desert.").await;
        assert_eq!(out, "A saga in the desert.");
    }

    #[tokio::test]
    async fn empty_input_skips_backend() {
        let provider = ScriptedProvider::replying("x");
        assert_eq!(translator(provider.clone()).translate("  ").await, "  ");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn passthrough_is_identity() {
        assert_eq!(PassthroughTranslator.translate("Dune").await, "Dune");
    }
}
