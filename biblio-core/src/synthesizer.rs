//! Recommendation prose.
//!
//! [`LlmJustifier`] asks the model for a short, specific pitch of a resolved
//! book. Failures and degenerate replies (empty, refusals, canned error
//! strings) are replaced by [`fallback_justification`], which is a pure
//! function of the record. Prose outside the display language goes through
//! the translator once.

use crate::catalog::BookRecord;
use crate::language::LanguageProfile;
use crate::provider::Generator;
use crate::translator::Translator;
use async_trait::async_trait;
use biblio_common::util::truncate_with_ellipsis;
use std::sync::Arc;

#[async_trait]
pub trait Justifier: Send + Sync {
    /// Why `book` answers `question`. Never fails.
    async fn justify(&self, book: &BookRecord, question: &str) -> String;
}

/// Lowercased fragments marking a reply that is not a recommendation.
const DEGENERATE_MARKERS: &[&str] = &[
    "erro:",
    "error:",
    "não consigo ajudar",
    "não posso ajudar",
    "como um modelo de linguagem",
    "como uma ia",
    "as an ai",
    "i'm sorry",
    "i cannot help",
];

const JUSTIFIER_PROMPT: &str = "Você é um livreiro apaixonado e experiente. \
Escreva de 4 a 6 frases em português explicando por que o livro descrito é uma ótima escolha para o leitor, \
ligando a obra ao que ele perguntou. Seja persuasivo e específico: cite o enredo, o estilo ou as ideias do livro. \
É proibido usar frases genéricas como \"é um livro muito bom\", \"vale muito a pena\" ou \"um clássico imperdível\" sem dizer por quê. \
Fale apenas de livros reais e publicados; se os dados indicarem um livro que não existe, diga claramente que o livro não existe. \
Não use listas nem títulos, apenas um parágrafo.";

pub fn is_degenerate(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    lowered.is_empty() || DEGENERATE_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Deterministic pitch built only from the record.
pub fn fallback_justification(book: &BookRecord) -> String {
    let mut text = if book.has_known_year() {
        format!(
            "{}, de {}, publicado em {}, é uma leitura que conversa diretamente com o que você procura.",
            book.title(),
            book.authors_display(),
            book.publication_year()
        )
    } else {
        format!(
            "{}, de {}, é uma leitura que conversa diretamente com o que você procura.",
            book.title(),
            book.authors_display()
        )
    };

    match book.description() {
        Some(description) => {
            text.push_str(" Sobre a obra: ");
            text.push_str(&truncate_with_ellipsis(description, 300));
        }
        None => text.push_str(" Vale conhecer de perto o estilo e as ideias que a obra apresenta."),
    }
    text
}

fn book_context(book: &BookRecord, question: &str) -> String {
    format!(
        "Título: {}\nAutor(es): {}\nAno de publicação: {}\nDescrição: {}\nPergunta do leitor: {}",
        book.title(),
        book.authors_display(),
        book.publication_year(),
        book.description().unwrap_or("sem descrição disponível"),
        question
    )
}

/// Justifier backed by a generative model.
pub struct LlmJustifier {
    generator: Generator,
    translator: Arc<dyn Translator>,
    profile: LanguageProfile,
    max_tokens: i64,
    temperature: f64,
}

impl LlmJustifier {
    pub fn new(
        generator: Generator,
        translator: Arc<dyn Translator>,
        profile: LanguageProfile,
        max_tokens: i64,
        temperature: f64,
    ) -> Self {
        Self {
            generator,
            translator,
            profile,
            max_tokens,
            temperature,
        }
    }
}

#[async_trait]
impl Justifier for LlmJustifier {
    async fn justify(&self, book: &BookRecord, question: &str) -> String {
        let reply = self
            .generator
            .complete(
                JUSTIFIER_PROMPT,
                &book_context(book, question),
                self.max_tokens,
                self.temperature,
            )
            .await;

        let text = match reply {
            Ok(text) if !is_degenerate(&text) => text,
            Ok(text) => {
                tracing::warn!(
                    title = %book.title(),
                    reply = %truncate_with_ellipsis(&text, 80),
                    "Degenerate justification, using fallback"
                );
                return fallback_justification(book);
            }
            Err(e) => {
                tracing::warn!(title = %book.title(), error = %e, "Justification failed, using fallback");
                return fallback_justification(book);
            }
        };

        if self.profile.is_target_language(&text) {
            text
        } else {
            tracing::debug!(title = %book.title(), "Justification not in display language, translating");
            self.translator.translate(&text).await
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the title so tests can see the justification in the reply.
    #[derive(Default)]
    pub struct EchoJustifier {
        calls: AtomicUsize,
    }

    impl EchoJustifier {
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Justifier for EchoJustifier {
        async fn justify(&self, book: &BookRecord, _question: &str) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("Recomendo {}.", book.title())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::book;
    use crate::provider::testing::{generator, ScriptedProvider};
    use crate::translator::testing::CountingTranslator;
    use biblio_common::config::PipelineConfig;

    fn justifier(
        provider: Arc<ScriptedProvider>,
        translator: Arc<CountingTranslator>,
    ) -> LlmJustifier {
        LlmJustifier::new(
            generator(provider),
            translator,
            LanguageProfile::from_config(&PipelineConfig::default()),
            450,
            0.7,
        )
    }

    fn dune() -> BookRecord {
        book("Dune", "Frank Herbert", "1965")
    }

    #[tokio::test]
    async fn portuguese_reply_is_returned_untranslated() {
        let reply = "Dune é uma saga sobre poder, religião e ecologia. O deserto de Arrakis é quase um personagem.";
        let translator = Arc::new(CountingTranslator::default());
        let j = justifier(ScriptedProvider::replying(reply), translator.clone());

        assert_eq!(j.justify(&dune(), "ficção científica").await, reply);
        assert_eq!(translator.call_count(), 0);
    }

    #[tokio::test]
    async fn foreign_reply_is_translated_once() {
        let translator = Arc::new(CountingTranslator::default());
        let j = justifier(
            ScriptedProvider::replying("Dune is a saga about power and ecology."),
            translator.clone(),
        );

        let text = j.justify(&dune(), "ficção científica").await;
        assert_eq!(text, "[pt] Dune is a saga about power and ecology.");
        assert_eq!(translator.call_count(), 1);
    }

    #[tokio::test]
    async fn failure_yields_identical_fallback_every_time() {
        let provider = ScriptedProvider::failing("timeout");
        let j = justifier(provider.clone(), Arc::new(CountingTranslator::default()));

        let first = j.justify(&dune(), "algo épico").await;
        let second = j.justify(&dune(), "algo épico").await;

        assert_eq!(first, second);
        assert_eq!(first, fallback_justification(&dune()));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn degenerate_reply_uses_fallback() {
        let translator = Arc::new(CountingTranslator::default());
        let j = justifier(
            ScriptedProvider::new(vec![Ok(""), Ok("Erro: 429 - limite excedido")]),
            translator.clone(),
        );

        assert_eq!(j.justify(&dune(), "q").await, fallback_justification(&dune()));
        assert_eq!(j.justify(&dune(), "q").await, fallback_justification(&dune()));
        assert_eq!(translator.call_count(), 0);
    }

    #[tokio::test]
    async fn prompt_carries_book_and_question() {
        let provider = ScriptedProvider::replying("Uma obra que é a cara do que você pediu, com um deserto vivo.");
        let j = justifier(provider.clone(), Arc::new(CountingTranslator::default()));

        j.justify(&dune(), "quero ficção científica").await;

        let prompts = provider.prompts.lock().unwrap();
        let (system, user) = &prompts[0];
        assert!(system.as_deref().unwrap().contains("4 a 6 frases"));
        assert!(user.contains("Título: Dune"));
        assert!(user.contains("Autor(es): Frank Herbert"));
        assert!(user.contains("Pergunta do leitor: quero ficção científica"));
    }

    #[test]
    fn fallback_mentions_description_when_present() {
        let record = dune().with_description(Some("A saga de Paul Atreides.".into()));
        let text = fallback_justification(&record);
        assert!(text.starts_with("Dune, de Frank Herbert, publicado em 1965"));
        assert!(text.ends_with("Sobre a obra: A saga de Paul Atreides."));
    }

    #[test]
    fn fallback_omits_unknown_year() {
        let record = BookRecord::new(Some("Sem Data".into()), vec![], None, None);
        let text = fallback_justification(&record);
        assert!(!text.contains("publicado em"));
        assert!(text.contains("de desconhecido"));
    }
}
