//! Intent classification.
//!
//! Maps a free-text question to a lookup strategy plus search term. The
//! generative call is asked for a minimal JSON payload
//! (`{"tipo": "...", "valor": "..."}`); anything unusable falls back to a
//! subject search on the question itself, so the orchestrator always has a
//! term to work with.

use crate::catalog::SearchKind;
use crate::provider::Generator;
use async_trait::async_trait;
use biblio_common::util::truncate_with_ellipsis;
use biblio_memory::ConversationTurn;
use serde::Deserialize;

/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Book,
    Author,
    Theme,
    Similar,
    Greeting,
    Unknown,
}

impl IntentKind {
    /// Parse the classifier's tag. Portuguese and English tags are accepted.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "livro" | "titulo" | "título" | "book" | "title" => Self::Book,
            "autor" | "author" => Self::Author,
            "tema" | "assunto" | "genero" | "gênero" | "theme" | "subject" => Self::Theme,
            "semelhante" | "similar" | "parecido" => Self::Similar,
            "saudacao" | "saudação" | "greeting" => Self::Greeting,
            _ => Self::Unknown,
        }
    }

    /// Catalog strategy this intent dispatches to, if it maps to a single search.
    pub fn search_kind(self) -> Option<SearchKind> {
        match self {
            Self::Book => Some(SearchKind::Title),
            Self::Author => Some(SearchKind::Author),
            Self::Theme => Some(SearchKind::Subject),
            Self::Similar | Self::Greeting | Self::Unknown => None,
        }
    }
}

/// A classified question. Produced per question, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    kind: IntentKind,
    term: Option<String>,
}

impl Intent {
    pub fn new(kind: IntentKind, term: Option<String>) -> Self {
        Self {
            kind,
            term: term.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        }
    }

    /// Subject search on the question verbatim.
    pub fn fallback(question: &str) -> Self {
        Self {
            kind: IntentKind::Theme,
            term: Some(question.to_string()),
        }
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify `question`, with recent turns as context. Never fails.
    async fn classify(&self, question: &str, history: &[ConversationTurn]) -> Intent;
}

const CLASSIFIER_PROMPT: &str = "Você classifica perguntas de leitores para um assistente literário e acadêmico. \
Considere apenas pedidos sobre livros reais, literários ou acadêmicos. \
Responda SOMENTE com um objeto JSON no formato {\"tipo\": \"...\", \"valor\": \"...\"}, sem nenhum texto antes ou depois.\n\
Valores possíveis de \"tipo\":\n\
- \"livro\": o leitor cita ou procura um título específico; \"valor\" é o título.\n\
- \"autor\": o leitor quer livros de um autor; \"valor\" é o nome do autor.\n\
- \"tema\": o leitor quer livros sobre um assunto ou gênero; \"valor\" é o assunto, em poucas palavras.\n\
- \"semelhante\": o leitor quer algo parecido com um livro (\"parecido com X\", \"semelhante a X\", \"algo como X\"); \"valor\" é o título X.\n\
- \"saudacao\": apenas um cumprimento; \"valor\" é null.\n\
Se não houver um livro, autor ou tema identificável, use \"tema\" com as palavras principais da pergunta.";

#[derive(Debug, Deserialize)]
struct RawIntent {
    tipo: String,
    #[serde(default)]
    valor: Option<serde_json::Value>,
}

/// Extract the first `{` .. last `}` span and decode it.
///
/// Models often wrap the payload in prose or code fences; the span keeps
/// only the object.
pub fn parse_intent(text: &str) -> Option<Intent> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let raw: RawIntent = serde_json::from_str(&text[start..=end]).ok()?;
    let term = match raw.valor {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    Some(Intent::new(IntentKind::from_tag(&raw.tipo), term))
}

/// Render history turns as dialogue lines.
pub fn render_history(history: &[ConversationTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("Usuário: {}\nBot: {}", turn.question(), turn.answer()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Classifier backed by a generative model.
pub struct LlmIntentClassifier {
    generator: Generator,
    max_tokens: i64,
    temperature: f64,
}

impl LlmIntentClassifier {
    pub fn new(generator: Generator, max_tokens: i64, temperature: f64) -> Self {
        Self {
            generator,
            max_tokens,
            temperature,
        }
    }

    fn user_prompt(question: &str, history: &[ConversationTurn]) -> String {
        if history.is_empty() {
            format!("Pergunta: {question}")
        } else {
            format!(
                "Conversa anterior:\n{}\n\nPergunta: {question}",
                render_history(history)
            )
        }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, question: &str, history: &[ConversationTurn]) -> Intent {
        let reply = self
            .generator
            .complete(
                CLASSIFIER_PROMPT,
                &Self::user_prompt(question, history),
                self.max_tokens,
                self.temperature,
            )
            .await;

        match reply {
            Ok(text) => match parse_intent(&text) {
                Some(intent) => {
                    tracing::debug!(kind = ?intent.kind(), term = ?intent.term(), "Question classified");
                    intent
                }
                None => {
                    tracing::warn!(
                        reply = %truncate_with_ellipsis(&text, 120),
                        "Unparseable classification, falling back to subject search"
                    );
                    Intent::fallback(question)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Classifier unavailable, falling back to subject search");
                Intent::fallback(question)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{generator, ScriptedProvider};
    use test_case::test_case;

    #[test_case(r#"{"tipo": "livro", "valor": "Dune"}"#, IntentKind::Book, Some("Dune") ; "plain json")]
    #[test_case("Claro! ```json\n{\"tipo\":\"autor\",\"valor\":\"Clarice Lispector\"}\n```", IntentKind::Author, Some("Clarice Lispector") ; "wrapped in prose")]
    #[test_case(r#"{"tipo": "semelhante", "valor": "O Hobbit"}"#, IntentKind::Similar, Some("O Hobbit") ; "similar")]
    #[test_case(r#"{"tipo": "saudacao", "valor": null}"#, IntentKind::Greeting, None ; "greeting without term")]
    #[test_case(r#"{"tipo": "poema", "valor": "mar"}"#, IntentKind::Unknown, Some("mar") ; "unknown tag")]
    fn parses_payload(text: &str, kind: IntentKind, term: Option<&str>) {
        let intent = parse_intent(text).unwrap();
        assert_eq!(intent.kind(), kind);
        assert_eq!(intent.term(), term);
    }

    #[test_case("sem json aqui" ; "no braces")]
    #[test_case("} invertido {" ; "reversed braces")]
    #[test_case(r#"{"valor": "Dune"}"# ; "missing tipo")]
    fn rejects_malformed_payload(text: &str) {
        assert!(parse_intent(text).is_none());
    }

    #[test]
    fn blank_term_becomes_none() {
        assert_eq!(Intent::new(IntentKind::Book, Some("  ".into())).term(), None);
    }

    #[tokio::test]
    async fn classifies_through_the_generator() {
        let provider = ScriptedProvider::replying(r#"{"tipo":"livro","valor":"Dune"}"#);
        let classifier = LlmIntentClassifier::new(generator(provider.clone()), 120, 0.0);

        let intent = classifier.classify("Quero ler Dune", &[]).await;
        assert_eq!(intent, Intent::new(IntentKind::Book, Some("Dune".into())));

        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].0.as_deref().unwrap().contains("semelhante"));
        assert_eq!(prompts[0].1, "Pergunta: Quero ler Dune");
    }

    #[tokio::test]
    async fn history_is_rendered_into_the_prompt() {
        let provider = ScriptedProvider::replying(r#"{"tipo":"autor","valor":"Tolkien"}"#);
        let classifier = LlmIntentClassifier::new(generator(provider.clone()), 120, 0.0);
        let history = vec![ConversationTurn::new("Gosto de fantasia", "📚 O Hobbit de J.R.R. Tolkien")];

        classifier.classify("E outro do mesmo autor?", &history).await;

        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].1.contains("Usuário: Gosto de fantasia"));
        assert!(prompts[0].1.contains("Bot: 📚 O Hobbit"));
        assert!(prompts[0].1.ends_with("Pergunta: E outro do mesmo autor?"));
    }

    #[tokio::test]
    async fn garbage_reply_falls_back_to_theme_with_question() {
        let provider = ScriptedProvider::replying("Não entendi a pergunta.");
        let classifier = LlmIntentClassifier::new(generator(provider), 120, 0.0);

        let intent = classifier.classify("livros sobre o mar", &[]).await;
        assert_eq!(intent.kind(), IntentKind::Theme);
        assert_eq!(intent.term(), Some("livros sobre o mar"));
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_theme_with_question() {
        let classifier =
            LlmIntentClassifier::new(generator(ScriptedProvider::failing("503")), 120, 0.0);

        let intent = classifier.classify("romances russos", &[]).await;
        assert_eq!(intent, Intent::fallback("romances russos"));
    }
}
