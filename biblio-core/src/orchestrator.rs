//! Guard and dispatch.
//!
//! [`Orchestrator::answer`] is the only entry point of the pipeline:
//!
//! 1. input gates (noise, greeting, off-domain denylist)
//! 2. intent classification
//! 3. primary dispatch on the intent's strategy
//! 4. fallback sweep over the remaining strategies, title → author → subject
//! 5. a fixed "not found" text
//!
//! `answer` is total. Every upstream failure ends as text: degraded generative
//! calls are absorbed by the stages, an unreachable catalog follows the
//! configured [`UnreachablePolicy`].

use crate::catalog::{BookRecord, Catalog, OpenLibraryCatalog, SearchKind};
use crate::guard::{GuardVerdict, QuestionGuard};
use crate::intent::{IntentClassifier, IntentKind, LlmIntentClassifier};
use crate::language::LanguageProfile;
use crate::messages;
use crate::provider::Generator;
use crate::synthesizer::{Justifier, LlmJustifier};
use crate::translator::{LlmTranslator, Translator};
use anyhow::Context;
use biblio_common::config::{Config, UnreachablePolicy};
use biblio_common::util::{sanitize_for_log, truncate_with_ellipsis};
use biblio_memory::ConversationTurn;
use std::sync::Arc;

/// Result of one catalog strategy.
#[derive(Debug)]
enum Lookup {
    Found(String),
    Miss,
    Unreachable(SearchKind),
}

pub struct Orchestrator {
    guard: QuestionGuard,
    classifier: Arc<dyn IntentClassifier>,
    catalog: Arc<dyn Catalog>,
    justifier: Arc<dyn Justifier>,
    translator: Arc<dyn Translator>,
    on_unreachable: UnreachablePolicy,
    history_window: usize,
}

impl Orchestrator {
    pub fn new(
        guard: QuestionGuard,
        classifier: Arc<dyn IntentClassifier>,
        catalog: Arc<dyn Catalog>,
        justifier: Arc<dyn Justifier>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            guard,
            classifier,
            catalog,
            justifier,
            translator,
            on_unreachable: UnreachablePolicy::default(),
            history_window: 6,
        }
    }

    pub fn with_unreachable_policy(mut self, policy: UnreachablePolicy) -> Self {
        self.on_unreachable = policy;
        self
    }

    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    /// Wire the production pipeline: one generator shared by every stage,
    /// Open Library as catalog.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let generator = Generator::from_config(&config.llm);
        let profile = LanguageProfile::from_config(&config.pipeline);

        let translator: Arc<dyn Translator> = Arc::new(LlmTranslator::new(
            generator.clone(),
            profile.clone(),
            config.llm.translation_max_tokens,
            config.llm.translation_temperature,
        ));
        let classifier = Arc::new(LlmIntentClassifier::new(
            generator.clone(),
            config.llm.classifier_max_tokens,
            config.llm.classifier_temperature,
        ));
        let justifier = Arc::new(LlmJustifier::new(
            generator.clone(),
            translator.clone(),
            profile,
            config.llm.justification_max_tokens,
            config.llm.justification_temperature,
        ));
        let catalog = Arc::new(
            OpenLibraryCatalog::from_config(&config.catalog)
                .context("Failed to build catalog client")?,
        );
        let guard = QuestionGuard::from_config(&config.pipeline)
            .context("Failed to build greeting/denylist matchers")?;

        tracing::info!(
            provider = %generator.provider_name(),
            model = %config.llm.model,
            catalog = %catalog.name(),
            "Pipeline ready"
        );

        Ok(Self::new(guard, classifier, catalog, justifier, translator)
            .with_unreachable_policy(config.catalog.on_unreachable)
            .with_history_window(config.pipeline.history_window))
    }

    /// Answer one question given the session so far. Never fails.
    pub async fn answer(&self, question: &str, history: &[ConversationTurn]) -> String {
        let log_question = truncate_with_ellipsis(&sanitize_for_log(question), 80);

        match self.guard.check(question) {
            GuardVerdict::Invalid => {
                tracing::debug!(question = %log_question, "Rejected as noise");
                return messages::APOLOGY.to_string();
            }
            GuardVerdict::Greeting => return messages::GREETING_PROMPT.to_string(),
            GuardVerdict::OffDomain => {
                tracing::debug!(question = %log_question, "Rejected as off-domain");
                return messages::BOOKS_ONLY.to_string();
            }
            GuardVerdict::Pass => {}
        }

        let history = self.window(history);
        let intent = self.classifier.classify(question, history).await;
        tracing::info!(
            question = %log_question,
            kind = ?intent.kind(),
            term = ?intent.term(),
            "Dispatching"
        );

        let tried = intent.kind().search_kind();
        match (intent.kind(), intent.term()) {
            (IntentKind::Greeting, _) => return messages::GREETING_PROMPT.to_string(),
            (IntentKind::Similar, Some(base)) => {
                return self.recommend_similar(base, question, history).await;
            }
            (_, Some(term)) => {
                if let Some(kind) = tried {
                    if let Some(text) = self.settle(self.lookup(kind, term, question).await) {
                        return text;
                    }
                }
            }
            (_, None) => {}
        }

        if let Some(term) = intent.term() {
            for kind in SearchKind::SWEEP_ORDER.into_iter().filter(|k| Some(*k) != tried) {
                tracing::debug!(kind = %kind, term = %term, "Fallback sweep");
                if let Some(text) = self.settle(self.lookup(kind, term, question).await) {
                    return text;
                }
            }
        }

        tracing::info!(question = %log_question, "Every strategy came back empty");
        messages::NOT_FOUND.to_string()
    }

    /// Suggest a book like `base`.
    ///
    /// The base title must resolve first; the theme is then taken from a fresh
    /// classification of the original question and searched by subject. A hit
    /// that is the base book again does not count.
    pub async fn recommend_similar(
        &self,
        base: &str,
        question: &str,
        history: &[ConversationTurn],
    ) -> String {
        let base_book = match self.catalog.resolve(SearchKind::Title, base).await {
            Ok(Some(book)) => book,
            Ok(None) => return messages::insufficient_similar(base),
            Err(e) => {
                tracing::warn!(base = %base, error = %e, "Catalog unreachable resolving base title");
                return match self.on_unreachable {
                    UnreachablePolicy::Surface => messages::catalog_unavailable(SearchKind::Title),
                    UnreachablePolicy::Miss => messages::insufficient_similar(base),
                };
            }
        };

        let theme_intent = self.classifier.classify(question, history).await;
        let Some(theme) = theme_intent.term() else {
            return messages::no_similar(base);
        };

        let candidate = match self.catalog.search_by_subject(theme).await {
            Ok(Some(book)) => book,
            Ok(None) => return messages::no_similar(base),
            Err(e) => {
                tracing::warn!(theme = %theme, error = %e, "Catalog unreachable searching similar books");
                return match self.on_unreachable {
                    UnreachablePolicy::Surface => messages::catalog_unavailable(SearchKind::Subject),
                    UnreachablePolicy::Miss => messages::no_similar(base),
                };
            }
        };

        if is_same_book(&candidate, base, &base_book) {
            tracing::debug!(base = %base, "Similar search returned the base book");
            return messages::no_similar(base);
        }

        let reply = self.present(candidate, question).await;
        messages::similar_found(base_book.title(), &reply)
    }

    /// One strategy: search, then build the reply on a hit.
    async fn lookup(&self, kind: SearchKind, term: &str, question: &str) -> Lookup {
        match self.catalog.search(kind, term).await {
            Ok(Some(book)) => Lookup::Found(self.present(book, question).await),
            Ok(None) => Lookup::Miss,
            Err(e) => {
                tracing::warn!(kind = %kind, term = %term, error = %e, "Catalog unreachable");
                Lookup::Unreachable(kind)
            }
        }
    }

    /// Apply the unreachable policy: `Some(text)` ends the request.
    fn settle(&self, lookup: Lookup) -> Option<String> {
        match lookup {
            Lookup::Found(text) => Some(text),
            Lookup::Miss => None,
            Lookup::Unreachable(kind) => match self.on_unreachable {
                UnreachablePolicy::Surface => Some(messages::catalog_unavailable(kind)),
                UnreachablePolicy::Miss => None,
            },
        }
    }

    async fn present(&self, book: BookRecord, question: &str) -> String {
        let book = match book.description() {
            Some(description) => {
                let translated = self.translator.translate(description).await;
                book.with_description(Some(translated))
            }
            None => book,
        };
        let justification = self.justifier.justify(&book, question).await;
        messages::format_reply(&book, &justification)
    }

    fn window<'a>(&self, history: &'a [ConversationTurn]) -> &'a [ConversationTurn] {
        &history[history.len().saturating_sub(self.history_window)..]
    }
}

fn is_same_book(candidate: &BookRecord, base: &str, base_book: &BookRecord) -> bool {
    let title = candidate.title().to_lowercase();
    title.contains(&base.trim().to_lowercase()) || title == base_book.title().to_lowercase()
}
