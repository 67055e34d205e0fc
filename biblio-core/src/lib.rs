//! Biblio Core - The question-answering pipeline of the Biblio book assistant.
//!
//! ```text
//! question → guard → intent classifier → catalog (by intent) → synthesizer → reply
//!                                            ↓ miss
//!                             fallback sweep: title → author → subject
//! ```
//!
//! Every stage sits behind a trait so the orchestrator can be wired with the
//! production backends ([`Orchestrator::from_config`]) or with stubs:
//! - [`IntentClassifier`]: question → [`Intent`]
//! - [`Catalog`]: (strategy, term) → [`BookRecord`]
//! - [`Justifier`]: book + question → recommendation prose
//! - [`Translator`]: text → display language

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod catalog;
pub mod guard;
pub mod intent;
pub mod language;
pub mod messages;
pub mod orchestrator;
pub mod provider;
pub mod synthesizer;
pub mod translator;

pub use catalog::{BookRecord, Catalog, CatalogError, OpenLibraryCatalog, SearchKind, UNKNOWN};
pub use guard::{GuardVerdict, QuestionGuard};
pub use intent::{Intent, IntentClassifier, IntentKind, LlmIntentClassifier};
pub use language::{LanguageProfile, PhraseSet};
pub use orchestrator::Orchestrator;
pub use provider::{
    create_provider, ApiFreeLlmProvider, AuthStyle, ChatRequest, ChatResponse, CompatibleProvider,
    Generator, Provider, ProviderError,
};
pub use synthesizer::{fallback_justification, Justifier, LlmJustifier};
pub use translator::{LlmTranslator, PassthroughTranslator, Translator};
