//! Text heuristics shared by the pipeline stages.
//!
//! - [`LanguageProfile`]: "is this text already in the display language?"
//! - [`PhraseSet`]: word-prefix phrase lookup for greetings and the off-domain denylist

use aho_corasick::{AhoCorasick, BuildError};
use biblio_common::config::PipelineConfig;
use std::collections::HashSet;

/// Function-word heuristic for the display language.
///
/// A text counts as written in the target language when at least
/// `min_count` distinct function words of that language occur in it.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    name: String,
    function_words: HashSet<String>,
    min_count: usize,
}

impl LanguageProfile {
    pub fn new<I, S>(name: impl Into<String>, function_words: I, min_count: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            function_words: function_words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            min_count,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.target_language.clone(),
            &config.function_words,
            config.min_function_words,
        )
    }

    /// Display name of the language, used inside prompts.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of distinct function words present in `text`.
    pub fn function_word_count(&self, text: &str) -> usize {
        let lowered = text.to_lowercase();
        lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| self.function_words.contains(*token))
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn is_target_language(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.function_word_count(text) >= self.min_count
    }
}

/// Inflections a phrase may carry and still count ("gatos", "futebolistas").
const SUFFIXES: &[&str] = &["s", "es", "ista", "istas"];

/// A set of phrases matched case-insensitively at the start of a word.
///
/// A match may run on into a plural or an "-ista" noun, or repeat its last letter
/// ("oii"), but never starts mid-word: "oi" matches "oi, tudo bem?" and "oii"
/// but not "Dostoiévski" or "oito".
#[derive(Debug, Clone)]
pub struct PhraseSet {
    phrases: Vec<String>,
    matcher: AhoCorasick,
}

impl PhraseSet {
    pub fn new<I, S>(phrases: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases: Vec<String> = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        let matcher = AhoCorasick::new(&phrases)?;
        Ok(Self { phrases, matcher })
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// First phrase found in `text`.
    pub fn find(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.matcher
            .find_overlapping_iter(&haystack)
            .map(|m| (m, self.phrases[m.pattern().as_usize()].as_str()))
            .find(|(m, phrase)| {
                starts_word(&haystack, m.start()) && ends_word(phrase, &haystack[m.end()..])
            })
            .map(|(_, phrase)| phrase)
    }

    pub fn contains_in(&self, text: &str) -> bool {
        self.find(text).is_some()
    }
}

fn starts_word(haystack: &str, start: usize) -> bool {
    !haystack[..start]
        .chars()
        .next_back()
        .is_some_and(char::is_alphanumeric)
}

/// `rest` is whatever follows the match; its leading word characters must be
/// empty, a known suffix, or the phrase's last letter repeated.
fn ends_word(phrase: &str, rest: &str) -> bool {
    let tail_len = rest
        .char_indices()
        .find(|(_, c)| !c.is_alphanumeric())
        .map_or(rest.len(), |(i, _)| i);
    let tail = &rest[..tail_len];

    tail.is_empty()
        || SUFFIXES.contains(&tail)
        || phrase
            .chars()
            .next_back()
            .is_some_and(|last| tail.chars().all(|c| c == last))
}
