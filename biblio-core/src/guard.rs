//! Input gates run before any outbound call.

use crate::language::PhraseSet;
use aho_corasick::BuildError;
use biblio_common::config::PipelineConfig;
use biblio_common::util::normalize;
use std::collections::HashSet;

/// Outcome of the input gates, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    /// Too short or pure noise.
    Invalid,
    Greeting,
    OffDomain,
    Pass,
}

#[derive(Debug, Clone)]
pub struct QuestionGuard {
    irrelevant: HashSet<String>,
    greetings: PhraseSet,
    off_domain: PhraseSet,
}

impl QuestionGuard {
    pub fn new<I, S>(irrelevant: I, greetings: PhraseSet, off_domain: PhraseSet) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            irrelevant: irrelevant.into_iter().map(|w| normalize(w.as_ref())).collect(),
            greetings,
            off_domain,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, BuildError> {
        Ok(Self::new(
            &config.irrelevant_words,
            PhraseSet::new(&config.greetings)?,
            PhraseSet::new(&config.off_domain_terms)?,
        ))
    }

    pub fn check(&self, question: &str) -> GuardVerdict {
        let cleaned = normalize(question);

        if cleaned.chars().count() <= 1 || self.irrelevant.contains(&cleaned) {
            GuardVerdict::Invalid
        } else if self.greetings.contains_in(&cleaned) {
            GuardVerdict::Greeting
        } else if self.off_domain.contains_in(&cleaned) {
            GuardVerdict::OffDomain
        } else {
            GuardVerdict::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn guard() -> QuestionGuard {
        QuestionGuard::from_config(&PipelineConfig::default()).unwrap()
    }

    #[test_case("" ; "empty")]
    #[test_case("   x  " ; "single char")]
    #[test_case("OK" ; "noise word")]
    #[test_case("  Não " ; "noise word with accent")]
    #[test_case("..." ; "ellipsis")]
    fn noise_is_invalid(question: &str) {
        assert_eq!(guard().check(question), GuardVerdict::Invalid);
    }

    #[test_case("Oi!" ; "short greeting")]
    #[test_case("Boa noite, tudo bem?" ; "multi word greeting")]
    #[test_case("olá, quero um livro de terror" ; "greeting before a request")]
    #[test_case("oii, quero um livro" ; "stretched greeting")]
    fn greetings_short_circuit(question: &str) {
        assert_eq!(guard().check(question), GuardVerdict::Greeting);
    }

    #[test_case("Quem ganhou o jogo de futebol?" ; "sport")]
    #[test_case("Qual a previsão do tempo amanhã?" ; "weather phrase")]
    #[test_case("meu Gato não come" ; "animal")]
    #[test_case("Quero comprar carros usados" ; "plural")]
    #[test_case("dicas para gatos filhotes" ; "plural animal")]
    #[test_case("resultado dos futebolistas" ; "derived noun")]
    fn off_domain_is_rejected(question: &str) {
        assert_eq!(guard().check(question), GuardVerdict::OffDomain);
    }

    #[test_case("Quero um livro de ficção científica" ; "theme request")]
    #[test_case("Livros de Dostoiévski" ; "greeting substring inside a name")]
    #[test_case("Um livro de história com oito capítulos" ; "greetings as word prefixes")]
    #[test_case("Algo parecido com Cem Anos de Solidão" ; "similar request")]
    fn book_questions_pass(question: &str) {
        assert_eq!(guard().check(question), GuardVerdict::Pass);
    }

    #[test]
    fn denylist_also_hits_titles() {
        assert_eq!(
            guard().check("O Gato Preto de Edgar Allan Poe"),
            GuardVerdict::OffDomain
        );
    }

    #[test]
    fn custom_lists_replace_defaults() {
        let guard = QuestionGuard::new(
            ["hmm"],
            PhraseSet::new(["hello"]).unwrap(),
            PhraseSet::new(["football"]).unwrap(),
        );
        assert_eq!(guard.check("hmm"), GuardVerdict::Invalid);
        assert_eq!(guard.check("hello there"), GuardVerdict::Greeting);
        assert_eq!(guard.check("football books"), GuardVerdict::OffDomain);
        assert_eq!(guard.check("oi"), GuardVerdict::Pass);
    }
}
