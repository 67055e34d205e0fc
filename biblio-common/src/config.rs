//! Configuration management for Biblio services.
//!
//! All Biblio services share one configuration file at `~/.biblio/config.json`,
//! optionally complemented by `~/.biblio/secrets.json` (see [`crate::config_loader`]).
//!
//! # Configuration Priority
//!
//! 1. Environment variables (BIBLIO_* prefix)
//! 2. `secrets.json` values
//! 3. `config.json` values
//! 4. Default values
//!
//! # Environment Variable Mapping
//!
//! - `BIBLIO_PORT` → network.port
//! - `BIBLIO_BIND_ADDRESS` → network.bind
//! - `BIBLIO_LOG_LEVEL` → observability.log_level
//! - `BIBLIO_LLM_API_KEY` (or `OPENAI_API_KEY`) → llm.api_key
//! - `BIBLIO_LLM_BASE_URL` → llm.base_url
//! - `BIBLIO_LLM_MODEL` → llm.model
//! - `BIBLIO_CATALOG_URL` → catalog.base_url
//! - `BIBLIO_DB_PATH` → memory.path

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".biblio"),
        |dirs| dirs.home_dir().join(".biblio"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Network configuration for the HTTP front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address.
    /// Default: "127.0.0.1" (local only)
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Port number
    #[serde(default)]
    pub port: Option<u16>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: None,
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

// ============================================================================
// Observability
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets pinned to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// LLM
// ============================================================================

/// Which generative backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// OpenAI-compatible `/v1/chat/completions`
    #[default]
    Compatible,
    /// apifreellm.com style `{"message": ...}` endpoint
    #[serde(alias = "apifree")]
    ApiFreeLlm,
}

/// Generative model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProviderKind,

    /// Endpoint root; each provider kind has its own default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key; usually supplied through `secrets.json` or the environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Hard upper bound on any single generative call
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_classifier_max_tokens")]
    pub classifier_max_tokens: i64,

    #[serde(default)]
    pub classifier_temperature: f64,

    #[serde(default = "default_justification_max_tokens")]
    pub justification_max_tokens: i64,

    #[serde(default = "default_justification_temperature")]
    pub justification_temperature: f64,

    #[serde(default = "default_translation_max_tokens")]
    pub translation_max_tokens: i64,

    #[serde(default = "default_translation_temperature")]
    pub translation_temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            base_url: None,
            api_key: None,
            model: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
            classifier_max_tokens: default_classifier_max_tokens(),
            classifier_temperature: 0.0,
            justification_max_tokens: default_justification_max_tokens(),
            justification_temperature: default_justification_temperature(),
            translation_max_tokens: default_translation_max_tokens(),
            translation_temperature: default_translation_temperature(),
        }
    }
}

impl LlmConfig {
    /// Configured endpoint, or the default for the selected provider kind.
    pub fn effective_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| match self.provider {
            LlmProviderKind::Compatible => "https://api.openai.com".into(),
            LlmProviderKind::ApiFreeLlm => "https://apifreellm.com".into(),
        })
    }
}

fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_classifier_max_tokens() -> i64 {
    120
}

fn default_justification_max_tokens() -> i64 {
    450
}

fn default_justification_temperature() -> f64 {
    0.7
}

fn default_translation_max_tokens() -> i64 {
    700
}

fn default_translation_temperature() -> f64 {
    0.2
}

// ============================================================================
// Catalog
// ============================================================================

/// What the orchestrator does when the catalog cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnreachablePolicy {
    /// Answer with a visible "catalog unavailable" text and stop.
    #[default]
    Surface,
    /// Treat it like zero results and keep sweeping.
    Miss,
}

/// Book catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub base_url: String,

    #[serde(default = "default_catalog_timeout_secs")]
    pub timeout_secs: u64,

    /// Catalog language restriction (ISO 639-2, e.g. "por"); empty disables it
    #[serde(default = "default_catalog_language")]
    pub language: String,

    #[serde(default)]
    pub on_unreachable: UnreachablePolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            timeout_secs: default_catalog_timeout_secs(),
            language: default_catalog_language(),
            on_unreachable: UnreachablePolicy::default(),
        }
    }
}

fn default_catalog_url() -> String {
    "https://openlibrary.org".into()
}

fn default_catalog_timeout_secs() -> u64 {
    10
}

fn default_catalog_language() -> String {
    "por".into()
}

// ============================================================================
// Pipeline
// ============================================================================

/// Word lists and thresholds driving the question-answering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Display language used in prompts ("português")
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Greeting phrases short-circuiting the pipeline
    #[serde(default = "default_greetings")]
    pub greetings: Vec<String>,

    /// Off-domain denylist
    #[serde(default = "default_off_domain_terms")]
    pub off_domain_terms: Vec<String>,

    /// Whole-question noise tokens
    #[serde(default = "default_irrelevant_words")]
    pub irrelevant_words: Vec<String>,

    /// Function words of the target language
    #[serde(default = "default_function_words")]
    pub function_words: Vec<String>,

    /// Distinct function words needed to call a text "in the target language"
    #[serde(default = "default_min_function_words")]
    pub min_function_words: usize,

    /// Previous turns handed to the classifier as context
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_language: default_target_language(),
            greetings: default_greetings(),
            off_domain_terms: default_off_domain_terms(),
            irrelevant_words: default_irrelevant_words(),
            function_words: default_function_words(),
            min_function_words: default_min_function_words(),
            history_window: default_history_window(),
        }
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

fn default_target_language() -> String {
    "português".into()
}

fn default_greetings() -> Vec<String> {
    to_strings(&[
        "olá", "ola", "oi", "oie", "bom dia", "boa tarde", "boa noite", "e aí", "eai",
        "tudo bem", "hello", "hi",
    ])
}

fn default_off_domain_terms() -> Vec<String> {
    to_strings(&[
        "futebol",
        "basquete",
        "vôlei",
        "carro",
        "moto",
        "cachorro",
        "gato",
        "receita",
        "culinária",
        "bitcoin",
        "criptomoeda",
        "previsão do tempo",
        "videogame",
        "novela",
    ])
}

fn default_irrelevant_words() -> Vec<String> {
    to_strings(&[
        "a", "o", "e", "é", "de", "da", "do", "que", "um", "uma", "ok", "sim", "não", "nao",
        "teste", "hmm", "kkk", "haha", "?", "...",
    ])
}

fn default_function_words() -> Vec<String> {
    to_strings(&[
        "de", "que", "o", "a", "e", "do", "da", "em", "um", "uma", "para", "com", "não", "os",
        "as", "no", "na", "por", "mais", "dos", "das", "como", "mas", "ao", "se", "é", "sua",
        "seu",
    ])
}

fn default_min_function_words() -> usize {
    3
}

fn default_history_window() -> usize {
    6
}

// ============================================================================
// Memory
// ============================================================================

/// Transcript storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Session transcript persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: MemoryBackend,

    /// SQLite database path (`~` is expanded)
    #[serde(default = "default_memory_path")]
    pub path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackend::default(),
            path: default_memory_path(),
        }
    }
}

fn default_memory_path() -> String {
    "~/.biblio/history.db".into()
}

impl MemoryConfig {
    /// Database path with `~` and environment variables expanded.
    pub fn resolved_path(&self) -> PathBuf {
        match shellexpand::full(&self.path) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => PathBuf::from(&self.path),
        }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration structure for all Biblio services.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    /// Load configuration from the default directory, with environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from_dir(&config_dir())
    }

    /// Load configuration from a specific directory, with environment overrides.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let value = crate::config_loader::load_modular_config(Some(dir.to_path_buf()))?;
        let mut config: Self = serde_json::from_value(value)
            .with_context(|| format!("Failed to parse config from {}", dir.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("BIBLIO_PORT") {
            if let Ok(p) = port.parse() {
                self.network.port = Some(p);
            }
        }

        if let Ok(bind) = std::env::var("BIBLIO_BIND_ADDRESS") {
            self.network.bind = bind;
        }

        if let Ok(level) = std::env::var("BIBLIO_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Ok(key) =
            std::env::var("BIBLIO_LLM_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
        {
            self.llm.api_key = Some(key);
        }

        if let Ok(url) = std::env::var("BIBLIO_LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }

        if let Ok(model) = std::env::var("BIBLIO_LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(url) = std::env::var("BIBLIO_CATALOG_URL") {
            self.catalog.base_url = url;
        }

        if let Ok(path) = std::env::var("BIBLIO_DB_PATH") {
            self.memory.path = path;
        }
    }

    /// Port the HTTP front-end listens on.
    pub fn port(&self) -> u16 {
        self.network.port.unwrap_or(4480)
    }

    /// Get the effective bind address.
    pub fn bind_address(&self) -> &str {
        &self.network.bind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port(), 4480);
        assert_eq!(config.bind_address(), "127.0.0.1");
        assert_eq!(config.catalog.on_unreachable, UnreachablePolicy::Surface);
        assert_eq!(config.llm.provider, LlmProviderKind::Compatible);
        assert_eq!(config.memory.backend, MemoryBackend::Sqlite);
        assert!(config.pipeline.greetings.iter().any(|g| g == "bom dia"));
        assert_eq!(config.pipeline.min_function_words, 3);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "catalog": { "on_unreachable": "miss", "timeout_secs": 3 },
            "llm": { "provider": "apifreellm" },
            "pipeline": { "greetings": ["salve"] }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.catalog.on_unreachable, UnreachablePolicy::Miss);
        assert_eq!(config.catalog.timeout_secs, 3);
        assert_eq!(config.catalog.base_url, "https://openlibrary.org");
        assert_eq!(config.llm.provider, LlmProviderKind::ApiFreeLlm);
        assert_eq!(config.pipeline.greetings, vec!["salve".to_string()]);
        assert!(!config.pipeline.off_domain_terms.is_empty());
    }

    #[test]
    fn test_observability_aliases() {
        let json = r#"{ "level": "debug", "format": "json" }"#;
        let obs: ObservabilityConfig = serde_json::from_str(json).unwrap();
        assert_eq!(obs.log_level, "debug");
        assert_eq!(obs.log_format, "json");
    }

    #[test]
    fn test_api_key_not_serialized_when_absent() {
        let json = serde_json::to_string(&LlmConfig::default()).unwrap();
        assert!(!json.contains("api_key"));
    }

    #[test]
    fn test_llm_base_url_defaults_per_provider() {
        let mut llm = LlmConfig::default();
        assert_eq!(llm.effective_base_url(), "https://api.openai.com");

        llm.provider = LlmProviderKind::ApiFreeLlm;
        assert_eq!(llm.effective_base_url(), "https://apifreellm.com");

        llm.base_url = Some("http://localhost:11434".into());
        assert_eq!(llm.effective_base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_memory_path_expansion() {
        let memory = MemoryConfig {
            backend: MemoryBackend::Sqlite,
            path: "/tmp/biblio/history.db".into(),
        };
        assert_eq!(memory.resolved_path(), PathBuf::from("/tmp/biblio/history.db"));
    }
}
