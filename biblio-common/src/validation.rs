//! Configuration validation for Biblio services.
//!
//! Provides validation logic for configuration fields to ensure
//! all required values are present and within valid ranges.

use thiserror::Error;

use crate::config::{
    CatalogConfig, Config, LlmConfig, LlmProviderKind, MemoryBackend, MemoryConfig,
    NetworkConfig, ObservabilityConfig, PipelineConfig,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let sections: [&dyn Validate; 6] = [
            &self.network,
            &self.observability,
            &self.llm,
            &self.catalog,
            &self.pipeline,
            &self.memory,
        ];

        let mut errors: Vec<ValidationError> =
            sections.iter().filter_map(|s| s.validate().err()).collect();

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

fn require_http_url(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: "must start with http:// or https://".into(),
        });
    }
    Ok(())
}

fn require_positive(field: &str, value: u64) -> ValidationResult<()> {
    if value == 0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(())
}

impl Validate for NetworkConfig {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(0) = self.port {
            return Err(ValidationError::InvalidPort {
                port: 0,
                field: "network.port".into(),
            });
        }
        if self.bind.parse::<std::net::IpAddr>().is_err() {
            return Err(ValidationError::InvalidValue {
                field: "network.bind".into(),
                reason: format!("'{}' is not an IP address", self.bind),
            });
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let level = self.log_level.to_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("unknown level '{}'", self.log_level),
            });
        }
        if !["json", "pretty"].contains(&self.log_format.as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: "must be 'json' or 'pretty'".into(),
            });
        }
        Ok(())
    }
}

impl Validate for LlmConfig {
    fn validate(&self) -> ValidationResult<()> {
        require_http_url("llm.base_url", &self.effective_base_url())?;
        require_positive("llm.timeout_secs", self.timeout_secs)?;

        if self.provider == LlmProviderKind::Compatible && self.model.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "llm.model".into(),
            });
        }

        for (field, temp) in [
            ("llm.classifier_temperature", self.classifier_temperature),
            ("llm.justification_temperature", self.justification_temperature),
            ("llm.translation_temperature", self.translation_temperature),
        ] {
            if !(0.0..=2.0).contains(&temp) {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    reason: "must be between 0.0 and 2.0".into(),
                });
            }
        }
        Ok(())
    }
}

impl Validate for CatalogConfig {
    fn validate(&self) -> ValidationResult<()> {
        require_http_url("catalog.base_url", &self.base_url)?;
        require_positive("catalog.timeout_secs", self.timeout_secs)
    }
}

impl Validate for PipelineConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.function_words.len() < self.min_function_words {
            return Err(ValidationError::InvalidValue {
                field: "pipeline.min_function_words".into(),
                reason: format!(
                    "needs {} function words but only {} are configured",
                    self.min_function_words,
                    self.function_words.len()
                ),
            });
        }
        if self.target_language.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "pipeline.target_language".into(),
            });
        }
        Ok(())
    }
}

impl Validate for MemoryConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.backend == MemoryBackend::Sqlite && self.path.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "memory.path".into(),
            });
        }
        Ok(())
    }
}
