//! Biblio Common - Shared configuration, errors, and logging for the Biblio services.
//!
//! This crate provides:
//! - Configuration types and loading (`~/.biblio/config.json` + `secrets.json`)
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup and structured logging helpers
//! - Small text utilities used when logging user input

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    CatalogConfig, Config, LlmConfig, LlmProviderKind, MemoryBackend, MemoryConfig,
    NetworkConfig, ObservabilityConfig, PipelineConfig, UnreachablePolicy,
};
pub use error::Error;
pub use validation::{Validate, ValidationError, ValidationResult};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{CatalogConfig, Config, LlmConfig, PipelineConfig};
    pub use crate::error::Error;
    pub use crate::logging::init_logging;
    pub use crate::validation::{Validate, ValidationError};
}
