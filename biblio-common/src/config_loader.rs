//! Modular configuration loader for Biblio services.
//!
//! Supports loading configuration from multiple files:
//! - `config.json` - Core configuration
//! - `secrets.json` - Credentials (LLM API key), deep-merged over `config.json`
//!
//! Files are loaded from `~/.biblio/` unless another directory is given.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::config_dir;

/// Configuration file names
pub const CONFIG_FILES: &[&str] = &["config.json", "secrets.json"];

/// Load a JSON file and return its contents as a Value.
/// Returns None if file doesn't exist.
fn load_json_file(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(Some(value))
}

/// Deep merge two JSON values.
/// Source values override target values, with object merging at each level.
fn merge_json(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, source_value) in source_map {
                match target_map.get_mut(&key) {
                    Some(target_value) => {
                        merge_json(target_value, source_value);
                    }
                    None => {
                        target_map.insert(key, source_value);
                    }
                }
            }
        }
        (target, source) => {
            *target = source;
        }
    }
}

/// Load modular configuration from the config directory.
///
/// Priority (lowest to highest):
/// 1. config.json
/// 2. secrets.json
/// 3. Environment variables (applied separately by `Config::apply_env_overrides`)
pub fn load_modular_config(dir: Option<PathBuf>) -> Result<Value> {
    let cfg_dir = dir.unwrap_or_else(config_dir);

    tracing::debug!("Loading modular config from {}", cfg_dir.display());

    let mut config = match load_json_file(&cfg_dir.join("config.json"))? {
        Some(value) => value,
        None => {
            tracing::info!("Config file not found, using defaults");
            Value::Object(Default::default())
        }
    };

    if let Some(secrets) = load_json_file(&cfg_dir.join("secrets.json"))? {
        // Meta-fields like "$schema" or "_comment" are not configuration
        let secrets = match secrets {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .filter(|(key, _)| !key.starts_with('$') && !key.starts_with('_'))
                    .collect(),
            ),
            other => other,
        };
        merge_json(&mut config, secrets);
        tracing::debug!("Loaded secrets.json");
    }

    Ok(config)
}

/// Check which modular config files exist.
pub fn check_modular_files(dir: Option<PathBuf>) -> Vec<(String, bool)> {
    let cfg_dir = dir.unwrap_or_else(config_dir);

    CONFIG_FILES
        .iter()
        .map(|file| {
            let path = cfg_dir.join(file);
            (file.to_string(), path.exists())
        })
        .collect()
}
