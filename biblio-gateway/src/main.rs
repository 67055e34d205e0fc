//! Biblio Gateway - Main entry point.

use biblio_common::config::config_path;
use biblio_common::config_loader::check_modular_files;
use biblio_common::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    for (file, present) in check_modular_files(None) {
        tracing::debug!(file = %file, present, "Config file");
    }
    tracing::info!(path = %config_path().display(), "Configuration loaded");

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    tracing::info!("Biblio Gateway v{}", env!("CARGO_PKG_VERSION"));

    biblio_gateway::start_server(&config).await
}
