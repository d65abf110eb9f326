// Tracing bootstrap for binaries embedding the ledger.

use tracing_subscriber::EnvFilter;

use crate::error::ConfigError;

/// Build the filter: `RUST_LOG` wins over the configured directive string.
pub fn env_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured))
}

/// Install a stderr `fmt` subscriber. Fails if one is already installed.
pub fn init(filter: &str) -> Result<(), ConfigError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(filter))
        .with_target(false)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    tracing::info!(filter, "logging initialized");
    Ok(())
}
