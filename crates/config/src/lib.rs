// Configuration loading

pub mod error;
pub mod logging;
pub mod settings;

pub use error::ConfigError;
pub use settings::Settings;

use parcel_ledger::{JsonFileBackend, Ledger};

/// Open the JSON-backed ledger the settings point at.
pub fn open_ledger(settings: &Settings) -> Result<Ledger<JsonFileBackend>, ConfigError> {
    let config = settings.ledger_config()?;
    open_ledger_with(settings, config)
}

/// Same as [`open_ledger`] with an explicit ledger config.
pub fn open_ledger_with(
    settings: &Settings,
    config: parcel_ledger::LedgerConfig,
) -> Result<Ledger<JsonFileBackend>, ConfigError> {
    let path = settings.effective_store_path();
    tracing::debug!(path = %path.display(), "opening ledger store");
    Ok(Ledger::open(JsonFileBackend::new(path), config)?)
}
