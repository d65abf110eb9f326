use std::path::PathBuf;

use parcel_ledger::LedgerError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("logging already initialized: {0}")]
    Logging(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
