use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (zero prefix length, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Store file exists but does not hold a ledger document.
    #[error("store file '{}' is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    /// Backend refused the write (quota, unavailable, ...).
    #[error("persist failed: {0}")]
    Persist(String),
    #[error("invalid manual entry: {0}")]
    InvalidManualEntry(String),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
