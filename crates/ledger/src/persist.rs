//! Persistence backends for the ledger document.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::store::LedgerState;

/// Where the ledger document lives. `save` must be all-or-nothing: after an
/// error the previously saved document is still the one `load` returns.
pub trait Persist: Send {
    fn load(&mut self) -> LedgerResult<LedgerState>;
    fn save(&mut self, state: &LedgerState) -> LedgerResult<()>;
}

/// Keeps the last saved document in memory. Used by tests and by callers that
/// only want a session-scoped ledger.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    saved: LedgerState,
    saves: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: LedgerState) -> Self {
        Self { saved: state, saves: 0 }
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl Persist for MemoryBackend {
    fn load(&mut self) -> LedgerResult<LedgerState> {
        Ok(self.saved.clone())
    }

    fn save(&mut self, state: &LedgerState) -> LedgerResult<()> {
        self.saved = state.clone();
        self.saves += 1;
        Ok(())
    }
}

/// JSON document on disk. Writes go to a sibling temp file which is then
/// renamed over the target.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Persist for JsonFileBackend {
    fn load(&mut self) -> LedgerResult<LedgerState> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no store file yet, starting empty");
            return Ok(LedgerState::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(LedgerState::default());
        }
        serde_json::from_str(&contents).map_err(|e| LedgerError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn save(&mut self, state: &LedgerState) -> LedgerResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.temp_path();
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}
