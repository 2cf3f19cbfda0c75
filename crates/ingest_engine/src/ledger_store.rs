use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::{engine_info, engine_warn};
use ingest_core::{Ledger, LEDGER_VERSION};

use crate::persist::{write_json_atomic, PersistError};

/// Loads and saves the dedup ledger at a fixed path.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted ledger. A missing, unreadable, unparsable or
    /// version-mismatched file yields a fresh empty ledger.
    pub fn load(&self) -> Ledger {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                engine_info!("No ledger at {:?}, starting empty", self.path);
                return Ledger::new();
            }
            Err(err) => {
                engine_warn!("Failed to read ledger from {:?}: {}", self.path, err);
                return Ledger::new();
            }
        };

        let ledger: Ledger = match serde_json::from_str(&content) {
            Ok(ledger) => ledger,
            Err(err) => {
                engine_warn!("Failed to parse ledger from {:?}: {}", self.path, err);
                return Ledger::new();
            }
        };

        if !ledger.is_current_version() {
            engine_warn!(
                "Ledger {:?} has version {} but {} is required; discarding",
                self.path,
                ledger.version,
                LEDGER_VERSION
            );
            return Ledger::new();
        }

        engine_info!(
            "Loaded ledger from {:?} with {} entries",
            self.path,
            ledger.len()
        );
        ledger
    }

    /// Stamps `lastUpdated` and writes the ledger via temp-then-rename.
    pub fn save(&self, ledger: &mut Ledger) -> Result<(), PersistError> {
        ledger.touch();
        write_json_atomic(&self.path, ledger)
    }

    /// Like [`LedgerStore::save`], but failures are only logged; the caller
    /// keeps its in-memory ledger and retries at the next save point.
    pub fn save_or_warn(&self, ledger: &mut Ledger) -> bool {
        match self.save(ledger) {
            Ok(()) => true,
            Err(err) => {
                engine_warn!("Failed to save ledger to {:?}: {}", self.path, err);
                false
            }
        }
    }
}
