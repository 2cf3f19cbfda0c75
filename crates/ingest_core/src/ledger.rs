use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version this build writes and trusts. Files with any other version
/// are discarded on load.
pub const LEDGER_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub hash: String,
    pub output_path: PathBuf,
    pub processed_at: DateTime<Utc>,
    pub retries: u32,
}

/// Persisted map of work-item keys to their last successful outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    pub version: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub files: BTreeMap<String, LedgerEntry>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            version: LEDGER_VERSION.to_string(),
            last_updated: Utc::now(),
            files: BTreeMap::new(),
        }
    }

    pub fn is_current_version(&self) -> bool {
        self.version == LEDGER_VERSION
    }

    /// True iff an entry exists for `key` and its hash equals `fingerprint`.
    pub fn is_processed(&self, key: &str, fingerprint: &str) -> bool {
        self.files
            .get(key)
            .is_some_and(|entry| entry.hash == fingerprint)
    }

    /// Upserts the entry for `key`. Callers must only do this after the
    /// corresponding extraction succeeded.
    pub fn mark_processed(
        &mut self,
        key: impl Into<String>,
        fingerprint: impl Into<String>,
        output_path: &Path,
        retries: u32,
    ) {
        self.files.insert(
            key.into(),
            LedgerEntry {
                hash: fingerprint.into(),
                output_path: output_path.to_path_buf(),
                processed_at: Utc::now(),
                retries,
            },
        );
    }

    pub fn entry(&self, key: &str) -> Option<&LedgerEntry> {
        self.files.get(key)
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
