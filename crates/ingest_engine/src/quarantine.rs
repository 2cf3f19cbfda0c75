use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use ingest_core::WorkItem;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuarantineError {
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("failed to write error log {path}: {source}")]
    Log { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantineRecord {
    pub copy_path: PathBuf,
    pub log_path: PathBuf,
}

/// Error tree that receives copies of inputs which exhausted their retries.
#[derive(Debug, Clone)]
pub struct Quarantine {
    error_dir: PathBuf,
}

impl Quarantine {
    pub fn new(error_dir: impl Into<PathBuf>) -> Self {
        Self {
            error_dir: error_dir.into(),
        }
    }

    pub fn error_dir(&self) -> &Path {
        &self.error_dir
    }

    /// Copies (never moves) the item's input into the error tree at its
    /// relative path and writes a sibling `<name>.error.log`.
    pub async fn quarantine(
        &self,
        item: &WorkItem,
        error: &str,
    ) -> Result<QuarantineRecord, QuarantineError> {
        let copy_path = self.error_dir.join(safe_relative(&item.display_path));
        let log_path = log_path_for(&copy_path);

        if let Some(parent) = copy_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| QuarantineError::Copy {
                    from: item.source_path.clone(),
                    to: copy_path.clone(),
                    source,
                })?;
        }
        tokio::fs::copy(&item.source_path, &copy_path)
            .await
            .map_err(|source| QuarantineError::Copy {
                from: item.source_path.clone(),
                to: copy_path.clone(),
                source,
            })?;

        let report = format!(
            "error: {error}\ntimestamp: {}\noriginal: {}\nkey: {}\nkind: {}\n",
            Utc::now().to_rfc3339(),
            item.source_path.display(),
            item.key,
            item.kind,
        );
        tokio::fs::write(&log_path, report)
            .await
            .map_err(|source| QuarantineError::Log {
                path: log_path.clone(),
                source,
            })?;

        Ok(QuarantineRecord {
            copy_path,
            log_path,
        })
    }
}

fn log_path_for(copy_path: &Path) -> PathBuf {
    let name = copy_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    copy_path.with_file_name(format!("{name}.error.log"))
}

/// Keeps only normal components so a crafted relative path cannot escape the
/// error tree.
fn safe_relative(path: &Path) -> PathBuf {
    let cleaned: PathBuf = path
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    if cleaned.as_os_str().is_empty() {
        PathBuf::from("input")
    } else {
        cleaned
    }
}
