use std::fmt;
use std::path::PathBuf;

/// Hex digest of a work item's content, used only for change detection.
pub type Fingerprint = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    File,
    Url,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::File => write!(f, "file"),
            SourceKind::Url => write!(f, "url"),
        }
    }
}

/// One unit of work discovered in a cycle.
///
/// The `key` is the ledger identity: the absolute source path for files, the
/// URL string for URL-derived items. `source_path` is what the extraction
/// service reads; for URL items it points at the staged fetched content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub key: String,
    pub kind: SourceKind,
    /// Path relative to the input (or staging) root, used for display and to
    /// mirror the layout in the error tree.
    pub display_path: PathBuf,
    pub source_path: PathBuf,
    pub fingerprint: Fingerprint,
    pub output_path: PathBuf,
    /// Caller-supplied name from a URL list entry.
    pub output_name: Option<String>,
}

impl WorkItem {
    pub fn file(
        source_path: PathBuf,
        display_path: PathBuf,
        fingerprint: Fingerprint,
        output_path: PathBuf,
    ) -> Self {
        Self {
            key: source_path.to_string_lossy().into_owned(),
            kind: SourceKind::File,
            display_path,
            source_path,
            fingerprint,
            output_path,
            output_name: None,
        }
    }

    pub fn url(
        url: &str,
        staged_path: PathBuf,
        display_path: PathBuf,
        fingerprint: Fingerprint,
        output_path: PathBuf,
        output_name: Option<String>,
    ) -> Self {
        Self {
            key: url.to_string(),
            kind: SourceKind::Url,
            display_path,
            source_path: staged_path,
            fingerprint,
            output_path,
            output_name,
        }
    }
}
