use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_warn};
use ingest_core::is_url_list;
use walkdir::{DirEntry, WalkDir};

const TEMP_SUFFIXES: [&str; 3] = ["~", ".tmp", ".part"];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Path relative to the scanned root.
    pub relative: PathBuf,
}

/// Candidate inputs of one scan, split by kind. Both lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inputs {
    pub url_lists: Vec<DiscoveredFile>,
    pub documents: Vec<DiscoveredFile>,
}

/// Scans the input tree for work.
#[derive(Debug, Clone)]
pub struct Discovery {
    root: PathBuf,
    recursive: bool,
    excluded: Vec<PathBuf>,
}

impl Discovery {
    pub fn new(root: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            root: root.into(),
            recursive,
            excluded: Vec::new(),
        }
    }

    /// Skips `dir` during the walk, for output trees nested in the input tree.
    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the tree and classifies `.txt` files whose content is a URL list.
    ///
    /// A missing root yields no inputs rather than an error. Entries that
    /// cannot be read are logged and skipped; they never fail the scan.
    pub async fn scan(&self) -> io::Result<Inputs> {
        if let Err(err) = tokio::fs::metadata(&self.root).await {
            if err.kind() == io::ErrorKind::NotFound {
                engine_warn!("Input directory {:?} does not exist", self.root);
                return Ok(Inputs::default());
            }
            return Err(err);
        }

        let walker = self.clone();
        let mut files = tokio::task::spawn_blocking(move || walker.walk())
            .await
            .map_err(io::Error::other)?;
        files.sort();

        let mut inputs = Inputs::default();
        for file in files {
            if has_txt_extension(&file.path) && read_is_url_list(&file.path).await {
                engine_debug!("Classified {:?} as a URL list", file.relative);
                inputs.url_lists.push(file);
            } else {
                inputs.documents.push(file);
            }
        }
        Ok(inputs)
    }

    fn walk(&self) -> Vec<DiscoveredFile> {
        let mut walker = WalkDir::new(&self.root).follow_links(true);
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        let mut found = Vec::new();
        let entries = walker
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || self.keeps(entry));
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    engine_warn!("Skipping unreadable entry under {:?}: {}", self.root, err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            let relative = path.strip_prefix(&self.root).unwrap_or(&path).to_path_buf();
            found.push(DiscoveredFile { path, relative });
        }
        found
    }

    fn keeps(&self, entry: &DirEntry) -> bool {
        if is_ignored(&entry.file_name().to_string_lossy()) {
            return false;
        }
        !(entry.file_type().is_dir() && self.excluded.iter().any(|ex| ex == entry.path()))
    }
}

fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || TEMP_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

fn has_txt_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}

async fn read_is_url_list(path: &Path) -> bool {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => is_url_list(&text),
        // Not UTF-8 or unreadable: hand it to extraction as a regular file.
        Err(_) => false,
    }
}
