use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use url::Url;

/// Extension given to fetched URL content before extraction.
pub const CONTENT_EXTENSION: &str = "html";
/// Extension of every extracted output file.
pub const OUTPUT_EXTENSION: &str = "txt";
/// Subdirectory of the output tree that receives URL results.
pub const URL_OUTPUT_DIR: &str = "urls";

const FILLER: char = '_';
const MAX_STEM_LEN: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NamingOptions {
    pub timestamp_suffix: bool,
    pub preserve_structure: bool,
}

/// Filename under which fetched URL content is staged.
///
/// A supplied name wins and only gets the content extension appended. Without
/// one the name is derived from the URL path, then the hostname, and finally a
/// timestamp when the URL does not parse.
pub fn derive_fetch_filename(url: &str, supplied: Option<&str>, now: DateTime<Utc>) -> String {
    if let Some(name) = supplied.map(str::trim).filter(|n| !n.is_empty()) {
        return with_content_extension(&replace_separators(name));
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return timestamp_name(now),
    };

    let from_path = fill_non_alphanumeric(parsed.path());
    let stem = if from_path.is_empty() {
        parsed
            .host_str()
            .map(fill_non_alphanumeric)
            .filter(|host| !host.is_empty())
    } else {
        Some(from_path)
    };

    match stem {
        Some(stem) => with_content_extension(&stem),
        None => timestamp_name(now),
    }
}

/// Output path for a file from the input tree.
pub fn file_output_path(
    output_dir: &Path,
    relative_input: &Path,
    options: NamingOptions,
    now: DateTime<Utc>,
) -> PathBuf {
    let file_stem = relative_input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = output_file_name(&file_stem, options, now);

    match relative_input.parent() {
        Some(parent) if options.preserve_structure && !parent.as_os_str().is_empty() => {
            output_dir.join(parent).join(file_name)
        }
        _ => output_dir.join(file_name),
    }
}

/// Output path for content fetched from a URL and staged as `fetch_filename`.
pub fn url_output_path(
    output_dir: &Path,
    fetch_filename: &str,
    options: NamingOptions,
    now: DateTime<Utc>,
) -> PathBuf {
    let file_stem = Path::new(fetch_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| fetch_filename.to_string());
    output_dir
        .join(URL_OUTPUT_DIR)
        .join(output_file_name(&file_stem, options, now))
}

fn output_file_name(stem: &str, options: NamingOptions, now: DateTime<Utc>) -> String {
    if options.timestamp_suffix {
        format!("{stem}_{}.{OUTPUT_EXTENSION}", timestamp(now))
    } else {
        format!("{stem}.{OUTPUT_EXTENSION}")
    }
}

fn with_content_extension(name: &str) -> String {
    let suffix = format!(".{CONTENT_EXTENSION}");
    if name.to_ascii_lowercase().ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

fn timestamp_name(now: DateTime<Utc>) -> String {
    format!("url_{}.{CONTENT_EXTENSION}", timestamp(now))
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

fn replace_separators(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '\0') { FILLER } else { c })
        .collect()
}

/// Replaces every non-alphanumeric char with the filler, collapses runs and
/// trims the filler from both ends.
fn fill_non_alphanumeric(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_filler = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            compacted.push(c);
            prev_filler = false;
        } else if !prev_filler {
            compacted.push(FILLER);
            prev_filler = true;
        }
    }
    let mut trimmed = compacted.trim_matches(FILLER).to_string();
    if trimmed.len() > MAX_STEM_LEN {
        trimmed.truncate(MAX_STEM_LEN);
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filler_collapses_runs_and_trims() {
        assert_eq!(fill_non_alphanumeric("/docs//guide-1/"), "docs_guide_1");
        assert_eq!(fill_non_alphanumeric("/"), "");
    }

    #[test]
    fn long_paths_are_truncated() {
        let long = "a".repeat(400);
        assert_eq!(fill_non_alphanumeric(&long).len(), MAX_STEM_LEN);
    }
}
