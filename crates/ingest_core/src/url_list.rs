use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEntry {
    /// The URL exactly as written in the list.
    pub url: String,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedUrlList {
    pub entries: Vec<UrlEntry>,
    /// Non-comment lines whose first token is not an http(s) URL.
    pub rejected: Vec<RejectedLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    pub line_number: usize,
    pub text: String,
}

/// Parses a URL list: one `URL [output-name]` per line, `#` starts a comment
/// line, blank lines are ignored. Malformed URLs are collected in `rejected`.
pub fn parse_url_list(content: &str) -> ParsedUrlList {
    let mut parsed = ParsedUrlList::default();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if is_ignorable(line) {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(candidate) = tokens.next() else {
            continue;
        };
        if !is_http_url(candidate) {
            parsed.rejected.push(RejectedLine {
                line_number: index + 1,
                text: line.to_string(),
            });
            continue;
        }
        parsed.entries.push(UrlEntry {
            url: candidate.to_string(),
            filename: tokens.next().map(ToOwned::to_owned),
        });
    }
    parsed
}

/// A text file is a URL list when it has at least one entry and every
/// non-comment, non-blank line starts with an http(s) URL.
pub fn is_url_list(content: &str) -> bool {
    let mut saw_entry = false;
    for line in content.lines().map(str::trim) {
        if is_ignorable(line) {
            continue;
        }
        match line.split_whitespace().next() {
            Some(candidate) if is_http_url(candidate) => saw_entry = true,
            _ => return false,
        }
    }
    saw_entry
}

pub fn is_http_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

fn is_ignorable(line: &str) -> bool {
    line.is_empty() || line.starts_with('#')
}
