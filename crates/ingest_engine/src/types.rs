use std::fmt;

/// One retrieval backend in the URL fallback chain, in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Direct,
    Browser,
    RenderApi,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Direct, Layer::Browser, Layer::RenderApi];
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Direct => write!(f, "direct"),
            Layer::Browser => write!(f, "browser"),
            Layer::RenderApi => write!(f, "render-api"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub final_url: String,
}

/// Result of a single layer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub layer: Layer,
    pub result: Result<FetchedContent, FetchError>,
}

impl FetchOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    /// The page needs client-side rendering to show its content.
    NeedsRendering,
    Disabled,
    Launch,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::NeedsRendering => write!(f, "page requires javascript rendering"),
            FailureKind::Disabled => write!(f, "layer disabled"),
            FailureKind::Launch => write!(f, "failed to launch renderer"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
