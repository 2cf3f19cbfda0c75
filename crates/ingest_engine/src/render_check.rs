//! Heuristics that flag a directly fetched page as needing client-side
//! rendering even though the HTTP request itself succeeded.

use std::fmt;

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

const JS_NOTICES: &[&str] = &[
    "enable javascript",
    "javascript is required",
    "javascript is disabled",
    "requires javascript",
    "turn on javascript",
    "javascript must be enabled",
    "please enable js",
];

/// Attributes and inline state blobs left behind by SPA frameworks.
const HYDRATION_MARKERS: &[&str] = &[
    "id=\"__next\"",
    "id=\"__nuxt\"",
    "id=\"root\"",
    "id=\"app\"",
    "data-reactroot",
    "ng-version",
    "data-server-rendered",
    "__NEXT_DATA__",
    "window.__NUXT__",
    "window.__INITIAL_STATE__",
];

const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    "#__next",
    "#__nuxt",
    "#root",
    "#app",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCheck {
    /// Below this many visible characters the page is an empty shell.
    pub min_visible_chars: usize,
    /// A hydration-marked page needs at least this much main-content text.
    pub min_main_chars: usize,
}

impl Default for RenderCheck {
    fn default() -> Self {
        Self {
            min_visible_chars: 64,
            min_main_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderReason {
    JavaScriptNotice,
    EmptyShell,
    UnhydratedFramework,
}

impl fmt::Display for RenderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderReason::JavaScriptNotice => write!(f, "page asks for javascript"),
            RenderReason::EmptyShell => write!(f, "document is an empty shell"),
            RenderReason::UnhydratedFramework => {
                write!(f, "framework markers without rendered main content")
            }
        }
    }
}

/// Returns why `html` cannot be used without rendering, or `None` if the
/// static document already carries readable content.
pub fn detect_rendering_requirement(html: &str, check: &RenderCheck) -> Option<RenderReason> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let with_noscript = collect_text(root, true).to_ascii_lowercase();
    if JS_NOTICES.iter().any(|notice| with_noscript.contains(notice)) {
        return Some(RenderReason::JavaScriptNotice);
    }

    let visible = collect_text(root, false);
    if visible.chars().count() < check.min_visible_chars {
        return Some(RenderReason::EmptyShell);
    }

    if HYDRATION_MARKERS.iter().any(|marker| html.contains(marker)) {
        let main_len = main_content_text(&document)
            .map(|text| text.chars().count())
            .unwrap_or(0);
        if main_len < check.min_main_chars {
            return Some(RenderReason::UnhydratedFramework);
        }
    }

    None
}

fn main_content_text(document: &Html) -> Option<String> {
    MAIN_CONTENT_SELECTORS
        .iter()
        .filter_map(|raw| Selector::parse(raw).ok())
        .find_map(|selector| document.select(&selector).next())
        .map(|element| collect_text(element, false))
}

/// Whitespace-normalized text of `element`, skipping script-like subtrees.
fn collect_text(element: ElementRef, include_noscript: bool) -> String {
    let mut raw = String::new();
    for child in element.children() {
        visit(child, include_noscript, &mut raw);
    }
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn visit(node: NodeRef<'_, Node>, include_noscript: bool, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            out.push_str(text);
            out.push(' ');
        }
        Node::Element(element) => {
            let hidden = match element.name() {
                "script" | "style" | "template" | "head" => true,
                "noscript" => !include_noscript,
                _ => false,
            };
            if !hidden {
                for child in node.children() {
                    visit(child, include_noscript, out);
                }
            }
        }
        _ => {}
    }
}
