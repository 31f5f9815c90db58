//! Shareable-link recognition and identifier extraction.

use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::FetchError;

/// Host and path shapes of the supported shareable links:
/// file-view links, `open?id=` links and generic document links.
const LINK_PATTERNS: [&str; 3] = [
    r"drive\.google\.com/file/d/",
    r"drive\.google\.com/open\?id=",
    r"docs\.google\.com/.*/(d/|id=)",
];

const PATH_ID_PATTERN: &str = r"/d/([a-zA-Z0-9_-]+)";
const QUERY_ID_PATTERN: &str = r"[?&]id=([a-zA-Z0-9_-]+)";

struct LinkMatchers {
    links: Vec<Regex>,
    path_id: Regex,
    query_id: Regex,
}

fn matchers() -> &'static LinkMatchers {
    static MATCHERS: OnceLock<LinkMatchers> = OnceLock::new();
    MATCHERS.get_or_init(|| LinkMatchers {
        links: LINK_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern).expect("link pattern is valid"))
            .collect(),
        path_id: Regex::new(PATH_ID_PATTERN).expect("path id pattern is valid"),
        query_id: Regex::new(QUERY_ID_PATTERN).expect("query id pattern is valid"),
    })
}

/// Returns true if `url` is one of the supported shareable-link formats.
pub fn recognize(url: &str) -> bool {
    matchers().links.iter().any(|re| re.is_match(url))
}

/// Pull the file identifier out of a shareable link.
///
/// The path-segment form (`/d/{id}`) is tried before the query form
/// (`?id={id}` or `&id={id}`).
pub fn extract_identifier(url: &str) -> Result<String, FetchError> {
    let m = matchers();
    m.path_id
        .captures(url)
        .or_else(|| m.query_id.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
        .ok_or_else(|| FetchError::MalformedUrl {
            url: url.to_string(),
        })
}

/// Cache slot for an identifier. Hashing the identifier rather than the URL
/// makes every link form for the same file share one slot.
pub fn cache_key(identifier: &str) -> String {
    format!("{:x}", Sha256::digest(identifier.as_bytes()))
}

/// Build a file-view link for an identifier.
pub fn file_view_link(identifier: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view", identifier)
}

/// Build an `open?id=` link for an identifier.
pub fn id_query_link(identifier: &str) -> String {
    format!("https://drive.google.com/open?id={}", identifier)
}
