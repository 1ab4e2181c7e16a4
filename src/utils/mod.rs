//! Utility functions and helpers.

pub mod http;
pub mod url;

pub use self::url::{canonicalize, canonicalize_with_host, resolve_url};

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
