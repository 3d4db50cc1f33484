//! HTML sanitising for user-supplied free text.
//!
//! Captions, comments, messages and bios are stored as plain text: markup is
//! removed entirely and any stray angle brackets are escaped.

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|iframe|object|embed)\b[^>]*>.*?</\s*(script|style|iframe|object|embed)\s*>")
        .expect("valid script block regex")
});

static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)</?[a-zA-Z!/][^>]*>").expect("valid tag regex"));

/// Strip HTML from `input`, returning plain text.
pub fn sanitize_html(input: &str) -> String {
    let without_blocks = SCRIPT_BLOCK.replace_all(input, "");
    let without_tags = TAG.replace_all(&without_blocks, "");
    without_tags
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .trim()
        .to_string()
}

/// Sanitise an optional field in place.
pub fn sanitize_opt(value: &mut Option<String>) {
    if let Some(v) = value.as_mut() {
        *v = sanitize_html(v);
    }
}

/// Request payloads whose free-text fields must be sanitised after
/// schema validation.
pub trait Sanitize {
    fn sanitize(&mut self) {}
}
