//! Optional scrubbing of values written by course content.
//!
//! Content runs in a sandboxed frame but its values end up in dashboards and
//! reports, so hosts may strip markup that could execute when rendered.

use regex::Regex;
use std::sync::LazyLock;

static MARKUP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // Whole <script>...</script> blocks
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script block pattern"),
        // Stray opening script tags
        Regex::new(r"(?i)<script\b[^>]*>").expect("script tag pattern"),
        // javascript: URLs
        Regex::new(r"(?i)javascript:").expect("javascript url pattern"),
        // Inline handlers such as onclick=
        Regex::new(r"(?i)\bon\w+\s*=").expect("inline handler pattern"),
    ]
});

/// Strips markup; only a value that lost markup is trimmed.
pub fn sanitize_value(input: &str) -> String {
    let mut result = input.to_string();
    for pattern in MARKUP_PATTERNS.iter() {
        result = pattern.replace_all(&result, "").to_string();
    }
    if result == input {
        result
    } else {
        result.trim().to_string()
    }
}
