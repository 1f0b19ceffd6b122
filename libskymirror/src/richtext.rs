//! Link extraction and length splitting for destination posts
//!
//! The destination's rich-text facets are byte-oriented: a link annotation
//! carries the byte range of the URL within the UTF-8 encoded post text.
//! Extraction therefore runs byte regexes over the encoded text so that
//! match offsets are usable as facet ranges directly.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::types::LinkSpan;

/// Maximum post length in text units (chars) accepted by the destination.
pub const MAX_POST_UNITS: usize = 300;

// ASCII-only word classes: URLs are ASCII, and unicode classes over bytes
// would let a match start inside a multi-byte sequence.
static STRICT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)https?://(?:[\w-]+\.)*[\w-]+[.:]\w+/?(?:[/?=&#.]?[\w-]+)+/?")
        .expect("strict url pattern")
});

static AGGRESSIVE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)(?:[\w+]+://)?(?:[\w-]+\.)*[\w-]+[.:]\w+/?(?:[/?=&#.]?[\w-]+)+/?")
        .expect("aggressive url pattern")
});

/// How eagerly to treat text as containing links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// `http://` / `https://` URLs only.
    Strict,
    /// Also match bare domains such as `example.com/page`.
    Aggressive,
}

/// Scan `text` for URL substrings.
///
/// Returned spans are ordered, non-overlapping, and index the UTF-8
/// encoding of `text`: `&text.as_bytes()[span.byte_start..span.byte_end]`
/// is exactly the matched URL's encoding. Matched URLs are not escaped.
pub fn extract_link_spans(text: &str, mode: LinkMode) -> Vec<LinkSpan> {
    let pattern: &Regex = match mode {
        LinkMode::Strict => &STRICT_URL,
        LinkMode::Aggressive => &AGGRESSIVE_URL,
    };

    pattern
        .find_iter(text.as_bytes())
        .filter_map(|m| {
            // Matches are ASCII by construction, so this cannot fail.
            std::str::from_utf8(m.as_bytes()).ok().map(|url| LinkSpan {
                url: url.to_string(),
                byte_start: m.start(),
                byte_end: m.end(),
            })
        })
        .collect()
}

/// Prefix scheme-less matches (aggressive mode) so they are usable as URIs.
pub fn normalize_scheme(url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Number of text units (chars) in `text`.
pub fn unit_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` into a head of at most `limit` units plus the overage.
///
/// Texts within the limit pass through unchanged with empty overage.
/// Longer texts split at the last whitespace char at position `1..limit`;
/// the boundary char is dropped, so the head carries no trailing whitespace
/// and the overage no leading whitespace. When no boundary exists in range
/// the split degenerates to a hard cut at exactly `limit` units, so
/// splitting always makes progress.
pub fn split_at_boundary(text: &str, limit: usize) -> (String, String) {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    if chars.len() <= limit {
        return (text.to_string(), String::new());
    }

    match (1..limit).rev().find(|&p| chars[p].1.is_whitespace()) {
        Some(p) => {
            let (byte, ch) = chars[p];
            let head = text[..byte].trim_end().to_string();
            let rest = text[byte + ch.len_utf8()..].trim_start().to_string();
            (head, rest)
        }
        None => {
            let byte = chars[limit].0;
            (text[..byte].to_string(), text[byte..].to_string())
        }
    }
}
