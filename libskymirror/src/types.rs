//! Core types for Skymirror

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Separator inserted between a post body and its quoted sub-item.
pub const QUOTE_SEPARATOR: &str = "\n\n\u{1F4AC}\n\n";

/// Glyph prefixed to mirrored reposts.
pub const REPOST_GLYPH: &str = "\u{1F501}";

/// A timeline item composed into mirror-ready form. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    /// Original item text as delivered by the source.
    pub text: String,
    /// Author handle, without the leading `@`.
    pub author: String,
    /// Preferred media URL (first photo, else first video).
    pub media_url: Option<String>,
    /// The reposted original, when the item is a repost.
    pub repost: Option<SubItem>,
    /// The quoted item, when the item quotes another.
    pub quote: Option<SubItem>,
}

/// A quoted or reposted sub-item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubItem {
    pub text: String,
    pub author: String,
}

impl SourceItem {
    /// True when the source marked this item as a repost.
    pub fn is_repost(&self) -> bool {
        self.text.starts_with("RT ")
    }

    /// Compose the destination post text. The result is also the seen-set
    /// key, so this must be deterministic for a given item.
    pub fn formatted_text(&self) -> String {
        let text = if self.is_repost() {
            // The repost's own text is a truncated copy; the body comes from
            // the referenced original.
            match &self.repost {
                Some(original) => format!(
                    "{} @{} retweeted\n@{} {}",
                    REPOST_GLYPH, self.author, original.author, original.text
                ),
                None => format!("{} @{} retweeted\n", REPOST_GLYPH, self.author),
            }
        } else {
            let mut out = format!("@{} tweeted\n{}", self.author, self.text);
            if let Some(quote) = &self.quote {
                out.push_str(QUOTE_SEPARATOR);
                out.push_str(&format!("@{} {}", quote.author, quote.text));
            }
            out
        };
        scrub_entities(&text)
    }
}

/// Undo the `&amp;` escaping the source applies to item text.
pub fn scrub_entities(text: &str) -> String {
    text.replace("&amp;", "&")
}

/// Append-only set of already-mirrored formatted texts. Process-lifetime
/// only; nothing is persisted and nothing can be removed.
#[derive(Debug, Clone, Default)]
pub struct SeenSet(HashSet<String>);

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a formatted text. Returns `false` when it was already present.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.0.insert(key.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A URL match over the UTF-8 encoding of a text.
///
/// `byte_start..byte_end` index the encoded bytes, not chars: slicing the
/// encoded text with that range yields exactly the matched URL's encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpan {
    pub url: String,
    pub byte_start: usize,
    pub byte_end: usize,
}

// ============================================================================
// Destination wire types
// ============================================================================
//
// These serialize to the record shapes the destination expects; the `$type`
// discriminators and camelCase field names are part of the wire contract.

/// Byte range of a facet within a post's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteSlice {
    #[serde(rename = "byteStart")]
    pub byte_start: usize,
    #[serde(rename = "byteEnd")]
    pub byte_end: usize,
}

/// Link feature attached to a facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFeature {
    #[serde(rename = "$type")]
    pub kind: String,
    pub uri: String,
}

impl LinkFeature {
    pub fn link(uri: impl Into<String>) -> Self {
        Self {
            kind: "app.bsky.richtext.facet#link".to_string(),
            uri: uri.into(),
        }
    }
}

/// A rich-text annotation over a byte range of the post text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFacet {
    pub index: ByteSlice,
    pub features: Vec<LinkFeature>,
}

impl LinkFacet {
    pub fn from_span(span: &LinkSpan) -> Self {
        Self {
            index: ByteSlice {
                byte_start: span.byte_start,
                byte_end: span.byte_end,
            },
            features: vec![LinkFeature::link(&span.url)],
        }
    }
}

/// External link card carried by an embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalCard {
    pub uri: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<BlobRef>,
}

/// External link embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalEmbed {
    #[serde(rename = "$type")]
    pub kind: String,
    pub external: ExternalCard,
}

impl ExternalEmbed {
    pub fn new(external: ExternalCard) -> Self {
        Self {
            kind: "app.bsky.embed.external".to_string(),
            external,
        }
    }
}

/// Immutable pointer to a created post record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}

/// Reply linkage: `root` anchors the thread, `parent` is the post being
/// replied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
    pub root: StrongRef,
    pub parent: StrongRef,
}

/// Blob descriptor returned by the destination's upload operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobRef {
    #[serde(rename = "$type")]
    pub kind: String,
    #[serde(rename = "ref")]
    pub link: CidLink,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidLink {
    #[serde(rename = "$link")]
    pub link: String,
}

/// A fully formatted destination post, ready to create.
///
/// `text` never exceeds the destination's unit limit; facet byte ranges
/// always index into `text` itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    pub text: String,
    pub facets: Vec<LinkFacet>,
    pub embed: Option<ExternalEmbed>,
    pub reply: Option<ReplyRef>,
}

impl PostDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            facets: Vec::new(),
            embed: None,
            reply: None,
        }
    }
}

/// Outcome of posting one item as a thread: the root ref plus every reply
/// ref in posting order (each reply's parent is its predecessor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadReceipt {
    pub root: StrongRef,
    pub replies: Vec<StrongRef>,
}

impl ThreadReceipt {
    /// Total records created, root included.
    pub fn posts_created(&self) -> usize {
        1 + self.replies.len()
    }
}
