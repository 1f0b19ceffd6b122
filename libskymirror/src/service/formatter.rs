//! Destination post formatting
//!
//! Turns a composed source text into a root `PostDraft` plus the overage
//! left for threading: link facets, optional external embed enriched from
//! the first link's Open Graph tags, and the length split.

use reqwest::Client;

use crate::error::Result;
use crate::platforms::Destination;
use crate::preview;
use crate::richtext::{
    extract_link_spans, normalize_scheme, split_at_boundary, LinkMode, MAX_POST_UNITS,
};
use crate::types::{ExternalCard, ExternalEmbed, LinkFacet, PostDraft};

/// Build the root draft for `text` and return it with the overage.
///
/// When the text carries a link, the first one is resolved through its
/// redirect chain and becomes an external embed; its thumbnail is the
/// page's `og:image`, or `fallback_image` when the page has none. Preview
/// fetch failures propagate — the caller decides whether the cycle
/// survives them.
///
/// Facets are computed over the returned head only, so every byte range
/// indexes into the text it annotates.
pub async fn build_post<D: Destination>(
    destination: &D,
    http: &Client,
    text: &str,
    fallback_image: Option<&str>,
) -> Result<(PostDraft, String)> {
    let embed = match extract_link_spans(text, LinkMode::Strict).first() {
        Some(span) => Some(build_card(destination, http, &span.url, fallback_image).await?),
        None => None,
    };

    let (head, overage) = split_at_boundary(text, MAX_POST_UNITS);
    let facets = link_facets(&head);

    Ok((
        PostDraft {
            text: head,
            facets,
            embed,
            reply: None,
        },
        overage,
    ))
}

/// Resolve one link into an external embed, uploading its thumbnail.
async fn build_card<D: Destination>(
    destination: &D,
    http: &Client,
    url: &str,
    fallback_image: Option<&str>,
) -> Result<ExternalEmbed> {
    let uri = normalize_scheme(url);
    let (final_url, meta) = preview::fetch_page_meta(http, &uri).await?;
    tracing::debug!(original = %uri, resolved = %final_url, "resolved link for embed");

    let image_url = meta.image.as_deref().or(fallback_image);
    let thumb = match image_url {
        Some(image) => {
            let (bytes, mime) = preview::download_image(http, image).await?;
            Some(destination.upload_blob(bytes, &mime).await?)
        }
        None => None,
    };

    Ok(ExternalEmbed::new(ExternalCard {
        uri: final_url,
        title: meta.title.unwrap_or_else(|| "Link".to_string()),
        description: meta.description.unwrap_or_default(),
        thumb,
    }))
}

/// Link facets for one chunk of post text.
pub(crate) fn link_facets(text: &str) -> Vec<LinkFacet> {
    extract_link_spans(text, LinkMode::Strict)
        .iter()
        .map(LinkFacet::from_span)
        .collect()
}
