//! Thread posting: root plus chained replies for overage text
//!
//! No maximum chain length is enforced; an arbitrarily long source text
//! produces an arbitrarily long reply chain.

use crate::error::Result;
use crate::platforms::Destination;
use crate::richtext::{split_at_boundary, MAX_POST_UNITS};
use crate::service::formatter::link_facets;
use crate::types::{PostDraft, ReplyRef, StrongRef, ThreadReceipt};

/// Post the root draft, then the overage as chained replies.
///
/// Every reply's `root` is the original root; its `parent` is the
/// immediately preceding post. Links are re-extracted per chunk so reply
/// facets index into their own text.
pub async fn post_thread<D: Destination>(
    destination: &D,
    root_draft: PostDraft,
    mut overage: String,
) -> Result<ThreadReceipt> {
    let root = destination.create_post(&root_draft).await?;
    tracing::debug!(uri = %root.uri, "posted thread root");

    let mut parent: StrongRef = root.clone();
    let mut replies = Vec::new();

    while !overage.trim().is_empty() {
        let (chunk, rest) = split_at_boundary(&overage, MAX_POST_UNITS);
        if chunk.is_empty() {
            overage = rest;
            continue;
        }

        let facets = link_facets(&chunk);
        let draft = PostDraft {
            text: chunk,
            facets,
            embed: None,
            reply: Some(ReplyRef {
                root: root.clone(),
                parent: parent.clone(),
            }),
        };

        parent = destination.create_post(&draft).await?;
        replies.push(parent.clone());
        overage = rest;
    }

    Ok(ThreadReceipt { root, replies })
}
