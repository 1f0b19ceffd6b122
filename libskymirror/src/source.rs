//! Source timeline client and item composition
//!
//! The source is a list-timeline REST endpoint authenticated with a static
//! API key header pair. One fetch returns every item currently visible in
//! the list; composition turns each wire item into the text that will be
//! mirrored (which doubles as the dedup key).

use reqwest::Client;
use serde::Deserialize;

use crate::config::SourceConfig;
use crate::error::{Result, SourceError};
use crate::types::{SourceItem, SubItem};

/// Client for the source list-timeline endpoint.
#[derive(Debug, Clone)]
pub struct SourceClient {
    http: Client,
    endpoint: String,
    api_host: String,
    api_key: String,
    list_id: String,
}

impl SourceClient {
    pub fn new(http: Client, config: &SourceConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
            api_host: config.api_host.clone(),
            api_key: config.api_key.clone(),
            list_id: config.list_id.clone(),
        }
    }

    /// Fetch the current timeline and compose every postable item.
    ///
    /// Items without text are dropped here; an absent `timeline` field is
    /// an empty timeline, not an error.
    pub async fn fetch_timeline(&self) -> Result<Vec<SourceItem>> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("list_id", self.list_id.as_str())])
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.api_host)
            .send()
            .await
            .map_err(SourceError::Http)?
            .error_for_status()
            .map_err(SourceError::Http)?;

        let parsed: TimelineResponse = response.json().await.map_err(SourceError::Http)?;
        tracing::debug!(items = parsed.timeline.len(), "fetched source timeline");

        Ok(parsed.timeline.iter().filter_map(compose).collect())
    }
}

// ============================================================================
// Wire models
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineResponse {
    #[serde(default)]
    pub timeline: Vec<TimelineItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineItem {
    pub text: Option<String>,
    pub screen_name: String,
    #[serde(default)]
    pub media: Option<MediaBlock>,
    #[serde(default)]
    pub retweeted_tweet: Option<EmbeddedTweet>,
    #[serde(default)]
    pub quoted: Option<EmbeddedTweet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaBlock {
    #[serde(default)]
    pub photo: Vec<MediaAsset>,
    #[serde(default)]
    pub video: Vec<MediaAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaAsset {
    pub media_url_https: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedTweet {
    pub text: String,
    pub author: TweetAuthor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TweetAuthor {
    pub screen_name: String,
}

/// Compose a wire item into mirror-ready form. `None` when the item has no
/// text to mirror.
pub fn compose(item: &TimelineItem) -> Option<SourceItem> {
    let text = item.text.clone()?;

    let media_url = item.media.as_ref().and_then(|media| {
        media
            .photo
            .first()
            .or_else(|| media.video.first())
            .map(|asset| asset.media_url_https.clone())
    });

    let sub = |embedded: &EmbeddedTweet| SubItem {
        text: embedded.text.clone(),
        author: embedded.author.screen_name.clone(),
    };

    Some(SourceItem {
        text,
        author: item.screen_name.clone(),
        media_url,
        repost: item.retweeted_tweet.as_ref().map(sub),
        quote: item.quoted.as_ref().map(sub),
    })
}
