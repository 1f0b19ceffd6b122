//! Bluesky destination over the XRPC HTTP surface
//!
//! Three procedures cover everything the mirror needs:
//! `com.atproto.server.createSession`, `com.atproto.repo.createRecord`
//! (with `app.bsky.feed.post` records) and `com.atproto.repo.uploadBlob`.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::BlueskyConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::Destination;
use crate::richtext::{unit_len, MAX_POST_UNITS};
use crate::types::{BlobRef, ExternalEmbed, LinkFacet, PostDraft, ReplyRef, StrongRef};

/// Classify an XRPC error response into a PlatformError.
///
/// AT Protocol errors carry a machine-readable `error` name in the JSON
/// body ("InvalidRequest", "ExpiredToken", ...); the classifier matches on
/// those names plus the HTTP status so the caller can tell an expired
/// session from a rejected record.
fn classify_xrpc_error(status: StatusCode, body: &str, context: &str) -> PlatformError {
    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || body.contains("AuthenticationRequired")
        || body.contains("InvalidToken")
        || body.contains("ExpiredToken")
        || body.contains("AccountNotFound")
    {
        return PlatformError::Authentication(format!(
            "Bluesky authentication failed during {}: {} {}",
            context, status, body
        ));
    }

    if status == StatusCode::BAD_REQUEST
        || body.contains("InvalidRequest")
        || body.contains("InvalidRecord")
    {
        return PlatformError::Validation(format!(
            "Bluesky rejected the request during {}: {} {}",
            context, status, body
        ));
    }

    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RateLimitExceeded") {
        return PlatformError::RateLimit(format!(
            "Bluesky rate limit exceeded during {}: {} {}",
            context, status, body
        ));
    }

    PlatformError::Posting(format!(
        "Bluesky operation failed during {}: {} {}",
        context, status, body
    ))
}

/// Map a transport-level failure to a PlatformError.
fn transport_error(error: reqwest::Error, context: &str) -> PlatformError {
    PlatformError::Network(format!(
        "Network error while reaching the Bluesky PDS during {}: {}",
        context, error
    ))
}

#[derive(Debug, Clone, Deserialize)]
struct Session {
    did: String,
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    handle: String,
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'static str,
    record: FeedPostRecord,
}

#[derive(Debug, Serialize)]
struct FeedPostRecord {
    #[serde(rename = "$type")]
    kind: &'static str,
    text: String,
    #[serde(rename = "createdAt")]
    created_at: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    facets: Vec<LinkFacet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    embed: Option<ExternalEmbed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ReplyRef>,
}

#[derive(Debug, Deserialize)]
struct UploadBlobResponse {
    blob: BlobRef,
}

pub struct BlueskyClient {
    http: Client,
    service: String,
    handle: String,
    app_password: String,
    session: Option<Session>,
}

impl BlueskyClient {
    pub fn new(http: Client, config: &BlueskyConfig) -> Self {
        Self {
            http,
            service: config.service.trim_end_matches('/').to_string(),
            handle: config.handle.clone(),
            app_password: config.app_password.clone(),
            session: None,
        }
    }

    fn xrpc(&self, procedure: &str) -> String {
        format!("{}/xrpc/{}", self.service, procedure)
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| PlatformError::Authentication("Not authenticated".to_string()).into())
    }

    async fn create_session(&mut self) -> Result<()> {
        tracing::debug!(handle = %self.handle, "creating Bluesky session");

        let response = self
            .http
            .post(self.xrpc("com.atproto.server.createSession"))
            .json(&SessionRequest {
                identifier: &self.handle,
                password: &self.app_password,
            })
            .send()
            .await
            .map_err(|e| transport_error(e, "authentication"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_xrpc_error(status, &body, "authentication").into());
        }

        let session: Session = response
            .json()
            .await
            .map_err(|e| transport_error(e, "authentication"))?;
        tracing::info!(handle = %session.handle, did = %session.did, "Bluesky session created");
        self.session = Some(session);

        Ok(())
    }
}

#[async_trait]
impl Destination for BlueskyClient {
    async fn authenticate(&mut self) -> Result<()> {
        self.create_session().await
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<StrongRef> {
        let session = self.session()?;

        let units = unit_len(&draft.text);
        if units > MAX_POST_UNITS {
            return Err(PlatformError::Validation(format!(
                "Post exceeds the {} unit limit (current: {} units)",
                MAX_POST_UNITS, units
            ))
            .into());
        }

        let request = CreateRecordRequest {
            repo: &session.did,
            collection: "app.bsky.feed.post",
            record: FeedPostRecord {
                kind: "app.bsky.feed.post",
                text: draft.text.clone(),
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                facets: draft.facets.clone(),
                embed: draft.embed.clone(),
                reply: draft.reply.clone(),
            },
        };

        let response = self
            .http
            .post(self.xrpc("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, "posting"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_xrpc_error(status, &body, "posting").into());
        }

        let created: StrongRef = response
            .json()
            .await
            .map_err(|e| transport_error(e, "posting"))?;
        tracing::debug!(uri = %created.uri, "created post record");

        Ok(created)
    }

    async fn upload_blob(&self, bytes: Vec<u8>, mime: &str) -> Result<BlobRef> {
        let session = self.session()?;

        tracing::debug!(size = bytes.len(), mime, "uploading blob");

        let response = self
            .http
            .post(self.xrpc("com.atproto.repo.uploadBlob"))
            .bearer_auth(&session.access_jwt)
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(bytes)
            .send()
            .await
            .map_err(|e| transport_error(e, "blob upload"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_xrpc_error(status, &body, "blob upload").into());
        }

        let uploaded: UploadBlobResponse = response
            .json()
            .await
            .map_err(|e| transport_error(e, "blob upload"))?;

        Ok(uploaded.blob)
    }

    fn name(&self) -> &str {
        "bluesky"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(MAX_POST_UNITS)
    }

    fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}
