//! Mock destination for tests
//!
//! Records every draft and upload so tests can assert on exactly what
//! would have been posted, and can be configured to fail either
//! operation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{PlatformError, Result};
use crate::platforms::Destination;
use crate::types::{BlobRef, CidLink, PostDraft, StrongRef};

/// One recorded blob upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub size: usize,
    pub mime: String,
}

#[derive(Debug, Clone, Default)]
pub struct MockDestination {
    name: String,
    authenticated: bool,
    post_error: Option<String>,
    upload_error: Option<String>,
    drafts: Arc<Mutex<Vec<PostDraft>>>,
    uploads: Arc<Mutex<Vec<UploadRecord>>>,
}

impl MockDestination {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// A mock with an already-established session, for tests that start
    /// past the login step.
    pub fn logged_in(name: &str) -> Self {
        Self {
            name: name.to_string(),
            authenticated: true,
            ..Default::default()
        }
    }

    /// Fail every `create_post` with a Posting error.
    pub fn failing_posts(name: &str, error: &str) -> Self {
        Self {
            name: name.to_string(),
            authenticated: true,
            post_error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// Fail every `upload_blob` with a Posting error.
    pub fn failing_uploads(name: &str, error: &str) -> Self {
        Self {
            name: name.to_string(),
            authenticated: true,
            upload_error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// Every draft posted so far, in posting order.
    pub fn posted_drafts(&self) -> Vec<PostDraft> {
        self.drafts.lock().unwrap().clone()
    }

    /// Every blob uploaded so far.
    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Destination for MockDestination {
    async fn authenticate(&mut self) -> Result<()> {
        self.authenticated = true;
        Ok(())
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<StrongRef> {
        if !self.authenticated {
            return Err(PlatformError::Authentication("Not authenticated".to_string()).into());
        }
        if let Some(error) = &self.post_error {
            return Err(PlatformError::Posting(error.clone()).into());
        }

        let mut drafts = self.drafts.lock().unwrap();
        drafts.push(draft.clone());

        let rkey = uuid::Uuid::new_v4().simple().to_string();
        Ok(StrongRef {
            uri: format!("at://did:plc:{}/app.bsky.feed.post/{}", self.name, rkey),
            cid: format!("bafy{}", rkey),
        })
    }

    async fn upload_blob(&self, bytes: Vec<u8>, mime: &str) -> Result<BlobRef> {
        if !self.authenticated {
            return Err(PlatformError::Authentication("Not authenticated".to_string()).into());
        }
        if let Some(error) = &self.upload_error {
            return Err(PlatformError::Posting(error.clone()).into());
        }

        self.uploads.lock().unwrap().push(UploadRecord {
            size: bytes.len(),
            mime: mime.to_string(),
        });

        Ok(BlobRef {
            kind: "blob".to_string(),
            link: CidLink {
                link: format!("bafyblob{}", uuid::Uuid::new_v4().simple()),
            },
            mime_type: mime.to_string(),
            size: bytes.len() as u64,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn character_limit(&self) -> Option<usize> {
        Some(crate::richtext::MAX_POST_UNITS)
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
