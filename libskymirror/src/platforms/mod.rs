//! Destination abstraction and implementations
//!
//! The mirror only ever posts to one destination, but the seam keeps the
//! formatting/threading/dedup logic testable without credentials or
//! network access.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{BlobRef, PostDraft, StrongRef};

pub mod bluesky;

// The mock destination is available for all builds so integration tests can
// drive the full mirror pipeline against it.
pub mod mock;

/// A posting backend: an authenticated session exposing "create post
/// record" and "upload binary blob".
#[async_trait]
pub trait Destination: Send + Sync {
    /// Establish the session. Sessions are expected to be created once and
    /// held for the process lifetime; implementations may be rate limited
    /// on repeated logins by the remote service.
    async fn authenticate(&mut self) -> Result<()>;

    /// Create a post record and return its strong reference.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` when no session exists, a
    /// `PlatformError::Validation` for content the destination would
    /// reject, and `PlatformError::Posting`/`Network`/`RateLimit` for
    /// remote failures.
    async fn create_post(&self, draft: &PostDraft) -> Result<StrongRef>;

    /// Upload raw bytes as a blob usable in embeds.
    async fn upload_blob(&self, bytes: Vec<u8>, mime: &str) -> Result<BlobRef>;

    /// Lowercase destination identifier (e.g. "bluesky").
    fn name(&self) -> &str;

    /// Maximum post length in text units, when the destination has one.
    fn character_limit(&self) -> Option<usize>;

    /// Whether a session currently exists.
    fn is_authenticated(&self) -> bool;
}
