//! Trait wrapper around the storage client to allow fake injection during
//! tests.
use anyhow::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skystash::StorageClient;
use std::time::Duration;

/// The slice of the storage backend the fetcher needs: capability detection,
/// signed-URL minting, and public object URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether privileged credentials are available for signing URLs.
    fn has_credentials(&self) -> bool;

    /// Mint a time-boxed, read-only URL for `key`, with the response
    /// disposition and content type preset.  Returns the URL and its expiry.
    async fn signed_object_url(
        &self,
        key: &str,
        disposition: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), Error>;

    /// Public media URL for `key`.
    fn object_url(&self, key: &str) -> Result<String, Error>;
}

/// Trivial implementation of the ObjectStore trait for the real client.
#[async_trait]
impl ObjectStore for StorageClient {
    fn has_credentials(&self) -> bool {
        StorageClient::has_credentials(self)
    }

    async fn signed_object_url(
        &self,
        key: &str,
        disposition: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), Error> {
        StorageClient::signed_object_url(self, key, disposition, content_type, ttl)
    }

    fn object_url(&self, key: &str) -> Result<String, Error> {
        StorageClient::object_url(self, key)
    }
}
