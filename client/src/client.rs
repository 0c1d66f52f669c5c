use crate::retry::Retry;
use crate::util::urlencode;
use crate::Credentials;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use hmac_sha256::HMAC;
use std::time::Duration;

/// StorageClientBuilder implements the builder pattern for building a
/// [StorageClient], allowing optional configuration of credentials, retry
/// and timeouts.
#[derive(Default, Debug, Clone)]
pub struct StorageClientBuilder {
    base_url: String,
    bucket: String,
    credentials: Option<Credentials>,
    retry: Retry,
    timeout: Duration,
}

impl StorageClientBuilder {
    /// Create a new StorageClientBuilder.  The storage backend's base URL is
    /// required and so must always be specified.
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            ..Self::default()
        }
    }

    /// Set the bucket addressed by this client.  Required.
    pub fn bucket<S: Into<String>>(mut self, bucket: S) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Add privileged credentials to the client, enabling signed URLs.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the retry configuration for the client.
    pub fn retry(mut self, retry: Retry) -> Self {
        self.retry = retry;
        self
    }

    /// Set the timeout for each HTTP request made by the client.  The default
    /// is 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the resulting client, consuming the builder
    pub fn build(self) -> Result<StorageClient> {
        StorageClient::new(self)
    }
}

/// StorageClient addresses objects within one bucket of the storage backend.
/// It is fully constructed up front and immutable afterwards, so it can be
/// shared freely between concurrent requests.
pub struct StorageClient {
    /// Credentials used to sign URLs, if any
    credentials: Option<Credentials>,

    /// Retry configuration handed to download helpers
    retry: Retry,

    /// Precomputed `<base>/v1/b/<bucket>/` URL
    bucket_url: reqwest::Url,

    /// Reqwest client
    client: reqwest::Client,
}

impl StorageClient {
    /// Create a new client (public interface is via
    /// [`StorageClientBuilder::build`])
    fn new(b: StorageClientBuilder) -> Result<StorageClient> {
        // Pre-compute as much as possible here, so that later URL-generation
        // operations are fast.  Once created, a StorageClient is immutable.
        if b.bucket.is_empty() {
            bail!("A storage bucket is required");
        }

        let mut base_url = b.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = reqwest::Url::parse(&base_url)
            .context(format!("while parsing {}", base_url))?;

        let bucket_url = base_url
            .join(&format!("v1/b/{}/", urlencode(&b.bucket)))
            .context("while building the bucket URL")?;

        let client = reqwest::Client::builder().timeout(b.timeout).build()?;

        Ok(StorageClient {
            credentials: b.credentials,
            retry: b.retry,
            bucket_url,
            client,
        })
    }

    /// Whether this client holds privileged credentials and can mint signed
    /// URLs.
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// The retry configuration this client was built with.
    pub fn retry(&self) -> &Retry {
        &self.retry
    }

    /// Public media URL for the given object key: the unauthenticated REST
    /// endpoint serving the object's bytes.  The key must not begin with `/`.
    pub fn object_url(&self, key: &str) -> Result<String> {
        let mut url = self.object_base(key)?;
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url.as_str().to_owned())
    }

    /// Mint a time-boxed, read-only signed URL for the given object key.  The
    /// URL carries the response disposition and content type as query
    /// parameters so the eventual client-side fetch downloads with the right
    /// filename.  Returns the URL and its expiry time.
    ///
    /// Fails if the client was built without credentials.
    pub fn signed_object_url(
        &self,
        key: &str,
        disposition: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>)> {
        let creds = if let Some(ref creds) = self.credentials {
            creds
        } else {
            return Err(anyhow!("Cannot sign a URL without credentials"));
        };

        let mut url = self.object_base(key)?;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).context("signed URL ttl out of range")?;
        let expires = expires_at.timestamp();

        // the signature covers the method, the exact object path, the expiry
        // and the response headers the store will set
        let string_to_sign = format!(
            "GET\n{}\n{}\n{}\n{}",
            url.path(),
            expires,
            disposition,
            content_type
        );
        let mut hash = HMAC::new(creds.secret_key.as_bytes());
        hash.update(string_to_sign.as_bytes());
        let signature = base64::encode_config(hash.finalize(), base64::URL_SAFE_NO_PAD);

        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("expires", &expires.to_string())
            .append_pair("signedBy", &creds.client_email)
            .append_pair("response-content-disposition", disposition)
            .append_pair("response-content-type", content_type)
            .append_pair("signature", &signature);

        Ok((url.as_str().to_owned(), expires_at))
    }

    /// Fetch the object's bytes from the public media endpoint, as a single
    /// attempt with this client's timeout.  Retry policy belongs to the
    /// caller; see the `skystash-download` crate.
    pub async fn get_object(&self, key: &str) -> Result<reqwest::Response> {
        let url = self.object_url(key)?;
        let res = self.client.get(&url).send().await?;
        Ok(res.error_for_status()?)
    }

    fn object_base(&self, key: &str) -> Result<reqwest::Url> {
        if key.starts_with('/') {
            bail!("Object key must not begin with `/`");
        }
        Ok(self.bucket_url.join(&format!("o/{}", urlencode(key)))?)
    }
}
