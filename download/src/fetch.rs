use crate::blob::BlobReference;
use crate::error::{classify, DownloadError, ErrorKind};
use crate::factory::{AsyncWriterFactory, CursorWriterFactory, FileWriterFactory};
use crate::geturl::{get_url, http_client, ObjectMeta, OCTET_STREAM};
use crate::service::ObjectStore;
use chrono::{DateTime, Utc};
use skystash::retry::{Backoff, Retry};
use std::time::Duration;
use tokio::fs::File;

/// How long a minted signed URL stays valid.
const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// How the object's bytes will reach the caller.  This is a capability-based
/// choice made once per request: it depends only on whether privileged
/// credentials are available, and never changes mid-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Mint a signed URL addressed directly at the client, avoiding proxying
    /// potentially large payloads through this process
    SignedUrl,
    /// Fetch the bytes here and stream them back inline
    ProxyFetch,
}

pub fn select_strategy(has_credentials: bool) -> Strategy {
    if has_credentials {
        Strategy::SignedUrl
    } else {
        Strategy::ProxyFetch
    }
}

/// The successful result of a fetch.
#[derive(Debug)]
pub enum RetrievalOutcome {
    /// The caller should fetch the bytes itself from `url`, before it
    /// expires
    Redirect {
        url: String,
        expires_at: DateTime<Utc>,
    },
    /// The bytes were proxied through this process.  `length` is the exact
    /// byte count of `data`
    Bytes {
        content_type: String,
        length: u64,
        data: Vec<u8>,
    },
}

/// Fetch the referenced object, retrying transient failures with exponential
/// backoff up to the retry budget.  Not-found and access-denied conditions
/// surface immediately; a mint failure that is neither degrades to the proxy
/// strategy rather than failing the request.
pub async fn fetch<S: ObjectStore + ?Sized>(
    blob: &BlobReference,
    retry: &Retry,
    store: &S,
) -> Result<RetrievalOutcome, DownloadError> {
    if let Strategy::SignedUrl = select_strategy(store.has_credentials()) {
        match mint_signed_url(blob, retry, store).await {
            Ok((url, expires_at)) => return Ok(RetrievalOutcome::Redirect { url, expires_at }),
            Err(err) if matches!(err.kind, ErrorKind::NotFound | ErrorKind::AccessDenied) => {
                return Err(err)
            }
            // a credential or signing problem; the public endpoint may
            // still serve the object
            Err(_) => {}
        }
    }

    let mut factory = CursorWriterFactory::new();
    let meta = proxy_fetch(blob, retry, store, &mut factory).await?;
    let data = factory.into_inner();
    Ok(RetrievalOutcome::Bytes {
        content_type: meta.content_type,
        length: data.len() as u64,
        data,
    })
}

/// Proxy-fetch the object into the given File instead of memory.  The file
/// must be open in write mode and clone-able (see [FileWriterFactory]).
/// Returns the file and the object's content type.
pub async fn fetch_to_file<S: ObjectStore + ?Sized>(
    blob: &BlobReference,
    retry: &Retry,
    store: &S,
    file: File,
) -> Result<(File, String), DownloadError> {
    let mut factory = FileWriterFactory::new(file);
    let meta = proxy_fetch(blob, retry, store, &mut factory).await?;
    let file = factory
        .into_inner()
        .await
        .map_err(|e| DownloadError::new(ErrorKind::Unknown, format!("{:#}", e)))?;
    Ok((file, meta.content_type))
}

async fn mint_signed_url<S: ObjectStore + ?Sized>(
    blob: &BlobReference,
    retry: &Retry,
    store: &S,
) -> Result<(String, DateTime<Utc>), DownloadError> {
    let disposition = blob.content_disposition();
    let mut backoff = Backoff::new(retry);
    let mut attempts = 0;

    loop {
        attempts += 1;
        let err = match store
            .signed_object_url(blob.object_key(), &disposition, OCTET_STREAM, SIGNED_URL_TTL)
            .await
        {
            Ok(minted) => return Ok(minted),
            Err(err) => err,
        };

        let kind = classify(&err);
        if !kind.is_transient() {
            return Err(DownloadError::new(kind, format!("{:#}", err)));
        }
        match backoff.next_backoff() {
            Some(duration) => tokio::time::sleep(duration).await,
            None => {
                return Err(DownloadError::new(
                    kind,
                    format!("Signing failed after {} attempts: {:#}", attempts, err),
                ))
            }
        }
    }
}

async fn proxy_fetch<S: ObjectStore + ?Sized, AWF: AsyncWriterFactory>(
    blob: &BlobReference,
    retry: &Retry,
    store: &S,
    writer_factory: &mut AWF,
) -> Result<ObjectMeta, DownloadError> {
    let url = store
        .object_url(blob.object_key())
        .map_err(|e| DownloadError::new(classify(&e), format!("{:#}", e)))?;
    let client = http_client()?;

    let mut backoff = Backoff::new(retry);
    let mut attempts = 0;

    loop {
        attempts += 1;
        let err = match get_url(&client, &url, writer_factory).await {
            Ok(meta) => return Ok(meta),
            Err(err) => err,
        };

        if !err.kind.is_transient() {
            return Err(err);
        }
        match backoff.next_backoff() {
            Some(duration) => tokio::time::sleep(duration).await,
            None => {
                return Err(DownloadError::new(
                    err.kind,
                    format!("Download failed after {} attempts: {}", attempts, err),
                ))
            }
        }
    }
}
