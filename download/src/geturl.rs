use crate::error::{DownloadError, ErrorKind};
use crate::factory::AsyncWriterFactory;
use futures_util::stream::StreamExt;
use reqwest::header;
use std::time::Duration;
use tokio::io::copy;
use tokio_util::io::StreamReader;

/// Content type reported when the backend does not supply one.
pub(crate) const OCTET_STREAM: &str = "application/octet-stream";

// Connecting should be quick; a connected transfer of a large object may
// legitimately take minutes.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Metadata the backend reported for a fetched object.
#[derive(Debug, Clone)]
pub(crate) struct ObjectMeta {
    pub(crate) content_type: String,
    pub(crate) content_length: Option<u64>,
}

/// Build the HTTP client used for byte transfers, with per-attempt timeouts.
pub(crate) fn http_client() -> Result<reqwest::Client, DownloadError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(ATTEMPT_TIMEOUT)
        .build()
        .map_err(|e| DownloadError::classified(e.into()))
}

/// Fetch `url` once, streaming the body into a fresh writer from the
/// factory.  Errors come back already classified; the retry decision belongs
/// to the caller.
pub(crate) async fn get_url<AWF: AsyncWriterFactory>(
    client: &reqwest::Client,
    url: &str,
    writer_factory: &mut AWF,
) -> Result<ObjectMeta, DownloadError> {
    let res = match client
        .get(url)
        .send()
        .await
        .and_then(|res| res.error_for_status())
    {
        Ok(res) => res,
        Err(err) => return Err(DownloadError::classified(err.into())),
    };

    // capture the metadata before moving `res`
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .unwrap_or(OCTET_STREAM)
        .to_owned();
    let content_length = res.content_length();

    let stream = res
        .bytes_stream()
        // convert the Result::Err type to std::io::Error
        .map(|r| r.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)));
    let mut reader = StreamReader::new(stream);

    let mut writer = match writer_factory.get_writer().await {
        Ok(w) => w,
        // a broken destination will not heal on retry
        Err(e) => return Err(DownloadError::new(ErrorKind::Unknown, format!("{:#}", e))),
    };

    match copy(&mut reader, &mut writer).await {
        Ok(_) => {}
        // losing the stream mid-body is the classic retriable failure
        Err(e) => return Err(DownloadError::new(ErrorKind::Transient, e.to_string())),
    };

    Ok(ObjectMeta {
        content_type,
        content_length,
    })
}
