use crate::error::{DownloadError, ErrorKind};
use skystash::urlencode;

/// Longest accepted object key, matching the input cap the web tier applies
/// to every string field.
const MAX_OBJECT_KEY_LEN: usize = 5000;

/// Filename used when the caller does not supply one.
const DEFAULT_DISPLAY_NAME: &str = "download";

/// A validated reference to one object in the store: the key addressing it
/// and the filename the eventual download should carry.
///
/// Construction is the only validation point for caller-supplied input: a
/// key containing `..` or beginning with `/` could address objects outside
/// the tenant's namespace and is rejected before it reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobReference {
    object_key: String,
    display_name: String,
}

impl BlobReference {
    /// Validate a caller-supplied storage path and optional filename.  A
    /// missing or empty filename defaults to `"download"`; rejecting it has
    /// no security rationale.  All rejections are [ErrorKind::InvalidInput]
    /// and are never retried.
    pub fn new(storage_path: &str, file_name: Option<&str>) -> Result<Self, DownloadError> {
        if storage_path.is_empty() {
            return Err(DownloadError::new(
                ErrorKind::InvalidInput,
                "storagePath is required",
            ));
        }
        if storage_path.len() > MAX_OBJECT_KEY_LEN {
            return Err(DownloadError::new(
                ErrorKind::InvalidInput,
                "storagePath is too long",
            ));
        }
        if storage_path.contains("..") || storage_path.starts_with('/') {
            return Err(DownloadError::new(
                ErrorKind::InvalidInput,
                "Invalid storagePath",
            ));
        }

        let display_name = match file_name {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => DEFAULT_DISPLAY_NAME.to_owned(),
        };

        Ok(Self {
            object_key: storage_path.to_owned(),
            display_name,
        })
    }

    /// The key addressing the object within the bucket.
    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    /// The filename the download should be saved as.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The `Content-Disposition` header value for this download.  The
    /// filename is percent-encoded so that spaces, quotes and non-ASCII
    /// characters survive the trip through the header and decode back to the
    /// original string.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", urlencode(&self.display_name))
    }
}
