//! The failure taxonomy for downloads, and the mapping from raw transport
//! errors onto it.
use reqwest::StatusCode;
use skystash::err_status_code;
use thiserror::Error;

/// Classification of a download failure.  The kind determines both the HTTP
/// status the server surfaces and whether the operation is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unsafe caller input; surfaced immediately, never retried
    InvalidInput,
    /// The backend reports the object does not exist
    NotFound,
    /// Authentication or permission failure from the backend
    AccessDenied,
    /// Network error, timeout, or a rate/retry-limit signal from the backend
    Transient,
    /// Anything else; the original message is preserved for diagnostics
    Unknown,
}

impl ErrorKind {
    /// Transient failures are the only kind worth retrying.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

/// A download failure: a classified kind plus the underlying error text.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DownloadError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DownloadError {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a raw error and wrap it, preserving its full message chain.
    pub fn classified(err: anyhow::Error) -> Self {
        let kind = classify(&err);
        Self::new(kind, format!("{:#}", err))
    }
}

/// Map a raw transport error onto the taxonomy.  Structured information --
/// the HTTP status of the response, reqwest's timeout/connect flags -- is
/// preferred; matching on message text is the last resort.
pub fn classify(err: &anyhow::Error) -> ErrorKind {
    if let Some(status) = err_status_code(err) {
        return classify_status(status);
    }
    if let Some(reqw) = err.downcast_ref::<reqwest::Error>() {
        if reqw.is_timeout() || reqw.is_connect() || reqw.is_body() || reqw.is_decode() {
            return ErrorKind::Transient;
        }
    }
    if err.downcast_ref::<std::io::Error>().is_some() {
        return ErrorKind::Transient;
    }
    classify_message(&format!("{:#}", err))
}

fn classify_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::AccessDenied,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => ErrorKind::Transient,
        s if s.is_server_error() => ErrorKind::Transient,
        _ => ErrorKind::Unknown,
    }
}

fn classify_message(message: &str) -> ErrorKind {
    let message = message.to_ascii_lowercase();
    if message.contains("not found") {
        return ErrorKind::NotFound;
    }
    for needle in &["permission", "access denied", "unauthorized"] {
        if message.contains(needle) {
            return ErrorKind::AccessDenied;
        }
    }
    for needle in &["network", "timeout", "connection", "retry limit"] {
        if message.contains(needle) {
            return ErrorKind::Transient;
        }
    }
    ErrorKind::Unknown
}
