use percent_encoding::{utf8_percent_encode, AsciiSet, PercentEncode, NON_ALPHANUMERIC};
use reqwest::StatusCode;

// matches the set left unescaped by JavaScript's encodeURIComponent-style
// encoding used by the web tier, so encoded names decode back unchanged
const NOT_ENCODED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// Percent-encode a string for use in an object URL path segment or a
/// `Content-Disposition` filename.  Everything outside alphanumerics and
/// `_ . - ~` is escaped, including `/`.
pub fn urlencode(input: &str) -> PercentEncode<'_> {
    utf8_percent_encode(input, NOT_ENCODED)
}

/// If this error was due to a reqwest error created from an HTTP response,
/// return the status code from that response.  If the error is not a
/// `reqwest::Error`, or was not caused by an HTTP response, returns None.
pub fn err_status_code(err: &anyhow::Error) -> Option<StatusCode> {
    if let Some(err) = err.downcast_ref::<reqwest::Error>() {
        err.status()
    } else {
        None
    }
}
