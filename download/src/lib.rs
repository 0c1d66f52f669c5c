/*! Resilient download support for the skystash storage backend.

This crate implements the server side of a file download: validating a
caller-supplied object key, choosing between handing the caller a time-boxed
signed URL and proxying the object's bytes, and performing the transfer with
bounded exponential-backoff retry.

The flow is stateless: each request validates a [BlobReference], selects a
[Strategy] once based on credential availability, and runs [fetch] to
completion.  Failures come back as a [DownloadError] carrying one of a small
set of [ErrorKind]s; only [ErrorKind::Transient] failures are ever retried.

## Destinations

A download may be retried, in which case the transfer must have a means to
truncate the data destination and begin writing from the beginning.  This is
accomplished with the [AsyncWriterFactory] trait, which produces a fresh
[tokio::io::AsyncWrite] for each attempt.  [fetch] buffers through an
in-memory [CursorWriterFactory]; [fetch_to_file] spools to a
[tokio::fs::File] instead.

## Testing

The storage backend is reached through the [ObjectStore] trait, so tests can
inject a fake backend and drive the retry machinery against a local HTTP
server.
*/
mod blob;
mod error;
mod factory;
mod fetch;
mod geturl;
mod service;

#[cfg(test)]
mod test_helpers;

pub use blob::BlobReference;
pub use error::{classify, DownloadError, ErrorKind};
pub use factory::{AsyncWriterFactory, CursorWriterFactory, FileWriterFactory};
pub use fetch::{fetch, fetch_to_file, select_strategy, RetrievalOutcome, Strategy};
pub use service::ObjectStore;

