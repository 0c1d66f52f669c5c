/*! Client library for the skystash storage backend.

This crate provides the pieces a server process needs to address objects in
the hosted object store:

* [Credentials] -- service-account style credentials, typically read from the
  process environment;
* [StorageClient] -- an immutable, explicitly-constructed client that can
  build public object URLs, mint time-boxed signed URLs, and fetch object
  bytes; and
* [retry] -- retry configuration shared with the `skystash-download` crate.

A client is built once at startup and then shared freely between concurrent
requests; nothing in it is mutated after construction.
*/
mod client;
mod credentials;
pub mod retry;
mod util;

pub use client::{StorageClient, StorageClientBuilder};
pub use credentials::Credentials;
pub use retry::Retry;
pub use util::{err_status_code, urlencode};
