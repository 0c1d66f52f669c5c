//! Utilities for testing downloads
use crate::service::ObjectStore;
use anyhow::{anyhow, Error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use httptest::{matchers::*, responders::*, Expectation};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BODY: &[u8] = b"hello, world";

/// Event logger, used to log backend calls from the fakes and then assert on
/// them.
#[derive(Default, Clone)]
pub(crate) struct Logger {
    logged: Arc<Mutex<Vec<String>>>,
}

impl Logger {
    pub(crate) fn log<S: Into<String>>(&self, message: S) {
        self.logged.lock().unwrap().push(message.into())
    }

    pub(crate) fn assert(&self, expected: Vec<String>) {
        assert_eq!(*self.logged.lock().unwrap(), expected);
    }
}

/// Fake implementation of the storage backend.  `signed_url` and
/// `object_url` are `None` when the corresponding call is not expected.
pub(crate) struct FakeStore {
    pub(crate) logger: Logger,
    pub(crate) credentials: bool,
    /// `Ok(url)` mints successfully; `Err(message)` fails the mint
    pub(crate) signed_url: Option<Result<String, String>>,
    pub(crate) object_url: Option<String>,
}

#[async_trait]
impl ObjectStore for FakeStore {
    fn has_credentials(&self) -> bool {
        self.credentials
    }

    async fn signed_object_url(
        &self,
        key: &str,
        disposition: &str,
        _content_type: &str,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), Error> {
        self.logger
            .log(format!("signedObjectUrl {} {}", key, disposition));
        match self
            .signed_url
            .clone()
            .expect("unexpected signedObjectUrl call")
        {
            Ok(url) => Ok((url, Utc::now() + chrono::Duration::from_std(ttl)?)),
            Err(message) => Err(anyhow!(message)),
        }
    }

    fn object_url(&self, key: &str) -> Result<String, Error> {
        self.logger.log(format!("objectUrl {}", key));
        Ok(self
            .object_url
            .clone()
            .expect("unexpected objectUrl call"))
    }
}

/// A fake server of data blobs (like the storage backend's media endpoint,
/// without trying to emulate it).  Serves b"hello, world" at `/data`,
/// answering with the given status sequence, and verifies on drop that
/// exactly that many requests arrived.
pub(crate) struct FakeDataServer {
    server: httptest::Server,
}

impl FakeDataServer {
    pub(crate) fn new(responses: &[u16]) -> Self {
        let server = httptest::Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/data"))
                .times(responses.len())
                .respond_with(cycle(
                    responses
                        .iter()
                        .map(|response| {
                            let responder: Box<dyn Responder> = Box::new(if *response == 200 {
                                status_code(200)
                                    .append_header("Content-Type", "text/plain")
                                    .body(BODY)
                            } else {
                                status_code(*response).body(&b""[..])
                            });
                            responder
                        })
                        .collect(),
                )),
        );
        Self { server }
    }

    pub(crate) fn data_url(&self) -> String {
        self.server.url_str("/data")
    }
}
