//! HTTP surface for skystash downloads.
//!
//! Exposes the download proxy endpoint (`POST /api/download`, with
//! `/api/files/download` as an alias) plus a ping endpoint.  The storage
//! backend is reached through the [ObjectStore] trait so tests can inject a
//! fake; the real binary wires in a [skystash::StorageClient].
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use skystash::Retry;
use skystash_download::{fetch, BlobReference, ErrorKind, ObjectStore, RetrievalOutcome};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Request bodies are tiny JSON documents; anything larger is abuse.
const MAX_BODY_BYTES: usize = 10 * 1024;

/// Shared state for all request handlers.  The store handle is read-only
/// after startup and safely shared between concurrent requests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub retry: Retry,
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::OPTIONS,
            Method::PATCH,
            Method::DELETE,
            Method::POST,
            Method::PUT,
        ])
        .allow_headers([
            HeaderName::from_static("x-csrf-token"),
            HeaderName::from_static("x-requested-with"),
            header::ACCEPT,
            HeaderName::from_static("accept-version"),
            header::CONTENT_LENGTH,
            HeaderName::from_static("content-md5"),
            header::CONTENT_TYPE,
            header::DATE,
            HeaderName::from_static("x-api-version"),
        ]);

    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/download", post(download))
        .route("/api/files/download", post(download))
        .fallback(api_not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadRequest {
    storage_path: String,
    file_name: Option<String>,
}

async fn download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            log::debug!("rejected request body: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, "storagePath is required");
        }
    };

    let blob = match BlobReference::new(&req.storage_path, req.file_name.as_deref()) {
        Ok(blob) => blob,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.message),
    };

    match fetch(&blob, &state.retry, state.store.as_ref()).await {
        Ok(RetrievalOutcome::Redirect { url, .. }) => {
            (StatusCode::OK, Json(json!({ "signedUrl": url }))).into_response()
        }
        Ok(RetrievalOutcome::Bytes {
            content_type,
            length,
            data,
        }) => {
            let mut response = Response::new(Body::from(data));
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_str(&content_type)
                    .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
            );
            headers.insert(
                header::CONTENT_DISPOSITION,
                HeaderValue::from_str(&blob.content_disposition())
                    .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
            );
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-store, must-revalidate"),
            );
            response
        }
        Err(err) => {
            log::warn!(
                "download of {:?} failed: {} ({:?})",
                blob.object_key(),
                err,
                err.kind
            );
            error_response(status_for(err.kind), &err.message)
        }
    }
}

async fn ping() -> Json<serde_json::Value> {
    let message = std::env::var("SKYSTASH_PING_MESSAGE").unwrap_or_else(|_| "pong".into());
    Json(json!({ "message": message }))
}

async fn api_not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "API endpoint not found")
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AccessDenied => StatusCode::FORBIDDEN,
        ErrorKind::Transient => StatusCode::BAD_GATEWAY,
        ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::{anyhow, Error};
    use async_trait::async_trait;
    use axum::http::Request;
    use chrono::{DateTime, Utc};
    use http_body_util::BodyExt;
    use httptest::{matchers::*, responders::*, Expectation, Server};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    /// Fake storage backend counting how often it is addressed.
    struct FakeStore {
        credentials: bool,
        signed_url: Option<String>,
        object_url: Option<String>,
        calls: AtomicUsize,
    }

    impl FakeStore {
        fn with_signing(url: &str) -> Arc<Self> {
            Arc::new(Self {
                credentials: true,
                signed_url: Some(url.to_owned()),
                object_url: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn proxy_only(url: &str) -> Arc<Self> {
            Arc::new(Self {
                credentials: false,
                signed_url: None,
                object_url: Some(url.to_owned()),
                calls: AtomicUsize::new(0),
            })
        }

        fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                credentials: false,
                signed_url: None,
                object_url: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        fn has_credentials(&self) -> bool {
            self.credentials
        }

        async fn signed_object_url(
            &self,
            _key: &str,
            _disposition: &str,
            _content_type: &str,
            ttl: Duration,
        ) -> Result<(String, DateTime<Utc>), Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.signed_url {
                Some(url) => Ok((url.clone(), Utc::now() + chrono::Duration::from_std(ttl)?)),
                None => Err(anyhow!("unexpected signedObjectUrl call")),
            }
        }

        fn object_url(&self, _key: &str) -> Result<String, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.object_url {
                Some(url) => Ok(url.clone()),
                None => Err(anyhow!("unexpected objectUrl call")),
            }
        }
    }

    fn test_app(store: Arc<FakeStore>) -> Router {
        let store: Arc<dyn ObjectStore> = store;
        app(AppState {
            store,
            retry: Retry {
                retries: 1,
                delay_factor: Duration::from_millis(1),
                ..Retry::default()
            },
        })
    }

    async fn post_json(
        app: Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body.to_vec())
    }

    fn error_message(body: &[u8]) -> String {
        let v: serde_json::Value = serde_json::from_slice(body).unwrap();
        v["error"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn ping_responds() {
        let response = test_app(FakeStore::unreachable())
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/ping")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn traversal_paths_rejected_without_backend_call() {
        let store = FakeStore::unreachable();
        for path in &["../other/secret", "/etc/passwd", ""] {
            let (status, _, body) = post_json(
                test_app(store.clone()),
                "/api/download",
                json!({ "storagePath": path, "fileName": "a.txt" }),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "path {:?}", path);
            assert!(!error_message(&body).is_empty());
        }
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn missing_storage_path_rejected() {
        let store = FakeStore::unreachable();
        let (status, _, body) = post_json(
            test_app(store.clone()),
            "/api/download",
            json!({ "fileName": "a.txt" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(&body), "storagePath is required");
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn signed_url_download_returns_json() {
        let store = FakeStore::with_signing("https://store.example/signed?sig=abc");
        let (status, headers, body) = post_json(
            test_app(store.clone()),
            "/api/download",
            json!({ "storagePath": "users/u1/report.pdf", "fileName": "report.pdf" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers[header::CONTENT_TYPE].to_str().unwrap(),
            "application/json"
        );
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["signedUrl"], "https://store.example/signed?sig=abc");
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn proxy_download_streams_bytes_with_headers() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/data")).respond_with(
                status_code(200)
                    .append_header("Content-Type", "text/plain")
                    .body("hello, world"),
            ),
        );

        let store = FakeStore::proxy_only(&server.url_str("/data"));
        let (status, headers, body) = post_json(
            test_app(store),
            "/api/download",
            json!({ "storagePath": "users/u1/hello.txt", "fileName": "hello world.txt" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body, b"hello, world");
        assert_eq!(headers[header::CONTENT_TYPE].to_str().unwrap(), "text/plain");
        assert_eq!(headers[header::CONTENT_LENGTH].to_str().unwrap(), "12");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION].to_str().unwrap(),
            "attachment; filename=\"hello%20world.txt\""
        );
        assert_eq!(
            headers[header::CACHE_CONTROL].to_str().unwrap(),
            "no-cache, no-store, must-revalidate"
        );
    }

    #[tokio::test]
    async fn files_download_alias_works() {
        let store = FakeStore::with_signing("https://store.example/signed");
        let (status, _, body) = post_json(
            test_app(store),
            "/api/files/download",
            json!({ "storagePath": "users/u1/a.bin" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["signedUrl"], "https://store.example/signed");
    }

    #[tokio::test]
    async fn missing_object_maps_to_404() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/data"))
                .times(1)
                .respond_with(status_code(404)),
        );

        let store = FakeStore::proxy_only(&server.url_str("/data"));
        let (status, _, body) = post_json(
            test_app(store),
            "/api/download",
            json!({ "storagePath": "users/u1/missing.bin" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!error_message(&body).is_empty());
    }

    #[tokio::test]
    async fn transient_exhaustion_maps_to_502() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/data"))
                .times(2) // initial attempt + 1 retry
                .respond_with(status_code(503)),
        );

        let store = FakeStore::proxy_only(&server.url_str("/data"));
        let (status, _, body) = post_json(
            test_app(store),
            "/api/download",
            json!({ "storagePath": "users/u1/flaky.bin" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!error_message(&body).is_empty());
    }

    #[tokio::test]
    async fn unknown_api_route_is_json_404() {
        let response = test_app(FakeStore::unreachable())
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(error_message(&body), "API endpoint not found");
    }
}
