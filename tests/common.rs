//! Shared helpers for integration tests.
//!
//! Included from each test file with `#[path = "common.rs"] mod common;`.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use bytes::Bytes;
use http_body_util::BodyExt;
use mediavault::server;
use mediavault::store::{Category, ContentStore};
use tempfile::TempDir;
use tower::ServiceExt;

/// A content id as the pipeline would generate it.
pub const VIDEO_ID: &str = "0f3a9c2b7d4e4f1a8b6c5d4e3f2a1b0c.mp4";

/// Deterministic, non-repeating-looking test content.
pub fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

/// A throwaway archive directory with an object store.
pub struct TestArchive {
    pub dir: TempDir,
    pub store: ContentStore,
}

impl TestArchive {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = ContentStore::open(dir.path()).expect("Failed to open store");
        Self { dir, store }
    }

    /// Store `data` and return it for later comparison.
    pub fn put(&self, category: Category, id: &str, data: Vec<u8>) -> Vec<u8> {
        self.store
            .put(category, id, &data)
            .expect("Failed to store object");
        data
    }

    pub fn router(&self) -> Router {
        server::router(self.store.clone())
    }
}

/// Collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub fn request(method: Method, uri: &str, range: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(range) = range {
        builder = builder.header(header::RANGE, range);
    }
    builder.body(Body::empty()).expect("Failed to build request")
}

/// Send one request through `router` and collect the full body.
pub async fn send(router: Router, req: Request<Body>) -> TestResponse {
    let response = router.oneshot(req).await.expect("Router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(router: Router, uri: &str, range: Option<&str>) -> TestResponse {
    send(router, request(Method::GET, uri, range)).await
}

pub async fn head(router: Router, uri: &str, range: Option<&str>) -> TestResponse {
    send(router, request(Method::HEAD, uri, range)).await
}
