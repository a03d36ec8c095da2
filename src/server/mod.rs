//! Read-only HTTP server for archived objects.
//!
//! # Routes
//!
//! | Method     | Path                        | Description                      |
//! |------------|-----------------------------|----------------------------------|
//! | GET, HEAD  | `/{category}/{content_id}`  | Original (`orig`) or thumbnail (`thumb`) |
//! | GET        | `/health`                   | Liveness probe                   |
//!
//! Objects are streamed from disk. A single `Range: bytes=...` request is
//! answered with `206 Partial Content`; every response carries
//! `Accept-Ranges: bytes`. Error bodies are JSON and never include
//! filesystem paths.

mod handlers;
mod range;

pub use handlers::{guess_content_type, http_date};
pub use range::{ByteRange, parse_range};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::store::ContentStore;

/// Shared handler state.
pub(crate) struct AppState {
    pub(crate) store: ContentStore,
}

/// Build the router serving objects from `store`.
pub fn router(store: ContentStore) -> Router {
    let state = Arc::new(AppState { store });
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/{category}/{content_id}",
            get(handlers::get_object).head(handlers::head_object),
        )
        .fallback(fallback)
        .layer(middleware::map_response(accept_ranges))
        .with_state(state)
}

/// Bind a listener on `addr`.
///
/// # Errors
///
/// Returns an IO error if the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::io(format!("bind {addr}"), e))
}

/// Serve `store` on `listener` until `shutdown` completes.
///
/// # Errors
///
/// Returns an IO error if the server fails.
pub async fn serve<F>(listener: TcpListener, store: ContentStore, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, root = %store.root().display(), "Serving archive");
    }
    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::io("serve", e))?;
    info!("Server stopped");
    Ok(())
}

async fn fallback() -> Error {
    Error::malformed("expected /{category}/{content_id}")
}

async fn accept_ranges(mut response: Response<Body>) -> Response<Body> {
    response
        .headers_mut()
        .insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if let Self::RangeNotSatisfiable { length } = self {
            return (
                status,
                [(header::CONTENT_RANGE, format!("bytes */{length}"))],
                Json(json!({ "error": "range not satisfiable" })),
            )
                .into_response();
        }

        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
