//! Object and health handlers.

use std::borrow::Cow;
use std::io::SeekFrom;
use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::SystemTime;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{self, HeaderMap};
use axum::http::{Response, StatusCode};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::AppState;
use super::range::parse_range;
use crate::error::{Error, Result};
use crate::store::{Category, validate_content_id};

/// GET /health
pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /{category}/{content_id} - Stream an object, honouring `Range`.
pub(crate) async fn get_object(
    State(state): State<Arc<AppState>>,
    Path((category, content_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response<Body>> {
    serve_object(&state, &category, &content_id, &headers, true).await
}

/// HEAD /{category}/{content_id} - Same headers as GET, no body.
pub(crate) async fn head_object(
    State(state): State<Arc<AppState>>,
    Path((category, content_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response<Body>> {
    serve_object(&state, &category, &content_id, &headers, false).await
}

async fn serve_object(
    state: &AppState,
    category: &str,
    content_id: &str,
    headers: &HeaderMap,
    with_body: bool,
) -> Result<Response<Body>> {
    let category: Category = category.parse()?;
    let content_id = validate_content_id(content_id)?;
    let path = state.store.shard_path(category, content_id);

    // The handle opened here is the only one for this request. It moves into
    // the body stream, or is dropped before returning.
    let mut file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::not_found(format!("{category}/{content_id}")));
        },
        Err(e) => return Err(Error::io(format!("open {category}/{content_id}"), e)),
    };
    let meta = file
        .metadata()
        .await
        .map_err(|e| Error::io(format!("stat {category}/{content_id}"), e))?;
    if !meta.is_file() {
        return Err(Error::not_found(format!("{category}/{content_id}")));
    }
    let length = meta.len();

    let range = match headers.get(header::RANGE) {
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| Error::malformed("Range header is not ASCII"))?;
            Some(parse_range(value, length)?)
        },
        None => None,
    };

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, guess_content_type(&path).as_ref());
    if let Ok(modified) = meta.modified() {
        builder = builder.header(header::LAST_MODIFIED, http_date(modified));
    }

    let (start, len) = match range {
        Some(r) => {
            builder = builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, r.content_range(length));
            (r.start, r.len())
        },
        None => (0, length),
    };
    builder = builder.header(header::CONTENT_LENGTH, len);

    debug!(%category, %content_id, start, len, with_body, "Serving object");

    let body = if with_body {
        if start > 0 {
            file.seek(SeekFrom::Start(start))
                .await
                .map_err(|e| Error::io(format!("seek {category}/{content_id}"), e))?;
        }
        Body::from_stream(ReaderStream::new(file.take(len)))
    } else {
        drop(file);
        Body::empty()
    };

    builder
        .body(body)
        .map_err(|e| Error::io("build response", std::io::Error::other(e)))
}

/// Guess a `Content-Type` from the object's extension.
pub fn guess_content_type(path: &FsPath) -> Cow<'static, str> {
    mime_guess::from_path(path)
        .first()
        .map_or(Cow::Borrowed("application/octet-stream"), |mime| {
            let mime_str = mime.essence_str();
            match mime_str {
                "image/jpeg" => Cow::Borrowed("image/jpeg"),
                "image/png" => Cow::Borrowed("image/png"),
                "video/mp4" => Cow::Borrowed("video/mp4"),
                "audio/mpeg" => Cow::Borrowed("audio/mpeg"),
                _ if mime_str.starts_with("text/") => {
                    Cow::Owned(format!("{mime_str}; charset=utf-8"))
                },
                _ => Cow::Owned(mime_str.to_string()),
            }
        })
}

/// Format a time as an RFC 1123 HTTP date.
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
