//! Typed errors for the archive library.
//!
//! The catalog, store, ingest pipeline and range server all return
//! [`Error`]. The CLI layer wraps these in `anyhow` with extra context.

use std::path::PathBuf;

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Archive errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Content with the same `(byteSize, contentHash)` is already catalogued.
    ///
    /// This is an expected outcome of ingestion, not a failure.
    #[error("duplicate entry: content already stored as entry {entry_id}")]
    DuplicateEntry { entry_id: i64 },

    /// Entry or stored object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Client sent a request that cannot be parsed.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Requested byte range lies outside the object.
    #[error("range not satisfiable for object of {length} bytes")]
    RangeNotSatisfiable { length: u64 },

    /// Content id failed validation (untrusted input only).
    #[error("invalid content id '{id}': {reason}")]
    InvalidContentId { id: String, reason: &'static str },

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Source file could not be read.
    #[error("cannot read {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog database error.
    #[error("catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Background task failed to complete.
    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an unreadable-source error.
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a malformed request error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest(reason.into())
    }
}

/// Convert archive error to HTTP status code.
impl Error {
    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::MalformedRequest(_) | Self::InvalidContentId { .. } => 400,
            Self::RangeNotSatisfiable { .. } => 416,
            Self::DuplicateEntry { .. } => 409,
            Self::Io { source, .. } | Self::Unreadable { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                404
            },
            Self::Io { .. }
            | Self::Unreadable { .. }
            | Self::Catalog(_)
            | Self::Config(_)
            | Self::Task(_) => 500,
        }
    }
}
