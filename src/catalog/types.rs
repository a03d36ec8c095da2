//! Record types stored in and returned by the catalog.

use serde::Serialize;

/// Canonical attribute names written by the ingest pipeline and probers.
///
/// The vocabulary is a convention, not a schema constraint: the catalog
/// stores any name a prober chooses to emit.
pub mod names {
    /// Source path as given at ingestion.
    pub const PATH: &str = "path";
    /// Source modification time (UTC).
    pub const MTIME: &str = "mtime";
    /// Free-text tag; repeated.
    pub const TAG: &str = "tag";
    /// Effective capture/creation time (UTC).
    pub const TIMESTAMP: &str = "timestamp";
    /// Pixel width.
    pub const WIDTH: &str = "width";
    /// Pixel height.
    pub const HEIGHT: &str = "height";
    /// Duration in whole seconds.
    pub const DURATION: &str = "duration";
    /// Embedded description text.
    pub const DESCRIPTION: &str = "description";
    /// Display rotation in degrees.
    pub const ROTATION: &str = "rotation";
}

/// A name/value pair attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    /// Create an attribute; the value is stored as text.
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

/// Fields supplied when inserting a new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub content_id: String,
    pub mime_type: Option<String>,
    pub byte_size: u64,
    pub content_hash: String,
    pub timestamp: Option<String>,
}

/// One archived artifact with its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub entry_id: i64,
    pub content_id: String,
    pub mime_type: Option<String>,
    pub byte_size: u64,
    pub content_hash: String,
    pub timestamp: Option<String>,
    /// Attributes in insertion order.
    pub attributes: Vec<Attribute>,
}

impl Entry {
    /// First value recorded under `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Every value recorded under `name`, in insertion order.
    pub fn attrs<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.attributes
            .iter()
            .filter(move |a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// All `tag` values.
    pub fn tags(&self) -> Vec<&str> {
        self.attrs(names::TAG).collect()
    }
}

/// One line of the append-only action log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub log_id: i64,
    pub entry_id: i64,
    pub timestamp: String,
    pub action: String,
}

/// Aggregate numbers over the whole catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub entries: u64,
    pub total_bytes: u64,
}
