//! mediavault: a deduplicating, content-addressed media archive.
//!
//! Files are ingested into a sharded object store keyed by random content
//! ids, deduplicated on `(size, SHA-1 digest)`, described in a SQLite
//! catalog with an ordered attribute list per entry, and served back over
//! HTTP with byte-range support.
//!
//! - [`hasher`] - streaming content digests
//! - [`store`] - sharded object store with atomic writes
//! - [`catalog`] - entries, attributes and the action log
//! - [`probe`] - media attribute and thumbnail extraction
//! - [`ingest`] - the ingestion pipeline
//! - [`server`] - the range-serving HTTP endpoint
//! - [`archive`] - the on-disk layout tying these together

pub mod archive;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod hasher;
pub mod ingest;
pub mod probe;
pub mod server;
pub mod store;
pub mod utils;

pub use archive::Archive;
pub use error::{Error, Result};
