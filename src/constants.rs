//! Shared constants for the archive layout, hashing and serving.

/// Subdirectory holding original media bytes.
pub const ORIG_DIR: &str = "orig";

/// Subdirectory holding generated thumbnails.
pub const THUMB_DIR: &str = "thumb";

/// Catalog database file name inside the archive root.
pub const CATALOG_FILE: &str = "metadata.db";

/// Optional configuration file inside the archive root.
pub const CONFIG_FILE: &str = "mediavault.toml";

/// Number of leading id characters used as the shard directory.
pub const SHARD_PREFIX_LEN: usize = 2;

/// Extension given to every thumbnail object.
pub const THUMBNAIL_EXT: &str = "jpg";

/// Bounding box for generated thumbnails (width and height, pixels).
pub const DEFAULT_THUMB_SIZE: u32 = 128;

/// Read buffer used when hashing and copying sources (64 KiB).
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Default listen port for `serve`.
pub const DEFAULT_PORT: u16 = 8400;

/// Default bind address for `serve`.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Upper bound on a single prober subprocess run.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;

/// Rows fetched per page when listing the catalog.
pub const LIST_PAGE_SIZE: usize = 256;

/// Catalog timestamp format (UTC, lexicographically sortable).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
