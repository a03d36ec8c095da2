//! Streaming content hashing.
//!
//! Produces the `(byteSize, contentHash)` dedup key for a source without
//! loading it into memory. The digest is SHA-1 rendered as 40 lowercase hex
//! characters, the same key existing `metadata.db` catalogs were written
//! with, so sources recorded there deduplicate against new ingests.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use sha1::{Digest, Sha1};

use crate::constants::HASH_CHUNK_SIZE;
use crate::error::{Error, Result};

/// Size and digest of a byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest {
    /// Total number of bytes read.
    pub byte_size: u64,
    /// Lowercase hex SHA-1 digest.
    pub content_hash: String,
}

/// Chunked stream hasher.
#[derive(Debug, Clone, Copy)]
pub struct ContentHasher {
    chunk_size: usize,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(HASH_CHUNK_SIZE)
    }
}

impl ContentHasher {
    /// Create a hasher reading `chunk_size` bytes at a time.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "hash chunk size must be non-zero");
        Self { chunk_size }
    }

    /// Hash everything `reader` yields.
    ///
    /// Interrupted reads are retried; any other read error is returned as-is.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> std::io::Result<ContentDigest> {
        let mut hasher = Sha1::new();
        let mut buf = vec![0u8; self.chunk_size];
        let mut byte_size = 0u64;

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
            byte_size += n as u64;
        }

        Ok(ContentDigest {
            byte_size,
            content_hash: hex::encode(hasher.finalize()),
        })
    }

    /// Hash the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreadable`] if the file cannot be opened or read.
    pub fn hash_file(&self, path: &Path) -> Result<ContentDigest> {
        let file = File::open(path).map_err(|e| Error::unreadable(path, e))?;
        self.hash_reader(file).map_err(|e| Error::unreadable(path, e))
    }
}
