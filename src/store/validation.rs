//! Content id validation and derivation.
//!
//! Ids generated by the pipeline are always well formed. Ids arriving from
//! the outside (HTTP paths) go through [`validate_content_id`] before they
//! are turned into filesystem paths, so a request can never name anything
//! outside the shard directories.

use std::path::Path;

use tracing::warn;

use crate::constants::{SHARD_PREFIX_LEN, THUMBNAIL_EXT};
use crate::error::{Error, Result};

/// Longest id accepted from untrusted input.
const MAX_ID_LEN: usize = 255;

/// Validate an untrusted content id.
///
/// Valid ids:
/// - are at least 3 characters (2-character shard prefix plus remainder)
/// - contain only ASCII letters, digits, `.`, `_` and `-`
/// - do not start with `.`
///
/// # Errors
///
/// Returns [`Error::InvalidContentId`] naming the first rule broken.
pub fn validate_content_id(id: &str) -> Result<&str> {
    let reject = |reason: &'static str| {
        warn!(
            security_event = "content_id_rejected",
            id_len = id.len(),
            %reason,
            "Rejected content id"
        );
        Err(Error::InvalidContentId {
            id: id.chars().filter(|c| !c.is_control()).collect(),
            reason,
        })
    };

    if id.len() <= SHARD_PREFIX_LEN {
        return reject("too short");
    }
    if id.len() > MAX_ID_LEN {
        return reject("too long");
    }
    if id.starts_with('.') {
        return reject("leading dot");
    }
    if !id.bytes().all(is_id_byte) {
        return reject("illegal character");
    }

    Ok(id)
}

fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-')
}

/// Generate a fresh content id for a source file.
///
/// A random 128-bit token as 32 lowercase hex characters, followed by the
/// lower-cased extension of `source` (with its dot) when it has one that
/// [`validate_content_id`] would accept. Other extensions are dropped so
/// every generated id can be requested back over HTTP.
pub fn generate_content_id(source: &Path) -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .filter(|ext| !ext.is_empty() && ext.bytes().all(is_id_byte));
    match ext {
        Some(ext) => format!("{token}.{ext}"),
        None => token,
    }
}

/// Id of the thumbnail derived from a content id: basename + `.jpg`.
pub fn thumbnail_id(content_id: &str) -> String {
    let stem = Path::new(content_id)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(content_id);
    format!("{stem}.{THUMBNAIL_EXT}")
}
