//! `Range` header parsing (single `bytes` ranges only).

use crate::error::{Error, Result};

/// A satisfiable byte range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

#[allow(clippy::len_without_is_empty)]
impl ByteRange {
    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for an object of `length` bytes.
    pub fn content_range(&self, length: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, length)
    }
}

/// Resolve a `Range` header value against an object of `length` bytes.
///
/// Accepted forms are `bytes=S-E`, `bytes=S-` and `bytes=-N`. An end past
/// the object is clamped to its last byte; a suffix longer than the object
/// selects all of it.
///
/// # Errors
///
/// - [`Error::MalformedRequest`] for another unit, a multi-range list, a
///   missing start and end, or anything that is not a decimal offset.
/// - [`Error::RangeNotSatisfiable`] when the start is at or past the end of
///   the object, when `S > E`, or for `bytes=-0`.
pub fn parse_range(header: &str, length: u64) -> Result<ByteRange> {
    let header = header.trim();
    let set = header
        .get(..6)
        .filter(|unit| unit.eq_ignore_ascii_case("bytes="))
        .map(|_| &header[6..])
        .ok_or_else(|| Error::malformed("range unit must be bytes"))?
        .trim();

    if set.contains(',') {
        return Err(Error::malformed("multiple ranges are not supported"));
    }
    let (start, end) = set
        .split_once('-')
        .ok_or_else(|| Error::malformed("range has no '-'"))?;
    let start = parse_offset(start.trim())?;
    let end = parse_offset(end.trim())?;
    let unsatisfiable = Error::RangeNotSatisfiable { length };

    match (start, end) {
        (None, None) => Err(Error::malformed("range has neither start nor end")),
        (None, Some(suffix)) => {
            if suffix == 0 || length == 0 {
                return Err(unsatisfiable);
            }
            Ok(ByteRange {
                start: length.saturating_sub(suffix),
                end: length - 1,
            })
        },
        (Some(start), None) => {
            if start >= length {
                return Err(unsatisfiable);
            }
            Ok(ByteRange {
                start,
                end: length - 1,
            })
        },
        (Some(start), Some(end)) => {
            if start > end || start >= length {
                return Err(unsatisfiable);
            }
            Ok(ByteRange {
                start,
                end: end.min(length - 1),
            })
        },
    }
}

fn parse_offset(s: &str) -> Result<Option<u64>> {
    if s.is_empty() {
        return Ok(None);
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::malformed("range offset is not a number"));
    }
    s.parse()
        .map(Some)
        .map_err(|_| Error::malformed("range offset out of bounds"))
}
