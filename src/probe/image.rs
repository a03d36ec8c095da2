//! Still-image probing through ImageMagick.

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDateTime;

use super::ProbeResult;
use super::tool::run_tool;
use crate::catalog::{Attribute, names};
use crate::config::ProbeConfig;
use crate::constants::TIMESTAMP_FORMAT;

/// Field separator in the `identify` format string. EXIF text may contain
/// newlines and pipes, but not the ASCII unit separator.
const SEP: char = '\u{1f}';

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

fn identify_format() -> String {
    [
        "%w",
        "%h",
        "%[EXIF:Orientation]",
        "%[EXIF:DateTimeOriginal]",
        "%[EXIF:DateTime]",
        "%[EXIF:ImageDescription]",
    ]
    .join(&SEP.to_string())
}

/// First frame only, so animated images report once.
fn first_frame(path: &Path) -> OsString {
    let mut arg = OsString::from(path);
    arg.push("[0]");
    arg
}

pub(super) async fn probe(config: &ProbeConfig, path: &Path, timeout: Duration) -> ProbeResult {
    let args: Vec<OsString> = vec![
        "-format".into(),
        identify_format().into(),
        first_frame(path),
    ];
    let Some(stdout) = run_tool(&config.identify, &args, timeout).await else {
        return ProbeResult::empty();
    };

    ProbeResult {
        attributes: parse_identify(&String::from_utf8_lossy(&stdout)),
        thumbnail: thumbnail(config, path, timeout).await,
    }
}

async fn thumbnail(config: &ProbeConfig, path: &Path, timeout: Duration) -> Option<Vec<u8>> {
    let size = config.thumb_size;
    let args: Vec<OsString> = vec![
        first_frame(path),
        "-auto-orient".into(),
        "-thumbnail".into(),
        format!("{size}x{size}").into(),
        "jpeg:-".into(),
    ];
    run_tool(&config.convert, &args, timeout)
        .await
        .filter(|bytes| !bytes.is_empty())
}

/// Parse the output of the `identify` format string used by the image
/// prober.
///
/// Yields `width` and `height`, then `description` (EXIF ImageDescription),
/// `rotation` (from EXIF Orientation: 8 → 90, 3 → 180, 6 → 270, anything
/// else → 0) and `timestamp` (DateTimeOriginal, else DateTime), each only
/// when the tag is present. Output without numeric dimensions yields
/// nothing.
pub fn parse_identify(output: &str) -> Vec<Attribute> {
    let mut fields = output.split(SEP).map(str::trim);
    let width = fields.next().and_then(|w| w.parse::<u32>().ok());
    let height = fields.next().and_then(|h| h.parse::<u32>().ok());
    let (Some(width), Some(height)) = (width, height) else {
        return Vec::new();
    };
    let orientation = fields.next().unwrap_or_default();
    let date_original = fields.next().unwrap_or_default();
    let date = fields.next().unwrap_or_default();
    let description = fields.next().unwrap_or_default();

    let mut attributes = vec![
        Attribute::new(names::WIDTH, width),
        Attribute::new(names::HEIGHT, height),
    ];
    if !description.is_empty() {
        attributes.push(Attribute::new(names::DESCRIPTION, description));
    }
    if !orientation.is_empty() {
        attributes.push(Attribute::new(names::ROTATION, rotation(orientation)));
    }
    if let Some(ts) = parse_exif_date(date_original).or_else(|| parse_exif_date(date)) {
        attributes.push(Attribute::new(names::TIMESTAMP, ts));
    }
    attributes
}

fn rotation(orientation: &str) -> u32 {
    match orientation {
        "8" => 90,
        "3" => 180,
        "6" => 270,
        _ => 0,
    }
}

fn parse_exif_date(raw: &str) -> Option<String> {
    let parsed = NaiveDateTime::parse_from_str(raw, EXIF_DATE_FORMAT).ok()?;
    Some(parsed.format(TIMESTAMP_FORMAT).to_string())
}
