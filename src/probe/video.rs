//! Audio/video probing through `ffprobe` and `ffmpeg`.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::ProbeResult;
use super::tool::run_tool;
use crate::catalog::{Attribute, names};
use crate::config::ProbeConfig;
use crate::constants::TIMESTAMP_FORMAT;

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
}

pub(super) async fn probe(config: &ProbeConfig, path: &Path, timeout: Duration) -> ProbeResult {
    let args: Vec<OsString> = vec![
        "-v".into(),
        "error".into(),
        "-print_format".into(),
        "json".into(),
        "-show_format".into(),
        "-show_streams".into(),
        path.into(),
    ];
    let Some(stdout) = run_tool(&config.ffprobe, &args, timeout).await else {
        return ProbeResult::empty();
    };

    ProbeResult {
        attributes: parse_ffprobe(&stdout),
        thumbnail: thumbnail(config, path, timeout).await,
    }
}

async fn thumbnail(config: &ProbeConfig, path: &Path, timeout: Duration) -> Option<Vec<u8>> {
    let size = config.thumb_size;
    let args: Vec<OsString> = vec![
        "-v".into(),
        "error".into(),
        "-i".into(),
        path.into(),
        "-frames:v".into(),
        "1".into(),
        "-vf".into(),
        format!("scale={size}:{size}:force_original_aspect_ratio=decrease").into(),
        "-f".into(),
        "image2pipe".into(),
        "-c:v".into(),
        "mjpeg".into(),
        "-".into(),
    ];
    run_tool(&config.ffmpeg, &args, timeout)
        .await
        .filter(|bytes| !bytes.is_empty())
}

/// Parse `ffprobe -print_format json` output into attributes.
///
/// Yields `duration` (seconds, rounded), `width` and `height` (0 when no
/// stream reports them; the last stream that does wins) and, when the
/// container carries a parseable `creation_time` tag, `timestamp`.
/// Unparseable input yields no attributes.
pub fn parse_ffprobe(json: &[u8]) -> Vec<Attribute> {
    let Ok(output) = serde_json::from_slice::<FfprobeOutput>(json) else {
        return Vec::new();
    };

    let duration = output
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map_or(0, |d| d.round() as u64);

    let (mut width, mut height) = (0, 0);
    for stream in &output.streams {
        if let Some(w) = stream.width {
            width = w;
        }
        if let Some(h) = stream.height {
            height = h;
        }
    }

    let mut attributes = vec![
        Attribute::new(names::DURATION, duration),
        Attribute::new(names::WIDTH, width),
        Attribute::new(names::HEIGHT, height),
    ];
    if let Some(ts) = output
        .format
        .tags
        .get("creation_time")
        .and_then(|raw| parse_creation_time(raw))
    {
        attributes.push(Attribute::new(names::TIMESTAMP, ts));
    }
    attributes
}

fn parse_creation_time(raw: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim()).ok()?;
    Some(parsed.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string())
}
