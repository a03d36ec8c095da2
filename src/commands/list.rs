//! `mediavault <root> list`
//!
//! Prints one line per entry, newest first:
//!
//! ```text
//! 2024-07-14 18:02:11 image/jpeg 2457600 (4032x3024) Sunset {2024, trip, beach, jpg}
//! ```

use std::io::{self, Write};

use anyhow::{Context, Result};

use mediavault::Archive;
use mediavault::catalog::{Entry, names};

/// Execute the list command.
pub fn execute(archive: &Archive, json: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for entry in archive.catalog().list_entries() {
        let entry = entry.context("Failed to read catalog")?;
        let line = if json {
            serde_json::to_string(&entry)?
        } else {
            format_entry_line(&entry)
        };
        if writeln!(out, "{line}").is_err() {
            // Downstream closed the pipe (e.g. `| head`).
            break;
        }
    }
    Ok(())
}

/// `timestamp type size (WxH) [Ns] description {tags}`
///
/// Dimensions appear only when both width and height are known; duration
/// and description only when present.
pub fn format_entry_line(entry: &Entry) -> String {
    let mut parts = vec![
        entry.timestamp.clone().unwrap_or_else(|| "-".to_string()),
        entry.mime_type.clone().unwrap_or_else(|| "-".to_string()),
        entry.byte_size.to_string(),
    ];

    if let (Some(w), Some(h)) = (entry.attr(names::WIDTH), entry.attr(names::HEIGHT)) {
        parts.push(format!("({w}x{h})"));
    }
    if let Some(duration) = entry.attr(names::DURATION) {
        parts.push(format!("[{duration}s]"));
    }
    if let Some(description) = entry.attr(names::DESCRIPTION) {
        parts.push(description.to_string());
    }
    parts.push(format!("{{{}}}", entry.tags().join(", ")));

    parts.join(" ")
}
