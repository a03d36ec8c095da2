//! `mediavault <root> add [-t tag]... <paths...>`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use mediavault::Archive;
use mediavault::ingest::{FileReport, FileStatus};

/// Execute the add command.
pub async fn execute(archive: &Archive, tags: &[String], patterns: &[String]) -> Result<()> {
    let paths = expand_patterns(patterns)?;
    let pipeline = archive.pipeline();
    let report = pipeline.ingest_paths(&paths, tags).await;

    for file in &report.files {
        println!("{}", format_report_line(file));
    }

    let dry_run = if pipeline.options().dry_run {
        " (dry run)"
    } else {
        ""
    };
    println!();
    println!(
        "{} added, {} ignored, {} failed{dry_run}",
        report.added(),
        report.ignored(),
        report.failed()
    );

    if report.failed() > 0 {
        anyhow::bail!("{} file(s) could not be added", report.failed());
    }
    Ok(())
}

/// `<path>: added (entry N)`, `<path>: ignored (entry N)` or
/// `<path>: error: <reason>`.
fn format_report_line(file: &FileReport) -> String {
    let path = file.path.display();
    match &file.status {
        FileStatus::Added { entry_id, .. } | FileStatus::Ignored { entry_id } => {
            format!("{path}: {} (entry {entry_id})", file.status)
        },
        FileStatus::Error(_) => format!("{path}: {}", file.status),
    }
}

/// Expand glob patterns; other arguments pass through unchanged.
///
/// A pattern that matches nothing is kept as-is, so it is reported as a
/// missing file rather than silently dropped.
fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if Path::new(pattern).exists() || !is_glob(pattern) {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let mut matches = glob::glob(pattern)
            .with_context(|| format!("Invalid glob pattern: {pattern}"))?
            .filter_map(std::result::Result::ok)
            .collect::<Vec<_>>();
        if matches.is_empty() {
            paths.push(PathBuf::from(pattern));
        } else {
            matches.sort();
            paths.append(&mut matches);
        }
    }
    Ok(paths)
}

fn is_glob(s: &str) -> bool {
    s.contains(['*', '?', '['])
}
