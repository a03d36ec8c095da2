//! End-to-end ingestion through an opened archive.
//!
//! Probing is disabled here so the tests do not depend on ffmpeg or
//! ImageMagick being installed; see `probe_tests.rs` for the tool path.

#[path = "common.rs"]
mod common;

use std::fs;
use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use common::{get, sample_bytes};
use mediavault::Archive;
use mediavault::archive::catalog_path;
use mediavault::catalog::names;
use mediavault::config::ArchiveConfig;
use mediavault::ingest::{ACTION_ADD, FileStatus, IngestOutcome};
use mediavault::server;
use mediavault::store::{Category, validate_content_id};
use rusqlite::Connection;
use tempfile::TempDir;
use walkdir::WalkDir;

fn config(dry_run: bool) -> ArchiveConfig {
    let mut config = ArchiveConfig::default();
    config.probe.enabled = false;
    config.ingest.dry_run = dry_run;
    config
}

fn write(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, data).unwrap();
    path
}

fn count_files(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .count()
}

// =============================================================================
// Ingest then serve
// =============================================================================

#[tokio::test]
async fn test_ingested_original_is_served() {
    let tmp = TempDir::new().unwrap();
    let data = sample_bytes(4096);
    let source = write(tmp.path(), "src/clip.mp4", &data);

    let archive = Archive::open(tmp.path().join("vault"), config(false)).unwrap();
    let report = archive.pipeline().ingest_paths(&[source], &[]).await;
    assert_eq!(report.added(), 1);

    let FileStatus::Added { content_id, .. } = &report.files[0].status else {
        panic!("expected added, got {}", report.files[0].status);
    };
    assert!(content_id.ends_with(".mp4"));

    let router = server::router(archive.store().clone());
    let resp = get(router.clone(), &format!("/orig/{content_id}"), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body.as_ref(), data.as_slice());

    let resp = get(router, &format!("/orig/{content_id}"), Some("bytes=-96")).await;
    assert_eq!(resp.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.body.as_ref(), &data[4000..]);
}

#[tokio::test]
async fn test_odd_extension_is_still_addressable() {
    let tmp = TempDir::new().unwrap();
    let source = write(tmp.path(), "src/clip.mp4~", b"editor backup");

    let archive = Archive::open(tmp.path().join("vault"), config(false)).unwrap();
    let outcome = archive.pipeline().ingest(&source, &[]).await.unwrap();
    let IngestOutcome::Added { content_id, .. } = outcome else {
        panic!("expected added");
    };
    assert!(validate_content_id(&content_id).is_ok());
    assert!(!content_id.contains('.'));

    let router = server::router(archive.store().clone());
    let resp = get(router, &format!("/orig/{content_id}"), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body.as_ref(), b"editor backup");
}

// =============================================================================
// Deduplication
// =============================================================================

#[tokio::test]
async fn test_directory_ingest_deduplicates() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    write(&src, "a.jpg", b"same bytes");
    write(&src, "nested/b.jpg", b"same bytes");
    write(&src, "c.jpg", b"other bytes");
    write(&src, ".hidden/d.jpg", b"hidden bytes");

    let archive = Archive::open(tmp.path().join("vault"), config(false)).unwrap();
    let pipeline = archive.pipeline();

    let report = pipeline.ingest_paths(&[src.clone()], &[]).await;
    assert_eq!(report.files.len(), 3);
    assert_eq!(report.added(), 2);
    assert_eq!(report.ignored(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(count_files(&archive.category_dir(Category::Orig)), 2);

    let again = pipeline.ingest_paths(&[src], &[]).await;
    assert_eq!(again.added(), 0);
    assert_eq!(again.ignored(), 3);

    let stats = archive.catalog().stats().unwrap();
    assert_eq!(stats.entries, 2);
    assert_eq!(count_files(&archive.category_dir(Category::Orig)), 2);
}

#[tokio::test]
async fn test_catalog_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let source = write(tmp.path(), "photo.jpg", b"persisted");
    let root = tmp.path().join("vault");

    let first = {
        let archive = Archive::open(&root, config(false)).unwrap();
        archive.pipeline().ingest(&source, &[]).await.unwrap()
    };

    let archive = Archive::open(&root, config(false)).unwrap();
    let second = archive.pipeline().ingest(&source, &[]).await.unwrap();
    assert_eq!(second.entry_id(), first.entry_id());

    let logs: Vec<String> = archive
        .catalog()
        .logs_for(first.entry_id())
        .unwrap()
        .into_iter()
        .map(|l| l.action)
        .collect();
    assert_eq!(logs, vec![ACTION_ADD]);
}

#[tokio::test]
async fn test_existing_catalog_rows_deduplicate() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("vault");
    fs::create_dir_all(&root).unwrap();
    {
        let conn = Connection::open(catalog_path(&root)).unwrap();
        conn.execute_batch(
            "CREATE TABLE Entries (entryId INTEGER PRIMARY KEY, timestamp TEXT, \
             fileName TEXT, fileType TEXT, fileSize INTEGER, fileHash TEXT);
             CREATE TABLE Attrs (entryId INTEGER, attrName TEXT, attrValue TEXT);
             CREATE TABLE Logs (actionId INTEGER PRIMARY KEY, entryId INTEGER, \
             timestamp TEXT, action TEXT);
             INSERT INTO Entries VALUES (41, '2011-03-04 05:06:07', \
             '5f1d2c3b4a5968778695a4b3c2d1e0f9.txt', 'text/plain', 12, \
             '654c9c42ee664aa82279e3c10c373880e55252c2');",
        )
        .unwrap();
    }
    let source = write(tmp.path(), "notes.txt", b"hello legacy");

    let archive = Archive::open(&root, config(false)).unwrap();
    let outcome = archive.pipeline().ingest(&source, &[]).await.unwrap();

    assert!(matches!(outcome, IngestOutcome::Ignored { entry_id: 41 }));
    assert_eq!(archive.catalog().stats().unwrap().entries, 1);
    assert_eq!(count_files(&archive.category_dir(Category::Orig)), 0);
}

// =============================================================================
// Attributes
// =============================================================================

#[tokio::test]
async fn test_relative_path_attributes() {
    let tmp = TempDir::new().unwrap();
    let source = write(tmp.path(), "2024 trip/beach.jpg", b"sand");

    let archive = Archive::open(tmp.path().join("vault"), config(false)).unwrap();
    let outcome = archive
        .pipeline()
        .ingest(&source, &["family".to_string()])
        .await
        .unwrap();

    let entry = archive.catalog().get_entry(outcome.entry_id()).unwrap();
    let label = source.to_string_lossy().into_owned();
    assert_eq!(entry.attr(names::PATH), Some(label.as_str()));
    assert!(entry.attr(names::MTIME).is_some());

    let tags = entry.tags();
    let expected_tail = ["2024", "trip", "beach", "jpg", "family"];
    assert!(tags.len() >= expected_tail.len());
    assert_eq!(&tags[tags.len() - expected_tail.len()..], &expected_tail);
    assert_eq!(entry.attr(names::TIMESTAMP), entry.timestamp.as_deref());
    assert_eq!(entry.mime_type.as_deref(), Some("image/jpeg"));
}

// Only test in this binary that touches the working directory; the others
// use absolute paths.
#[tokio::test]
async fn test_relative_path_attribute_order() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "2024 trip/beach.jpg", b"dunes");
    std::env::set_current_dir(tmp.path()).unwrap();

    let archive = Archive::open(tmp.path().join("vault"), config(false)).unwrap();
    let outcome = archive
        .pipeline()
        .ingest(Path::new("2024 trip/beach.jpg"), &["family".to_string()])
        .await
        .unwrap();

    let entry = archive.catalog().get_entry(outcome.entry_id()).unwrap();
    let order: Vec<&str> = entry.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(
        order,
        vec![
            names::PATH,
            names::MTIME,
            names::TAG,
            names::TAG,
            names::TAG,
            names::TAG,
            names::TAG,
            names::TIMESTAMP,
        ]
    );
    assert_eq!(entry.attributes[0].value, "2024 trip/beach.jpg");
    let values: Vec<&str> = entry.attributes[2..7]
        .iter()
        .map(|a| a.value.as_str())
        .collect();
    assert_eq!(values, vec!["2024", "trip", "beach", "jpg", "family"]);
    assert_eq!(entry.attr(names::TIMESTAMP), entry.timestamp.as_deref());
}

// =============================================================================
// Dry run
// =============================================================================

#[tokio::test]
async fn test_dry_run_writes_catalog_only() {
    let tmp = TempDir::new().unwrap();
    let source = write(tmp.path(), "movie.mp4", &sample_bytes(2048));

    let archive = Archive::open(tmp.path().join("vault"), config(true)).unwrap();
    let outcome = archive.pipeline().ingest(&source, &[]).await.unwrap();

    assert_eq!(count_files(&archive.category_dir(Category::Orig)), 0);
    assert_eq!(count_files(&archive.category_dir(Category::Thumb)), 0);

    let entry = archive.catalog().get_entry(outcome.entry_id()).unwrap();
    assert_eq!(entry.byte_size, 2048);
    assert!(!archive.store().exists(Category::Orig, &entry.content_id));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_missing_path_is_reported_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let good = write(tmp.path(), "ok.jpg", b"fine");
    let missing = tmp.path().join("nope.jpg");

    let archive = Archive::open(tmp.path().join("vault"), config(false)).unwrap();
    let report = archive.pipeline().ingest_paths(&[missing, good], &[]).await;

    assert_eq!(report.files.len(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.added(), 1);
    assert!(matches!(report.files[0].status, FileStatus::Error(_)));
}
