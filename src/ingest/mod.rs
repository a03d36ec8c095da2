//! Ingestion: from a source file to a catalogued, stored entry.
//!
//! For each file the pipeline hashes the content, checks the catalog for an
//! entry with the same `(byteSize, contentHash)`, and either skips the file
//! or stores it, probes it and commits a new entry.
//!
//! ```text
//! Hashing -> DedupCheck -> Skip
//!                       -> Store -> Probe -> Persist -> Log -> Done
//! ```
//!
//! Ingesting the same content twice is a no-op that reports the existing
//! entry. Ingestion is serialized through an internal lock held from the
//! dedup check to the catalog commit; hashing runs outside it on a blocking
//! thread.

mod audit;
mod batch;
mod tokenize;

pub use audit::{AuditEvent, log_audit_event};
pub use batch::{BatchReport, FileReport, FileStatus};
pub use tokenize::tokenize;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::catalog::{Attribute, Catalog, NewEntry, names};
use crate::constants::TIMESTAMP_FORMAT;
use crate::error::{Error, Result};
use crate::hasher::{ContentDigest, ContentHasher};
use crate::probe::{MediaKind, MediaProber, ProbeResult};
use crate::store::{Category, ContentStore, generate_content_id, thumbnail_id};

/// Log action recorded when an entry is created.
///
/// Skipped duplicates leave the catalog untouched; they are reported through
/// the `audit` tracing target only.
pub const ACTION_ADD: &str = "add";

/// Ingestion switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Catalog entries without writing any bytes under `orig/` or `thumb/`.
    pub dry_run: bool,
    /// Before hashing, skip files whose path, mtime and size match an
    /// existing entry. Misses content changes that keep all three.
    pub relaxed: bool,
    /// Run the media prober on image, audio and video files.
    pub probe: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            relaxed: false,
            probe: true,
        }
    }
}

/// Result of ingesting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new entry was created.
    Added { entry_id: i64, content_id: String },
    /// The content was already archived under `entry_id`.
    Ignored { entry_id: i64 },
}

impl IngestOutcome {
    /// Entry id, new or existing.
    pub fn entry_id(&self) -> i64 {
        match self {
            Self::Added { entry_id, .. } | Self::Ignored { entry_id } => *entry_id,
        }
    }
}

/// Orchestrates hashing, dedup, storage, probing and cataloguing.
pub struct IngestPipeline {
    catalog: Catalog,
    store: ContentStore,
    prober: Arc<dyn MediaProber>,
    hasher: ContentHasher,
    options: IngestOptions,
    writer: Mutex<()>,
}

impl IngestPipeline {
    /// Create a pipeline writing to `catalog` and `store`.
    pub fn new(
        catalog: Catalog,
        store: ContentStore,
        prober: Arc<dyn MediaProber>,
        options: IngestOptions,
    ) -> Self {
        Self {
            catalog,
            store,
            prober,
            hasher: ContentHasher::default(),
            options,
            writer: Mutex::new(()),
        }
    }

    /// Replace the default hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: ContentHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// The catalog this pipeline writes to.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Active options.
    pub fn options(&self) -> IngestOptions {
        self.options
    }

    /// Ingest one file, tagging it with `tags` in addition to the tokens of
    /// its path.
    ///
    /// The `path` attribute records `source` as given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreadable`] if the source cannot be read, or a
    /// store or catalog error. Nothing is committed on error, and objects
    /// already stored for the file are removed.
    pub async fn ingest(&self, source: &Path, tags: &[String]) -> Result<IngestOutcome> {
        let label = source.to_string_lossy();
        let result = self.ingest_file(source, &label, tags).await;

        match &result {
            Ok(IngestOutcome::Added {
                entry_id,
                content_id,
            }) => log_audit_event(AuditEvent::Added {
                path: &label,
                entry_id: *entry_id,
                content_id,
                dry_run: self.options.dry_run,
            }),
            Ok(IngestOutcome::Ignored { entry_id }) => log_audit_event(AuditEvent::Ignored {
                path: &label,
                entry_id: *entry_id,
            }),
            Err(e) => log_audit_event(AuditEvent::Failed {
                path: &label,
                reason: &e.to_string(),
            }),
        }
        result
    }

    async fn ingest_file(
        &self,
        source: &Path,
        label: &str,
        tags: &[String],
    ) -> Result<IngestOutcome> {
        let meta = tokio::fs::metadata(source)
            .await
            .map_err(|e| Error::unreadable(source, e))?;
        if !meta.is_file() {
            return Err(Error::unreadable(
                source,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let modified = meta.modified().map_err(|e| Error::unreadable(source, e))?;
        let mtime = format_time(modified);

        if self.options.relaxed {
            let catalog = self.catalog.clone();
            let (path, m, size) = (label.to_string(), mtime.clone(), meta.len());
            let hit = blocking(move || catalog.find_duplicate_by_path_and_mtime(&path, &m, size))
                .await?;
            if let Some(entry_id) = hit {
                debug!(path = %label, entry_id, "Matched by path and mtime, not hashing");
                return Ok(IngestOutcome::Ignored { entry_id });
            }
        }

        let digest = {
            let hasher = self.hasher;
            let src = source.to_path_buf();
            blocking(move || hasher.hash_file(&src)).await?
        };
        debug!(path = %label, size = digest.byte_size, hash = %digest.content_hash, "Hashed");

        let _writer = self.writer.lock().await;

        let existing = {
            let catalog = self.catalog.clone();
            let (size, hash) = (digest.byte_size, digest.content_hash.clone());
            blocking(move || catalog.find_duplicate(size, &hash)).await?
        };
        if let Some(entry_id) = existing {
            return Ok(IngestOutcome::Ignored { entry_id });
        }

        let content_id = generate_content_id(source);
        let mime_type = mime_guess::from_path(source)
            .first()
            .map(|m| m.essence_str().to_string());

        let candidate = Candidate {
            source,
            label,
            meta,
            mtime,
            digest,
            content_id: content_id.clone(),
            mime_type,
        };
        let mut stored = StoredObjects::default();
        let result = self.store_and_commit(candidate, tags, &mut stored).await;

        match result {
            Ok(entry_id) => Ok(IngestOutcome::Added {
                entry_id,
                content_id,
            }),
            Err(Error::DuplicateEntry { entry_id }) => {
                self.rollback(&stored, &content_id).await;
                log_audit_event(AuditEvent::RolledBack {
                    path: label,
                    content_id: &content_id,
                });
                Ok(IngestOutcome::Ignored { entry_id })
            },
            Err(e) => {
                self.rollback(&stored, &content_id).await;
                Err(e)
            },
        }
    }

    async fn store_and_commit(
        &self,
        candidate: Candidate<'_>,
        tags: &[String],
        stored: &mut StoredObjects,
    ) -> Result<i64> {
        let Candidate {
            source,
            label,
            meta,
            mtime,
            digest,
            content_id,
            mime_type,
        } = candidate;

        if !self.options.dry_run {
            let store = self.store.clone();
            let (id, src) = (content_id.clone(), source.to_path_buf());
            blocking(move || store.put_file(Category::Orig, &id, &src)).await?;
            stored.original = true;
        }

        let ProbeResult {
            attributes: probed,
            thumbnail,
        } = match MediaKind::from_mime(mime_type.as_deref()) {
            Some(kind) if self.options.probe => self.prober.probe(source, kind).await,
            _ => ProbeResult::empty(),
        };

        let mut attributes = vec![
            Attribute::new(names::PATH, label),
            Attribute::new(names::MTIME, mtime),
        ];
        attributes.extend(
            tokenize(label)
                .into_iter()
                .map(|token| Attribute::new(names::TAG, token)),
        );
        attributes.extend(
            tags.iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(|t| Attribute::new(names::TAG, t)),
        );
        let probed_timestamp = probed
            .iter()
            .find(|a| a.name == names::TIMESTAMP)
            .map(|a| a.value.clone());
        attributes.extend(probed);
        let timestamp = match probed_timestamp {
            Some(ts) => ts,
            None => {
                let created = meta
                    .created()
                    .or_else(|_| meta.modified())
                    .map_err(|e| Error::unreadable(source, e))?;
                let ts = format_time(created);
                attributes.push(Attribute::new(names::TIMESTAMP, &ts));
                ts
            },
        };

        if let Some(bytes) = thumbnail
            && !self.options.dry_run
        {
            let store = self.store.clone();
            let thumb = thumbnail_id(&content_id);
            blocking(move || store.put(Category::Thumb, &thumb, &bytes)).await?;
            stored.thumbnail = true;
        }

        let entry = NewEntry {
            content_id,
            mime_type,
            byte_size: digest.byte_size,
            content_hash: digest.content_hash,
            timestamp: Some(timestamp),
        };
        let catalog = self.catalog.clone();
        blocking(move || catalog.commit_entry(&entry, &attributes, ACTION_ADD)).await
    }

    /// Best-effort removal of objects written for an entry that was never
    /// committed.
    async fn rollback(&self, stored: &StoredObjects, content_id: &str) {
        let mut targets = Vec::new();
        if stored.original {
            targets.push((Category::Orig, content_id.to_string()));
        }
        if stored.thumbnail {
            targets.push((Category::Thumb, thumbnail_id(content_id)));
        }
        if targets.is_empty() {
            return;
        }

        let store = self.store.clone();
        let removed = blocking(move || {
            for (category, id) in &targets {
                store.remove(*category, id)?;
            }
            Ok(())
        })
        .await;
        if let Err(e) = removed {
            tracing::warn!(%content_id, error = %e, "Failed to remove uncommitted objects");
        }
    }
}

/// A new file that passed the dedup check.
struct Candidate<'a> {
    source: &'a Path,
    label: &'a str,
    meta: std::fs::Metadata,
    mtime: String,
    digest: ContentDigest,
    content_id: String,
    mime_type: Option<String>,
}

/// Objects written so far for a candidate, for rollback.
#[derive(Debug, Default)]
struct StoredObjects {
    original: bool,
    thumbnail: bool,
}

/// Run blocking filesystem or catalog work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Prober returning fixed attributes and thumbnail, counting calls.
    #[derive(Default)]
    struct FakeProber {
        calls: AtomicUsize,
        timestamp: Option<&'static str>,
    }

    #[async_trait]
    impl MediaProber for FakeProber {
        async fn probe(&self, _path: &Path, _kind: MediaKind) -> ProbeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut attributes = vec![
                Attribute::new(names::WIDTH, 4),
                Attribute::new(names::HEIGHT, 3),
            ];
            if let Some(ts) = self.timestamp {
                attributes.push(Attribute::new(names::TIMESTAMP, ts));
            }
            ProbeResult {
                attributes,
                thumbnail: Some(b"jpeg-bytes".to_vec()),
            }
        }
    }

    struct Fixture {
        tmp: TempDir,
        store: ContentStore,
        catalog: Catalog,
        prober: Arc<FakeProber>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_prober(FakeProber::default())
        }

        fn with_prober(prober: FakeProber) -> Self {
            let tmp = TempDir::new().unwrap();
            let store = ContentStore::open(tmp.path().join("archive")).unwrap();
            let catalog = Catalog::memory().unwrap();
            Self {
                tmp,
                store,
                catalog,
                prober: Arc::new(prober),
            }
        }

        fn pipeline(&self, options: IngestOptions) -> IngestPipeline {
            IngestPipeline::new(
                self.catalog.clone(),
                self.store.clone(),
                self.prober.clone(),
                options,
            )
        }

        fn source(&self, rel: &str, content: &[u8]) -> std::path::PathBuf {
            let path = self.tmp.path().join("incoming").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn stored_files(&self) -> usize {
            walkdir::WalkDir::new(self.store.root())
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .count()
        }
    }

    fn tag_values(attrs: &[Attribute]) -> Vec<&str> {
        attrs
            .iter()
            .filter(|a| a.name == names::TAG)
            .map(|a| a.value.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_add_then_duplicate_is_ignored() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(IngestOptions::default());
        let a = fx.source("a.bin", b"same bytes");
        let b = fx.source("copy/b.bin", b"same bytes");

        let first = pipeline.ingest(&a, &[]).await.unwrap();
        let IngestOutcome::Added { entry_id, content_id } = &first else {
            panic!("expected Added, got {first:?}");
        };
        assert!(content_id.ends_with(".bin"));

        let second = pipeline.ingest(&b, &[]).await.unwrap();
        assert_eq!(second, IngestOutcome::Ignored { entry_id: *entry_id });

        let again = pipeline.ingest(&a, &[]).await.unwrap();
        assert_eq!(again.entry_id(), *entry_id);

        assert_eq!(fx.catalog.stats().unwrap().entries, 1);
        let actions: Vec<_> = fx
            .catalog
            .logs_for(*entry_id)
            .unwrap()
            .into_iter()
            .map(|l| l.action)
            .collect();
        assert_eq!(actions, vec![ACTION_ADD]);
        assert!(fx.store.exists(Category::Orig, content_id));
    }

    #[tokio::test]
    async fn test_same_size_different_content_is_added() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(IngestOptions::default());

        let a = pipeline.ingest(&fx.source("a.bin", b"aaaa"), &[]).await.unwrap();
        let b = pipeline.ingest(&fx.source("b.bin", b"bbbb"), &[]).await.unwrap();
        assert!(matches!(a, IngestOutcome::Added { .. }));
        assert!(matches!(b, IngestOutcome::Added { .. }));
        assert_ne!(a.entry_id(), b.entry_id());
    }

    #[tokio::test]
    async fn test_attribute_order() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(IngestOptions::default());
        let source = fx.source("2024 trip/beach.jpg", b"not really a jpeg");

        let outcome = pipeline
            .ingest(&source, &["family".to_string()])
            .await
            .unwrap();
        let entry = fx.catalog.get_entry(outcome.entry_id()).unwrap();
        let attrs = &entry.attributes;

        let label = source.to_string_lossy().into_owned();
        let mut expected = vec![(names::PATH.to_string(), label.clone())];
        expected.extend(tokenize(&label).into_iter().map(|t| (names::TAG.to_string(), t)));
        expected.push((names::TAG.to_string(), "family".to_string()));
        expected.push((names::WIDTH.to_string(), "4".to_string()));
        expected.push((names::HEIGHT.to_string(), "3".to_string()));

        // mtime and timestamp values depend on the clock; compare names only.
        assert_eq!(attrs[1].name, names::MTIME);
        assert_eq!(attrs.last().unwrap().name, names::TIMESTAMP);
        let actual: Vec<(String, String)> = attrs
            .iter()
            .filter(|a| a.name != names::MTIME && a.name != names::TIMESTAMP)
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        assert_eq!(actual, expected);
        assert_eq!(attrs.len(), expected.len() + 2);

        let tags = tag_values(attrs);
        assert_eq!(
            tags[tags.len() - 5..],
            ["2024", "trip", "beach", "jpg", "family"]
        );

        // Synthesized timestamp is also the entry's ordering timestamp.
        assert_eq!(entry.timestamp.as_deref(), entry.attr(names::TIMESTAMP));
        assert_eq!(entry.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(fx.prober.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prober_timestamp_is_not_overridden() {
        let fx = Fixture::with_prober(FakeProber {
            timestamp: Some("2001-02-03 04:05:06"),
            ..FakeProber::default()
        });
        let pipeline = fx.pipeline(IngestOptions::default());

        let outcome = pipeline
            .ingest(&fx.source("shot.png", b"png"), &[])
            .await
            .unwrap();
        let entry = fx.catalog.get_entry(outcome.entry_id()).unwrap();

        assert_eq!(entry.timestamp.as_deref(), Some("2001-02-03 04:05:06"));
        assert_eq!(entry.attrs(names::TIMESTAMP).count(), 1);
    }

    #[tokio::test]
    async fn test_thumbnail_is_stored() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(IngestOptions::default());

        let outcome = pipeline
            .ingest(&fx.source("clip.mp4", b"video"), &[])
            .await
            .unwrap();
        let IngestOutcome::Added { content_id, .. } = outcome else {
            panic!("expected Added");
        };

        let thumb = fx
            .store
            .resolve(Category::Thumb, &thumbnail_id(&content_id))
            .unwrap();
        assert_eq!(fs::read(thumb).unwrap(), b"jpeg-bytes");
        let orig = fx.store.resolve(Category::Orig, &content_id).unwrap();
        assert_eq!(fs::read(orig).unwrap(), b"video");
    }

    #[tokio::test]
    async fn test_non_media_is_not_probed() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(IngestOptions::default());

        let outcome = pipeline
            .ingest(&fx.source("notes.txt", b"hello"), &[])
            .await
            .unwrap();
        let entry = fx.catalog.get_entry(outcome.entry_id()).unwrap();

        assert_eq!(fx.prober.calls.load(Ordering::SeqCst), 0);
        assert_eq!(entry.attr(names::WIDTH), None);
        assert!(entry.attr(names::TIMESTAMP).is_some());
    }

    #[tokio::test]
    async fn test_probing_disabled() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(IngestOptions {
            probe: false,
            ..IngestOptions::default()
        });

        pipeline
            .ingest(&fx.source("pic.jpg", b"jpg"), &[])
            .await
            .unwrap();
        assert_eq!(fx.prober.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dry_run_writes_no_objects() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(IngestOptions {
            dry_run: true,
            ..IngestOptions::default()
        });

        let outcome = pipeline
            .ingest(&fx.source("pic.jpg", b"jpg bytes"), &[])
            .await
            .unwrap();

        assert!(matches!(outcome, IngestOutcome::Added { .. }));
        assert_eq!(fx.stored_files(), 0);
        let entry = fx.catalog.get_entry(outcome.entry_id()).unwrap();
        assert_eq!(entry.byte_size, 9);
        assert_eq!(entry.attr(names::WIDTH), Some("4"));
    }

    #[tokio::test]
    async fn test_relaxed_skips_unchanged_path_and_mtime() {
        let fx = Fixture::new();
        let source = fx.source("doc.bin", b"version one");
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        fs::File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let relaxed = fx.pipeline(IngestOptions {
            relaxed: true,
            ..IngestOptions::default()
        });
        let first = relaxed.ingest(&source, &[]).await.unwrap();

        // Same size, same mtime, different bytes.
        fs::write(&source, b"version two").unwrap();
        fs::File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let second = relaxed.ingest(&source, &[]).await.unwrap();
        assert_eq!(second, IngestOutcome::Ignored { entry_id: first.entry_id() });

        // Strict mode hashes and sees the change.
        let strict = fx.pipeline(IngestOptions::default());
        let third = strict.ingest(&source, &[]).await.unwrap();
        assert!(matches!(third, IngestOutcome::Added { .. }));
    }

    #[tokio::test]
    async fn test_missing_source_is_unreadable() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(IngestOptions::default());

        let err = pipeline
            .ingest(&fx.tmp.path().join("nope.jpg"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unreadable { .. }));
        assert_eq!(fx.catalog.stats().unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_directory_source_is_rejected() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(IngestOptions::default());
        let dir = fx.tmp.path().join("a-dir");
        fs::create_dir_all(&dir).unwrap();

        assert!(pipeline.ingest(&dir, &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_add_once() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(IngestOptions::default());
        let a = fx.source("x/one.bin", b"identical");
        let b = fx.source("y/two.bin", b"identical");

        let (ra, rb) = tokio::join!(pipeline.ingest(&a, &[]), pipeline.ingest(&b, &[]));
        let outcomes = [ra.unwrap(), rb.unwrap()];

        let added = outcomes
            .iter()
            .filter(|o| matches!(o, IngestOutcome::Added { .. }))
            .count();
        assert_eq!(added, 1);
        assert_eq!(outcomes[0].entry_id(), outcomes[1].entry_id());
        assert_eq!(fx.stored_files(), 1);
    }
}
