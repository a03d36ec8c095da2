//! Batch ingestion of files and directory trees.

use std::fmt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{IngestOutcome, IngestPipeline};

/// Final state of one file in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Added { entry_id: i64, content_id: String },
    Ignored { entry_id: i64 },
    Error(String),
}

impl From<IngestOutcome> for FileStatus {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Added {
                entry_id,
                content_id,
            } => Self::Added {
                entry_id,
                content_id,
            },
            IngestOutcome::Ignored { entry_id } => Self::Ignored { entry_id },
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added { .. } => f.write_str("added"),
            Self::Ignored { .. } => f.write_str("ignored"),
            Self::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

/// Outcome for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
}

/// Per-file outcomes of [`IngestPipeline::ingest_paths`], in processing
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn added(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Added { .. }))
    }

    pub fn ignored(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Ignored { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Error(_)))
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.status)).count()
    }
}

impl IngestPipeline {
    /// Ingest every file named by `paths`.
    ///
    /// Directories are walked recursively in file-name order; entries whose
    /// name starts with `.` are skipped, along with everything below them.
    /// Symlinks are not followed. Each file is processed independently: an
    /// error is recorded in the report and the batch moves on.
    pub async fn ingest_paths(&self, paths: &[PathBuf], tags: &[String]) -> BatchReport {
        let mut report = BatchReport::default();
        for source in expand_sources(paths) {
            let (path, status) = match source {
                Ok(path) => {
                    let status = match self.ingest(&path, tags).await {
                        Ok(outcome) => outcome.into(),
                        Err(e) => FileStatus::Error(e.to_string()),
                    };
                    (path, status)
                },
                Err((path, reason)) => (path, FileStatus::Error(reason)),
            };
            report.files.push(FileReport { path, status });
        }
        report
    }
}

type Source = std::result::Result<PathBuf, (PathBuf, String)>;

/// Expand arguments into the list of files to ingest.
fn expand_sources(paths: &[PathBuf]) -> Vec<Source> {
    let mut sources = Vec::new();
    for arg in paths {
        if arg.is_dir() {
            walk_dir(arg, &mut sources);
        } else if arg.exists() {
            sources.push(Ok(arg.clone()));
        } else {
            sources.push(Err((arg.clone(), "no such file or directory".to_string())));
        }
    }
    sources
}

fn walk_dir(root: &Path, sources: &mut Vec<Source>) {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => sources.push(Ok(entry.into_path())),
            Ok(_) => {},
            Err(err) => {
                let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                sources.push(Err((path, err.to_string())));
            },
        }
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
