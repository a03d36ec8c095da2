//! Sharded, content-addressed object store.
//!
//! Objects live under the archive root in one directory per [`Category`]:
//!
//! ```text
//! <root>/orig/<id[0..2]>/<id>
//! <root>/thumb/<id[0..2]>/<basename>.jpg
//! ```
//!
//! The two-character shard keeps directory fan-out bounded. Path resolution
//! is a pure function of the id and never lists a directory.
//!
//! Writes go to a temporary file inside the shard directory and are renamed
//! into place, so a reader never observes a half-written object.

mod validation;

pub use validation::{generate_content_id, thumbnail_id, validate_content_id};

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::constants::{ORIG_DIR, SHARD_PREFIX_LEN, THUMB_DIR};
use crate::error::{Error, Result};

/// Kind of stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Original media bytes.
    Orig,
    /// Generated thumbnail.
    Thumb,
}

impl Category {
    /// Directory name under the archive root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Orig => ORIG_DIR,
            Self::Thumb => THUMB_DIR,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            ORIG_DIR => Ok(Self::Orig),
            THUMB_DIR => Ok(Self::Thumb),
            other => Err(Error::malformed(format!("unknown category '{other}'"))),
        }
    }
}

/// Filesystem object store rooted at the archive directory.
///
/// `ContentStore` is `Clone` and cheap to share; it holds no open handles.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Opens the store, creating the category directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a category directory cannot be created.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for category in [Category::Orig, Category::Thumb] {
            let dir = root.join(category.dir_name());
            fs::create_dir_all(&dir)
                .map_err(|e| Error::io(format!("create {} directory", category), e))?;
        }
        Ok(Self { root })
    }

    /// Archive root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding all objects of `category`.
    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    /// Compute the shard path of an object.
    ///
    /// Pure: depends only on `category` and `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is shorter than 3 characters. Ids from untrusted input
    /// must go through [`validate_content_id`] first.
    pub fn shard_path(&self, category: Category, id: &str) -> PathBuf {
        let split = id
            .char_indices()
            .nth(SHARD_PREFIX_LEN)
            .map(|(idx, _)| idx);
        let Some(split) = split else {
            panic!("content id must be at least 3 characters, got {id:?}");
        };
        self.category_dir(category).join(&id[..split]).join(id)
    }

    /// Resolve an object to its path, checking that it exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no object is stored under `id`.
    pub fn resolve(&self, category: Category, id: &str) -> Result<PathBuf> {
        let path = self.shard_path(category, id);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::not_found(format!("{category}/{id}")))
        }
    }

    /// Returns `true` if an object is stored under `id`.
    pub fn exists(&self, category: Category, id: &str) -> bool {
        self.shard_path(category, id).is_file()
    }

    /// Store `data` under `id`, replacing any existing object.
    ///
    /// # Errors
    ///
    /// Returns an error if the shard directory cannot be created or the
    /// object cannot be written.
    pub fn put(&self, category: Category, id: &str, data: &[u8]) -> Result<PathBuf> {
        self.write_atomic(category, id, |tmp| tmp.write_all(data))
    }

    /// Store a copy of the file at `source` under `id`.
    ///
    /// The copy is streamed; the source is never loaded whole. Returns the
    /// number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreadable`] if the source cannot be opened, or an
    /// IO error if the object cannot be written.
    pub fn put_file(&self, category: Category, id: &str, source: &Path) -> Result<u64> {
        let mut src = File::open(source).map_err(|e| Error::unreadable(source, e))?;
        let mut copied = 0u64;
        self.write_atomic(category, id, |tmp| {
            copied = io::copy(&mut src, tmp)?;
            Ok(())
        })?;
        Ok(copied)
    }

    /// Remove an object. Returns `false` if it did not exist.
    ///
    /// Only used to roll back objects whose catalog insert was rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove(&self, category: Category, id: &str) -> Result<bool> {
        let path = self.shard_path(category, id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(format!("remove {category}/{id}"), e)),
        }
    }

    /// Write an object through a temp file in its shard directory, then
    /// rename it into place.
    fn write_atomic<F>(&self, category: Category, id: &str, fill: F) -> Result<PathBuf>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let path = self.shard_path(category, id);
        let Some(shard_dir) = path.parent() else {
            return Err(Error::io(
                format!("resolve shard for {category}/{id}"),
                io::Error::from(io::ErrorKind::InvalidInput),
            ));
        };
        fs::create_dir_all(shard_dir)
            .map_err(|e| Error::io(format!("create shard for {category}/{id}"), e))?;

        let mut tmp = NamedTempFile::with_prefix_in(".incoming-", shard_dir)
            .map_err(|e| Error::io(format!("create temp file for {category}/{id}"), e))?;
        fill(tmp.as_file_mut())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Error::io(format!("write {category}/{id}"), e))?;
        tmp.persist(&path)
            .map_err(|e| Error::io(format!("persist {category}/{id}"), e.error))?;

        debug!(%category, %id, "Stored object");
        Ok(path)
    }
}
