//! SQLite-backed metadata catalog.
//!
//! Holds one row per archived artifact (`Entries`), its ordered attributes
//! (`Attrs`) and an append-only action log (`Logs`).
//!
//! # Single writer
//!
//! A `Catalog` owns exactly one connection behind a mutex. Clones share that
//! connection, so every write in the process is serialized through it. The
//! unique index on `(fileSize, fileHash)` makes a duplicate insert fail at
//! the database, whatever the caller checked beforehand.
//!
//! # Example
//!
//! ```no_run
//! use mediavault::catalog::{Catalog, NewEntry};
//!
//! # fn example() -> mediavault::Result<()> {
//! let catalog = Catalog::open("archive/metadata.db")?;
//! if catalog.find_duplicate(1024, "ab12...")?.is_none() {
//!     let id = catalog.insert_entry(&NewEntry {
//!         content_id: "0f3a....jpg".into(),
//!         mime_type: Some("image/jpeg".into()),
//!         byte_size: 1024,
//!         content_hash: "ab12...".into(),
//!         timestamp: None,
//!     })?;
//!     catalog.append_log(id, "add")?;
//! }
//! for entry in catalog.list_entries() {
//!     println!("{:?}", entry?.timestamp);
//! }
//! # Ok(())
//! # }
//! ```

mod listing;
mod schema;
mod types;

pub use listing::Entries;
pub use types::{Attribute, CatalogStats, Entry, LogRecord, NewEntry, names};

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::debug;

use crate::constants::{LIST_PAGE_SIZE, TIMESTAMP_FORMAT};
use crate::error::{Error, Result};
use schema::{ENTRY_COLUMNS, SCHEMA};

/// Handle to the metadata catalog.
///
/// `Catalog` is `Clone`; clones share the same connection.
#[derive(Clone)]
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

impl Catalog {
    /// Opens or creates a file-backed catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created (for example, an existing database already holds
    /// two entries with the same dedup key).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// Creates an in-memory catalog. All data is lost on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Look up the entry holding content with this dedup key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_duplicate(&self, byte_size: u64, content_hash: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock();
        find_duplicate_in(&conn, byte_size, content_hash)
    }

    /// Look up an entry ingested from the same relative path with the same
    /// modification time and size.
    ///
    /// This is weaker than [`find_duplicate`](Self::find_duplicate): a file
    /// whose content changed while size and mtime stayed equal is reported
    /// as a duplicate. Only relaxed-mode ingestion uses it.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_duplicate_by_path_and_mtime(
        &self,
        relative_path: &str,
        mtime: &str,
        byte_size: u64,
    ) -> Result<Option<i64>> {
        let byte_size = sql_size(byte_size)?;
        let conn = self.conn.lock();
        let id = conn
            .query_row(
                "SELECT e.entryId FROM Entries e \
                 JOIN Attrs p ON p.entryId = e.entryId \
                   AND p.attrName = ?1 AND p.attrValue = ?2 \
                 JOIN Attrs m ON m.entryId = e.entryId \
                   AND m.attrName = ?3 AND m.attrValue = ?4 \
                 WHERE e.fileSize = ?5 \
                 ORDER BY e.entryId LIMIT 1",
                params![names::PATH, relative_path, names::MTIME, mtime, byte_size],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Insert a new entry and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateEntry`] with the existing id if the dedup
    /// key is already present, or a catalog error if the insert fails.
    pub fn insert_entry(&self, entry: &NewEntry) -> Result<i64> {
        let conn = self.conn.lock();
        insert_entry_in(&conn, entry)
    }

    /// Append attributes to an entry, preserving order.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; earlier attributes of the same
    /// call are rolled back.
    pub fn append_attributes(&self, entry_id: i64, attributes: &[Attribute]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        append_attributes_in(&tx, entry_id, attributes)?;
        tx.commit()?;
        Ok(())
    }

    /// Append an action to the log with the current UTC time.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn append_log(&self, entry_id: i64, action: &str) -> Result<()> {
        let conn = self.conn.lock();
        append_log_in(&conn, entry_id, action)
    }

    /// Insert an entry together with its attributes and a log line, in one
    /// transaction.
    ///
    /// Other readers never see the entry without its attributes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateEntry`] if the dedup key exists (nothing is
    /// written), or a catalog error if any statement fails.
    pub fn commit_entry(
        &self,
        entry: &NewEntry,
        attributes: &[Attribute],
        action: &str,
    ) -> Result<i64> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let entry_id = insert_entry_in(&tx, entry)?;
        append_attributes_in(&tx, entry_id, attributes)?;
        append_log_in(&tx, entry_id, action)?;
        tx.commit()?;

        debug!(
            entry_id,
            content_id = %entry.content_id,
            attributes = attributes.len(),
            "Committed entry"
        );
        Ok(entry_id)
    }

    /// Fetch an entry with its attributes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no entry has this id.
    pub fn get_entry(&self, entry_id: i64) -> Result<Entry> {
        let conn = self.conn.lock();
        let entry = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM Entries WHERE entryId = ?1"),
                [entry_id],
                row_to_entry,
            )
            .optional()?;
        let Some(mut entry) = entry else {
            return Err(Error::not_found(format!("entry {entry_id}")));
        };
        entry.attributes = load_attributes(&conn, entry_id)?;
        Ok(entry)
    }

    /// Iterate all entries, newest timestamp first.
    ///
    /// The iterator is lazy: it fetches one page at a time and releases the
    /// connection between pages. Call again to restart from the top.
    pub fn list_entries(&self) -> Entries {
        Entries::new(self.clone(), LIST_PAGE_SIZE)
    }

    /// Log records for an entry, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn logs_for(&self, entry_id: i64) -> Result<Vec<LogRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT actionId, entryId, timestamp, action FROM Logs \
             WHERE entryId = ?1 ORDER BY actionId",
        )?;
        let rows = stmt.query_map([entry_id], |row| {
            Ok(LogRecord {
                log_id: row.get(0)?,
                entry_id: row.get(1)?,
                timestamp: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                action: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Entry count and total stored bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn stats(&self) -> Result<CatalogStats> {
        let conn = self.conn.lock();
        let stats = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(fileSize), 0) FROM Entries",
            [],
            |row| {
                Ok(CatalogStats {
                    entries: read_size(row, 0)?,
                    total_bytes: read_size(row, 1)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Fetch one page of entries strictly after `after` in listing order.
    pub(crate) fn entries_page(
        &self,
        after: Option<&(String, i64)>,
        limit: usize,
    ) -> Result<Vec<Entry>> {
        const ORDER: &str = "ORDER BY COALESCE(timestamp, '') DESC, entryId DESC";

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.conn.lock();
        let mut entries = match after {
            Some((ts, id)) => {
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM Entries \
                     WHERE (COALESCE(timestamp, ''), entryId) < (?1, ?2) {ORDER} LIMIT ?3"
                ))?;
                let rows = stmt
                    .query_map(params![ts, id, limit], row_to_entry)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            },
            None => {
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM Entries {ORDER} LIMIT ?1"
                ))?;
                let rows = stmt
                    .query_map(params![limit], row_to_entry)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            },
        };

        for entry in &mut entries {
            entry.attributes = load_attributes(&conn, entry.entry_id)?;
        }
        Ok(entries)
    }
}

/// SQLite integers are signed; sizes past `i64::MAX` cannot be stored.
fn sql_size(byte_size: u64) -> Result<i64> {
    i64::try_from(byte_size)
        .map_err(|e| Error::Catalog(rusqlite::Error::ToSqlConversionFailure(Box::new(e))))
}

/// Read a non-negative integer column; NULL reads as zero.
fn read_size(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value = row.get::<_, Option<i64>>(idx)?.unwrap_or_default();
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

fn find_duplicate_in(conn: &Connection, byte_size: u64, content_hash: &str) -> Result<Option<i64>> {
    let byte_size = sql_size(byte_size)?;
    let id = conn
        .query_row(
            "SELECT entryId FROM Entries WHERE fileSize = ?1 AND fileHash = ?2",
            params![byte_size, content_hash],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn insert_entry_in(conn: &Connection, entry: &NewEntry) -> Result<i64> {
    let byte_size = sql_size(entry.byte_size)?;
    let inserted = conn.execute(
        "INSERT INTO Entries (timestamp, fileName, fileType, fileSize, fileHash) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.timestamp,
            entry.content_id,
            entry.mime_type,
            byte_size,
            entry.content_hash
        ],
    );

    match inserted {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, msg)) if e.code == ErrorCode::ConstraintViolation => {
            match find_duplicate_in(conn, entry.byte_size, &entry.content_hash)? {
                Some(entry_id) => Err(Error::DuplicateEntry { entry_id }),
                None => Err(rusqlite::Error::SqliteFailure(e, msg).into()),
            }
        },
        Err(e) => Err(e.into()),
    }
}

fn append_attributes_in(conn: &Connection, entry_id: i64, attributes: &[Attribute]) -> Result<()> {
    let mut stmt =
        conn.prepare_cached("INSERT INTO Attrs (entryId, attrName, attrValue) VALUES (?1, ?2, ?3)")?;
    for attr in attributes {
        stmt.execute(params![entry_id, attr.name, attr.value])?;
    }
    Ok(())
}

fn append_log_in(conn: &Connection, entry_id: i64, action: &str) -> Result<()> {
    let now = Utc::now().format(TIMESTAMP_FORMAT).to_string();
    conn.execute(
        "INSERT INTO Logs (entryId, timestamp, action) VALUES (?1, ?2, ?3)",
        params![entry_id, now, action],
    )?;
    Ok(())
}

fn load_attributes(conn: &Connection, entry_id: i64) -> Result<Vec<Attribute>> {
    let mut stmt = conn.prepare_cached(
        "SELECT attrName, attrValue FROM Attrs WHERE entryId = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map([entry_id], |row| {
        Ok(Attribute {
            name: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
            value: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        entry_id: row.get(0)?,
        timestamp: row.get(1)?,
        content_id: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        mime_type: row.get(3)?,
        byte_size: read_size(row, 4)?,
        content_hash: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        attributes: Vec::new(),
    })
}
