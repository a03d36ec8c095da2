//! Catalog schema.
//!
//! Table and column names match archives written by earlier tooling, so an
//! existing `metadata.db` opens unchanged. The unique index on
//! `(fileSize, fileHash)` is what makes duplicate entries impossible to
//! commit.

pub(crate) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS Entries (
  entryId INTEGER PRIMARY KEY,
  timestamp TEXT,
  fileName TEXT,
  fileType TEXT,
  fileSize INTEGER,
  fileHash TEXT);

CREATE TABLE IF NOT EXISTS Attrs (
  entryId INTEGER,
  attrName TEXT,
  attrValue TEXT);

CREATE TABLE IF NOT EXISTS Logs (
  actionId INTEGER PRIMARY KEY,
  entryId INTEGER,
  timestamp TEXT,
  action TEXT);

CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_dedup ON Entries (fileSize, fileHash);
CREATE INDEX IF NOT EXISTS idx_entries_timestamp ON Entries (timestamp);
CREATE INDEX IF NOT EXISTS idx_attrs_entry ON Attrs (entryId);
CREATE INDEX IF NOT EXISTS idx_attrs_name_value ON Attrs (attrName, attrValue);
CREATE INDEX IF NOT EXISTS idx_logs_entry ON Logs (entryId);
";

/// Columns selected for an entry row, in the order `row_to_entry` reads them.
pub(crate) const ENTRY_COLUMNS: &str =
    "entryId, timestamp, fileName, fileType, fileSize, fileHash";
