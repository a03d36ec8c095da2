//! CLI command implementations.
//!
//! - [`add`] - Ingest files, directories and glob patterns
//! - [`list`] - One line per entry, newest first
//! - [`show`] - Full entry with attributes and log trail
//! - [`serve`] - Range-serving HTTP endpoint
//! - [`info`] - Archive statistics and layout

pub mod add;
pub mod info;
pub mod list;
pub mod serve;
pub mod show;
