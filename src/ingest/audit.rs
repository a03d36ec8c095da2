//! Structured audit events for ingestion.
//!
//! Every file that reaches a final state emits one event on the `audit`
//! target, so archive changes can be filtered out of the regular log with
//! `RUST_LOG=audit=info`.

use tracing::{info, warn};

/// Ingest events worth keeping for later inspection.
#[derive(Debug, Clone)]
pub enum AuditEvent<'a> {
    /// A new entry was committed.
    Added {
        path: &'a str,
        entry_id: i64,
        content_id: &'a str,
        dry_run: bool,
    },
    /// The content was already archived.
    Ignored { path: &'a str, entry_id: i64 },
    /// Objects stored for an entry that lost a commit race were removed.
    RolledBack { path: &'a str, content_id: &'a str },
    /// The file could not be ingested.
    Failed { path: &'a str, reason: &'a str },
}

/// Log an ingest audit event with structured fields.
pub fn log_audit_event(event: AuditEvent<'_>) {
    match event {
        AuditEvent::Added {
            path,
            entry_id,
            content_id,
            dry_run,
        } => {
            info!(
                target: "audit",
                event_type = "added",
                %path,
                entry_id,
                %content_id,
                dry_run,
                "Entry added"
            );
        },
        AuditEvent::Ignored { path, entry_id } => {
            info!(
                target: "audit",
                event_type = "ignored",
                %path,
                entry_id,
                "Duplicate content ignored"
            );
        },
        AuditEvent::RolledBack { path, content_id } => {
            warn!(
                target: "audit",
                event_type = "rolled_back",
                %path,
                %content_id,
                "Concurrent duplicate, stored objects removed"
            );
        },
        AuditEvent::Failed { path, reason } => {
            warn!(
                target: "audit",
                event_type = "failed",
                %path,
                %reason,
                "Ingest failed"
            );
        },
    }
}
