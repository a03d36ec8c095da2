//! `mediavault <root> show <entryId>`

use anyhow::{Context, Result};

use mediavault::Archive;
use mediavault::catalog::names;
use mediavault::store::{Category, thumbnail_id};
use mediavault::utils::{format_bytes, format_duration};

/// Execute the show command.
pub fn execute(archive: &Archive, entry_id: i64) -> Result<()> {
    let catalog = archive.catalog();
    let entry = catalog
        .get_entry(entry_id)
        .with_context(|| format!("Entry {entry_id} not found"))?;
    let logs = catalog.logs_for(entry_id)?;
    let store = archive.store();

    println!("Entry {}", entry.entry_id);
    println!("========");
    println!("Content id:  {}", entry.content_id);
    println!(
        "Type:        {}",
        entry.mime_type.as_deref().unwrap_or("unknown")
    );
    println!(
        "Size:        {} ({} bytes)",
        format_bytes(entry.byte_size),
        entry.byte_size
    );
    println!("Hash:        {}", entry.content_hash);
    println!(
        "Timestamp:   {}",
        entry.timestamp.as_deref().unwrap_or("-")
    );
    if let Some(secs) = entry
        .attr(names::DURATION)
        .and_then(|d| d.parse::<u64>().ok())
    {
        println!("Duration:    {}", format_duration(secs));
    }

    let thumb = thumbnail_id(&entry.content_id);
    println!(
        "Original:    {}/{}{}",
        Category::Orig,
        entry.content_id,
        stored_marker(store.exists(Category::Orig, &entry.content_id))
    );
    println!(
        "Thumbnail:   {}/{}{}",
        Category::Thumb,
        thumb,
        stored_marker(store.exists(Category::Thumb, &thumb))
    );

    println!();
    println!("Attributes");
    println!("----------");
    for attr in &entry.attributes {
        println!("  {:<12} {}", attr.name, attr.value);
    }

    println!();
    println!("Log");
    println!("---");
    for log in &logs {
        println!("  {}  {}", log.timestamp, log.action);
    }
    Ok(())
}

fn stored_marker(exists: bool) -> &'static str {
    if exists { "" } else { " (not stored)" }
}
