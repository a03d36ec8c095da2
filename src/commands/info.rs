//! `mediavault <root> info`

use anyhow::Result;

use mediavault::Archive;
use mediavault::archive::{catalog_path, config_path};
use mediavault::store::Category;
use mediavault::utils::format_bytes;

/// Execute the info command.
pub fn execute(archive: &Archive) -> Result<()> {
    let stats = archive.catalog().stats()?;
    let root = archive.root();
    let config = archive.config();

    println!("Archive");
    println!("=======");
    println!("Root:        {}", root.display());
    println!("Catalog:     {}", catalog_path(root).display());
    println!("Originals:   {}", archive.category_dir(Category::Orig).display());
    println!("Thumbnails:  {}", archive.category_dir(Category::Thumb).display());
    let config_file = config_path(root);
    if config_file.is_file() {
        println!("Config:      {}", config_file.display());
    } else {
        println!("Config:      (defaults)");
    }

    println!();
    println!("Entries:     {}", stats.entries);
    println!("Total size:  {}", format_bytes(stats.total_bytes));

    println!();
    println!(
        "Probing:     {}",
        if config.probe.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "Ingest mode: {}",
        if config.ingest.relaxed {
            "relaxed (path + mtime)"
        } else {
            "strict (hash)"
        }
    );
    Ok(())
}
