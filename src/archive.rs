//! Archive layout and the handles opened on it.
//!
//! ```text
//! <root>/
//! ├── metadata.db        catalog
//! ├── mediavault.toml    optional configuration
//! ├── orig/<id[0..2]>/<id>
//! └── thumb/<id[0..2]>/<basename>.jpg
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::ArchiveConfig;
use crate::constants::{CATALOG_FILE, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::hasher::ContentHasher;
use crate::ingest::{IngestOptions, IngestPipeline};
use crate::probe::{MediaProber, NullProber, ToolProber};
use crate::store::{Category, ContentStore};

/// Get the catalog path: `<root>/metadata.db`
pub fn catalog_path(root: &Path) -> PathBuf {
    root.join(CATALOG_FILE)
}

/// Get the config file path: `<root>/mediavault.toml`
pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// An opened archive: object store, catalog and configuration.
pub struct Archive {
    root: PathBuf,
    config: ArchiveConfig,
    store: ContentStore,
    catalog: Catalog,
}

impl Archive {
    /// Open the archive at `root`, creating its directories and catalog if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the root or category directories cannot be
    /// created, or the catalog cannot be opened.
    pub fn open<P: AsRef<Path>>(root: P, config: ArchiveConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| Error::io("create archive root", e))?;
        let store = ContentStore::open(&root)?;
        let catalog = Catalog::open(catalog_path(&root))?;
        Ok(Self {
            root,
            config,
            store,
            catalog,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Directory holding objects of `category`.
    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.store.category_dir(category)
    }

    /// Build an ingest pipeline from the archive configuration.
    pub fn pipeline(&self) -> IngestPipeline {
        let probe = &self.config.probe;
        let prober: Arc<dyn MediaProber> = if probe.enabled {
            Arc::new(ToolProber::new(probe.clone()))
        } else {
            Arc::new(NullProber)
        };
        let options = IngestOptions {
            dry_run: self.config.ingest.dry_run,
            relaxed: self.config.ingest.relaxed,
            probe: probe.enabled,
        };
        IngestPipeline::new(self.catalog.clone(), self.store.clone(), prober, options)
            .with_hasher(ContentHasher::new(self.config.ingest.hash_chunk_size.max(1)))
    }
}
