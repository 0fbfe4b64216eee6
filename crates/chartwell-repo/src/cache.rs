//! On-disk cache of downloaded repository indexes
//!
//! Layout under the cache root, one pair of files per repository:
//!
//! ```text
//! <cache>/
//! ├── bitnami-index.yaml   # the index as downloaded
//! └── bitnami-charts.txt   # chart names, one per line
//! ```

use std::path::PathBuf;
use tracing::debug;

use crate::error::Result;
use crate::fsutil::{remove_if_exists, write_atomic};
use crate::index::IndexFile;

/// Cached index files for every repository, rooted at one directory
#[derive(Debug, Clone)]
pub struct RepositoryCache {
    root: PathBuf,
}

impl RepositoryCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the cached index of a repository
    pub fn index_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}-index.yaml", name))
    }

    /// Path of the chart name listing of a repository
    pub fn charts_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}-charts.txt", name))
    }

    /// Store a freshly downloaded index
    ///
    /// `raw` is written as received; `index` is its parsed form and only
    /// feeds the chart listing. Both files are replaced atomically.
    pub fn store(&self, name: &str, raw: &[u8], index: &IndexFile) -> Result<PathBuf> {
        let index_path = self.index_path(name);
        write_atomic(&index_path, raw)?;

        let mut listing = index.chart_names().join("\n");
        listing.push('\n');
        write_atomic(&self.charts_path(name), listing.as_bytes())?;

        debug!("Cached index of {} at {}", name, index_path.display());
        Ok(index_path)
    }

    /// Load the cached index of a repository
    pub fn load(&self, name: &str) -> Result<IndexFile> {
        IndexFile::load(&self.index_path(name))
    }

    /// Check if a cached index exists
    pub fn contains(&self, name: &str) -> bool {
        self.index_path(name).is_file()
    }

    /// Delete both cache files of a repository; absent files are fine
    pub fn remove(&self, name: &str) -> Result<()> {
        for path in [self.index_path(name), self.charts_path(name)] {
            if remove_if_exists(&path)? {
                debug!("Removed {}", path.display());
            }
        }
        Ok(())
    }
}
