//! One configured repository, bound to its cache location

use std::path::PathBuf;
use tracing::debug;

use crate::backend::IndexDownloader;
use crate::cache::RepositoryCache;
use crate::config::RepositoryEntry;
use crate::error::Result;
use crate::index::IndexFile;

/// A repository entry together with where its index is cached
#[derive(Debug, Clone)]
pub struct RepositoryConnector {
    entry: RepositoryEntry,
    cache: RepositoryCache,
}

impl RepositoryConnector {
    pub fn new(entry: RepositoryEntry, cache: RepositoryCache) -> Self {
        Self { entry, cache }
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn url(&self) -> &str {
        &self.entry.url
    }

    /// Cached index path of this repository
    pub fn cache_path(&self) -> PathBuf {
        self.cache.index_path(&self.entry.name)
    }

    /// Download, validate and cache the remote index
    ///
    /// Nothing is written unless the downloaded document parses as an index.
    /// Returns the path of the cached index.
    pub async fn download_index(&self, downloader: &dyn IndexDownloader) -> Result<PathBuf> {
        let raw = downloader.fetch_index(&self.entry).await?;
        let index = IndexFile::from_bytes(&raw, &self.entry.index_url())?;
        debug!(
            "Fetched {} chart versions from {}",
            index.len(),
            self.entry.url
        );
        self.cache.store(&self.entry.name, &raw, &index)
    }
}
