//! Production index downloader
//!
//! `http(s)://` repositories are fetched with a [`SecureHttpClient`] built
//! from the entry's TLS options and credentials. `file://` repositories are
//! read straight from disk, which is how local and test repositories work.

use async_trait::async_trait;
use tracing::debug;

use crate::backend::IndexDownloader;
use crate::config::{RepositoryEntry, RepositoryScheme};
use crate::credentials::SecureHttpClient;
use crate::error::{RepoError, Result};

/// Downloads `<url>/index.yaml` over HTTP or from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpIndexDownloader;

impl HttpIndexDownloader {
    pub fn new() -> Self {
        Self
    }

    async fn fetch_http(&self, entry: &RepositoryEntry) -> Result<Vec<u8>> {
        let client = SecureHttpClient::for_entry(entry)?;
        let index_url = entry.index_url();
        debug!("Downloading {}", index_url);
        client.get_bytes(&index_url).await
    }

    async fn fetch_file(&self, entry: &RepositoryEntry) -> Result<Vec<u8>> {
        let url = url::Url::parse(&entry.url).map_err(|e| RepoError::InvalidRepositoryUrl {
            url: entry.url.clone(),
            reason: e.to_string(),
        })?;
        let dir = url
            .to_file_path()
            .map_err(|_| RepoError::InvalidRepositoryUrl {
                url: entry.url.clone(),
                reason: "not a local file path".to_string(),
            })?;

        let path = dir.join("index.yaml");
        debug!("Reading {}", path.display());
        tokio::fs::read(&path)
            .await
            .map_err(|e| RepoError::io(path, e))
    }
}

#[async_trait]
impl IndexDownloader for HttpIndexDownloader {
    async fn fetch_index(&self, entry: &RepositoryEntry) -> Result<Vec<u8>> {
        match entry.scheme()? {
            RepositoryScheme::Http => self.fetch_http(entry).await,
            RepositoryScheme::File => self.fetch_file(entry).await,
        }
    }
}
