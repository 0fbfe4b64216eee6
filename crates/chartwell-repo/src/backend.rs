//! Index download seam
//!
//! Actions never talk to the network directly: they go through an
//! [`IndexDownloader`], so tests can swap in [`MockDownloader`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::RepositoryEntry;
use crate::error::{RepoError, Result};

/// Fetches the raw `index.yaml` of a repository
#[async_trait]
pub trait IndexDownloader: Send + Sync {
    /// Download the index document of `entry`
    async fn fetch_index(&self, entry: &RepositoryEntry) -> Result<Vec<u8>>;
}

#[async_trait]
impl<T: IndexDownloader + ?Sized> IndexDownloader for Arc<T> {
    async fn fetch_index(&self, entry: &RepositoryEntry) -> Result<Vec<u8>> {
        (**self).fetch_index(entry).await
    }
}

/// Canned reply of the mock downloader
#[derive(Debug, Clone)]
enum MockResponse {
    Index(Vec<u8>),
    Failure { status: u16, message: String },
}

/// In-memory downloader for testing
///
/// Responses are keyed by repository URL; unknown URLs answer 404.
#[derive(Clone, Default)]
pub struct MockDownloader {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    /// Track calls per URL for assertions
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockDownloader {
    /// Create a new mock with no responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `index` for the repository at `url`
    pub fn with_index(self, url: &str, index: impl Into<Vec<u8>>) -> Self {
        lock(&self.responses).insert(url.to_string(), MockResponse::Index(index.into()));
        self
    }

    /// Fail downloads of the repository at `url` with an HTTP status
    pub fn with_failure(self, url: &str, status: u16, message: &str) -> Self {
        lock(&self.responses).insert(
            url.to_string(),
            MockResponse::Failure {
                status,
                message: message.to_string(),
            },
        );
        self
    }

    /// Number of downloads attempted for `url`
    pub fn calls(&self, url: &str) -> usize {
        lock(&self.calls).get(url).copied().unwrap_or(0)
    }

    /// Total number of downloads attempted
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }
}

#[async_trait]
impl IndexDownloader for MockDownloader {
    async fn fetch_index(&self, entry: &RepositoryEntry) -> Result<Vec<u8>> {
        *lock(&self.calls).entry(entry.url.clone()).or_default() += 1;

        let response = lock(&self.responses).get(&entry.url).cloned();
        match response {
            Some(MockResponse::Index(bytes)) => Ok(bytes),
            Some(MockResponse::Failure { status, message }) => {
                Err(RepoError::HttpError { status, message })
            }
            None => Err(RepoError::HttpError {
                status: 404,
                message: format!("Request to {} failed", entry.index_url()),
            }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
