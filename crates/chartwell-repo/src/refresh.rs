//! Concurrent index refresh across repositories

use futures::stream::{self, FuturesUnordered, StreamExt};
use std::path::PathBuf;
use tracing::debug;

use crate::backend::IndexDownloader;
use crate::connector::RepositoryConnector;
use crate::error::Result;

/// Result of refreshing one repository
#[derive(Debug)]
pub struct RefreshOutcome {
    pub name: String,
    pub url: String,
    /// Cached index path on success
    pub result: Result<PathBuf>,
}

impl RefreshOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of a refresh, in completion order
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub outcomes: Vec<RefreshOutcome>,
}

impl UpdateReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &RefreshOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &RefreshOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(RefreshOutcome::is_success)
    }

    /// Outcome of a repository by name
    pub fn outcome(&self, name: &str) -> Option<&RefreshOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

/// Drives one download per repository and collects every outcome
///
/// A failing repository never cancels or fails the others.
pub struct IndexRefresher<'a> {
    downloader: &'a dyn IndexDownloader,
    max_concurrency: Option<usize>,
}

impl<'a> IndexRefresher<'a> {
    pub fn new(downloader: &'a dyn IndexDownloader) -> Self {
        Self {
            downloader,
            max_concurrency: None,
        }
    }

    /// Limit the number of downloads in flight
    #[must_use]
    pub fn with_max_concurrency(mut self, max: Option<usize>) -> Self {
        self.max_concurrency = max.filter(|&n| n > 0);
        self
    }

    pub async fn refresh(&self, connectors: &[RepositoryConnector]) -> UpdateReport {
        let outcomes = match self.max_concurrency {
            Some(limit) => {
                stream::iter(connectors.iter().map(|c| self.refresh_one(c)))
                    .buffer_unordered(limit)
                    .collect::<Vec<_>>()
                    .await
            }
            None => {
                connectors
                    .iter()
                    .map(|c| self.refresh_one(c))
                    .collect::<FuturesUnordered<_>>()
                    .collect::<Vec<_>>()
                    .await
            }
        };

        UpdateReport { outcomes }
    }

    async fn refresh_one(&self, connector: &RepositoryConnector) -> RefreshOutcome {
        let result = connector.download_index(self.downloader).await;

        match &result {
            Ok(path) => debug!("Refreshed {} into {}", connector.name(), path.display()),
            Err(e) => debug!(
                "Refreshing {} ({}) failed: {}",
                connector.name(),
                connector.url(),
                e
            ),
        }

        RefreshOutcome {
            name: connector.name().to_string(),
            url: connector.url().to_string(),
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockDownloader;
    use crate::cache::RepositoryCache;
    use crate::config::RepositoryEntry;
    use crate::error::RepoError;
    use tempfile::TempDir;

    const INDEX: &str = "apiVersion: v1\nentries: {}\n";

    fn connectors(cache: &RepositoryCache, repos: &[(&str, &str)]) -> Vec<RepositoryConnector> {
        repos
            .iter()
            .map(|(name, url)| RepositoryConnector::new(RepositoryEntry::new(*name, *url), cache.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let temp = TempDir::new().unwrap();
        let cache = RepositoryCache::new(temp.path());
        let mock = MockDownloader::new()
            .with_index("https://a.example.com", INDEX)
            .with_failure("https://b.example.com", 500, "internal error");

        let report = IndexRefresher::new(&mock)
            .refresh(&connectors(
                &cache,
                &[("a", "https://a.example.com"), ("b", "https://b.example.com")],
            ))
            .await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(!report.all_succeeded());
        assert!(report.outcome("a").unwrap().is_success());
        assert!(cache.contains("a"));

        let b = report.outcome("b").unwrap();
        assert_eq!(b.url, "https://b.example.com");
        assert!(matches!(b.result, Err(RepoError::HttpError { status: 500, .. })));
        assert!(!cache.contains("b"));
    }

    #[tokio::test]
    async fn test_bounded_concurrency_refreshes_everything() {
        let temp = TempDir::new().unwrap();
        let cache = RepositoryCache::new(temp.path());
        let repos = [
            ("a", "https://a.example.com"),
            ("b", "https://b.example.com"),
            ("c", "https://c.example.com"),
        ];
        let mock = repos
            .iter()
            .fold(MockDownloader::new(), |m, (_, url)| m.with_index(url, INDEX));

        let report = IndexRefresher::new(&mock)
            .with_max_concurrency(Some(1))
            .refresh(&connectors(&cache, &repos))
            .await;

        assert!(report.all_succeeded());
        assert_eq!(report.succeeded().count(), 3);
        assert_eq!(report.failed().count(), 0);
        assert_eq!(mock.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_refresh() {
        let mock = MockDownloader::new();
        let report = IndexRefresher::new(&mock).refresh(&[]).await;
        assert!(report.outcomes.is_empty());
        assert!(report.all_succeeded());
    }
}
