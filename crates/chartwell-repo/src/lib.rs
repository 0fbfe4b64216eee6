//! Chartwell Repository Management
//!
//! This crate manages the local registry of chart repositories and searches
//! the indexes they publish:
//!
//! - **Registry file**: Helm-compatible `repositories.yaml`, mutated only
//!   under a cross-process file lock
//! - **Index refresh**: concurrent downloads with per-repository failure
//!   isolation, cached as `<name>-index.yaml`
//! - **Local indexing**: `index.yaml` generation for a directory of `.tgz`
//!   archives, with optional merge into an existing index
//! - **Search**: ranked free-text or regex search over every cached index,
//!   filtered by semantic version constraints
//!
//! ## Example
//!
//! ```rust,no_run
//! use chartwell_repo::{
//!     AddOptions, HttpIndexDownloader, NoPrompt, RepoSettings, SearchOptions,
//!     repo_add, search_repo,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = RepoSettings::resolve(None, None)?;
//! let downloader = HttpIndexDownloader::new();
//!
//! // Register a repository (downloads and caches its index)
//! let options = AddOptions::new("bitnami", "https://charts.bitnami.com/bitnami");
//! repo_add(&settings, &options, &downloader, &NoPrompt).await?;
//!
//! // Search every cached index
//! let output = search_repo(&settings, &SearchOptions::new(["nginx"]))?;
//! for result in output.results {
//!     println!("{} {}", result.qualified_name(), result.chart_version);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Notes
//!
//! - Credentials are NEVER sent after cross-origin redirects unless the
//!   repository sets `pass_credentials_all`
//! - Registry and cache files are replaced atomically

pub mod actions;
pub mod backend;
pub mod cache;
pub mod config;
pub mod connector;
pub mod constraint;
pub mod credentials;
pub mod error;
pub mod filelock;
mod fsutil;
pub mod http;
pub mod index;
pub mod local;
pub mod refresh;
pub mod search;
pub mod settings;

// Re-exports for convenience
pub use actions::{
    AddOptions, AddOutcome, NoPrompt, PasswordPrompt, repo_add, repo_index, repo_list,
    repo_remove, repo_update, search_repo,
};
pub use backend::{IndexDownloader, MockDownloader};
pub use cache::RepositoryCache;
pub use config::{RegistryFile, RepositoryEntry, RepositoryScheme};
pub use connector::RepositoryConnector;
pub use constraint::VersionConstraint;
pub use credentials::{BasicAuth, ScopedCredentials, SecureHttpClient};
pub use error::{ErrorKind, RepoError, Result};
pub use filelock::{FileLock, FileLockGuard};
pub use http::HttpIndexDownloader;
pub use index::{ChartVersion, IndexFile};
pub use local::{IndexOptions, LocalIndexBuilder};
pub use refresh::{IndexRefresher, RefreshOutcome, UpdateReport};
pub use search::{
    CacheWarning, SearchEngine, SearchIndex, SearchOptions, SearchOutput, SearchResult,
};
pub use settings::{LockOptions, RepoSettings};
