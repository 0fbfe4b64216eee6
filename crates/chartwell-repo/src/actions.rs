//! Caller-facing repository operations
//!
//! Each function is one complete command: it takes the settings and
//! collaborators it needs, does its work and returns a typed outcome.
//! Mutations of the registry file (`repo_add`, `repo_remove`) run under the
//! registry [`FileLock`]; reads (`repo_list`, `search_repo`) never lock.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::backend::IndexDownloader;
use crate::cache::RepositoryCache;
use crate::config::{RegistryFile, RepositoryEntry, validate_repository_url};
use crate::connector::RepositoryConnector;
use crate::error::{RepoError, Result};
use crate::filelock::FileLock;
use crate::index::IndexFile;
use crate::local::{IndexOptions, LocalIndexBuilder};
use crate::refresh::{IndexRefresher, UpdateReport};
use crate::search::{SearchEngine, SearchIndex, SearchOptions, SearchOutput};
use crate::settings::RepoSettings;

/// Asks the user for a password that was not given
pub trait PasswordPrompt: Send + Sync {
    /// `None` leaves the password blank
    fn prompt_password(&self, username: &str, url: &str) -> Result<Option<String>>;
}

/// Never prompts; missing passwords stay blank
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl PasswordPrompt for NoPrompt {
    fn prompt_password(&self, _username: &str, _url: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Parameters of [`repo_add`]
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub name: String,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pass_credentials_all: bool,
    pub ca_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub insecure_skip_tls_verify: bool,
    /// Replace an existing, differently configured repository
    pub force_update: bool,
    /// Accept URLs of permanently retired repositories
    pub allow_deprecated_repos: bool,
}

impl AddOptions {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    fn entry(&self, password: Option<String>) -> RepositoryEntry {
        let mut entry = RepositoryEntry::new(&self.name, &self.url)
            .with_credentials(self.username.clone(), password)
            .with_tls(
                self.ca_file.clone(),
                self.cert_file.clone(),
                self.key_file.clone(),
            );
        entry.insecure_skip_tls_verify = self.insecure_skip_tls_verify;
        entry.pass_credentials_all = self.pass_credentials_all;
        entry
    }
}

/// What [`repo_add`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new repository was registered
    Added,
    /// An existing repository was replaced (`force_update`)
    Updated,
    /// The identical repository was already registered
    Unchanged,
}

/// Register a repository after checking that its index can be downloaded
pub async fn repo_add(
    settings: &RepoSettings,
    options: &AddOptions,
    downloader: &dyn IndexDownloader,
    prompt: &dyn PasswordPrompt,
) -> Result<AddOutcome> {
    validate_repository_name(&options.name)?;
    validate_repository_url(&options.url, options.allow_deprecated_repos)?;

    let config_path = &settings.repository_config;
    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| RepoError::io(parent, e))?;
    }

    let _lock = FileLock::acquire(&settings.lock_path(), settings.lock).await?;

    let mut registry = RegistryFile::load_or_default(config_path)?;

    let mut password = options.password.clone().filter(|p| !p.is_empty());
    if let Some(username) = options.username.as_deref().filter(|u| !u.is_empty()) {
        if password.is_none() {
            password = prompt.prompt_password(username, &options.url)?;
        }
    }

    let entry = options.entry(password);

    let existed = match registry.get(&entry.name) {
        Ok(_) if options.force_update => true,
        Ok(existing) if existing == &entry => {
            debug!("Repository {} is already configured", entry.name);
            return Ok(AddOutcome::Unchanged);
        }
        Ok(_) => {
            return Err(RepoError::RepositoryAlreadyExists {
                name: entry.name.clone(),
            });
        }
        Err(_) => false,
    };

    let connector = RepositoryConnector::new(
        entry.clone(),
        RepositoryCache::new(&settings.repository_cache),
    );
    connector
        .download_index(downloader)
        .await
        .map_err(|e| RepoError::UnreachableRepository {
            url: entry.url.clone(),
            source: Box::new(e),
        })?;

    registry.upsert(entry);
    registry.save(config_path)?;

    let outcome = if existed {
        AddOutcome::Updated
    } else {
        AddOutcome::Added
    };
    debug!("Repository {} registered ({:?})", options.name, outcome);
    Ok(outcome)
}

/// Unregister repositories and delete their cached indexes
///
/// All-or-nothing: every name is checked before anything is removed, so an
/// unknown name leaves the registry untouched. Returns the removed names.
pub async fn repo_remove(settings: &RepoSettings, names: &[String]) -> Result<Vec<String>> {
    let _lock = FileLock::acquire(&settings.lock_path(), settings.lock).await?;

    let mut registry = load_configured(&settings.repository_config)?;

    let mut seen = HashSet::new();
    let names: Vec<&String> = names.iter().filter(|n| seen.insert(n.as_str())).collect();

    for name in &names {
        registry.get(name)?;
    }

    for name in &names {
        registry.remove(name);
    }
    registry.save(&settings.repository_config)?;

    let cache = RepositoryCache::new(&settings.repository_cache);
    for name in &names {
        cache.remove(name)?;
        debug!("Removed {} and its cached index", name);
    }

    Ok(names.into_iter().cloned().collect())
}

/// Snapshot of the configured repositories
pub fn repo_list(settings: &RepoSettings) -> Result<Vec<RepositoryEntry>> {
    Ok(load_configured(&settings.repository_config)?.repositories)
}

/// Download fresh indexes for all (or the named) repositories
///
/// Individual failures are reported in the returned [`UpdateReport`]; the
/// call itself only fails when there is nothing to update.
pub async fn repo_update(
    settings: &RepoSettings,
    downloader: &dyn IndexDownloader,
    names: Option<&[String]>,
) -> Result<UpdateReport> {
    let registry = load_configured(&settings.repository_config)?;

    let entries: Vec<RepositoryEntry> = match names {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|name| registry.get(name).cloned())
            .collect::<Result<_>>()?,
        _ => registry.repositories,
    };

    let cache = RepositoryCache::new(&settings.repository_cache);
    let connectors: Vec<RepositoryConnector> = entries
        .into_iter()
        .map(|entry| RepositoryConnector::new(entry, cache.clone()))
        .collect();

    debug!("Refreshing {} repositories", connectors.len());
    let report = IndexRefresher::new(downloader)
        .with_max_concurrency(settings.max_concurrency)
        .refresh(&connectors)
        .await;

    Ok(report)
}

/// Write `<dir>/index.yaml` for a directory of chart archives
pub fn repo_index(dir: &Path, options: IndexOptions) -> Result<IndexFile> {
    LocalIndexBuilder::new(dir, options).build()
}

/// Search the cached indexes of every configured repository
pub fn search_repo(settings: &RepoSettings, options: &SearchOptions) -> Result<SearchOutput> {
    let registry = load_configured(&settings.repository_config)?;
    let cache = RepositoryCache::new(&settings.repository_cache);

    let index = SearchIndex::build(&registry, &cache)?;
    let results = SearchEngine::new(&index).search(options)?;

    Ok(SearchOutput {
        results,
        warnings: index.warnings().to_vec(),
    })
}

/// Load the registry, treating a missing or empty one as "nothing configured"
fn load_configured(path: &Path) -> Result<RegistryFile> {
    let registry = match RegistryFile::load(path) {
        Err(RepoError::RegistryNotFound { .. }) => return Err(RepoError::NoRepositories),
        other => other?,
    };
    if registry.is_empty() {
        return Err(RepoError::NoRepositories);
    }
    Ok(registry)
}

fn validate_repository_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        "name must not be empty"
    } else if name.contains('/') {
        "name must not contain '/'"
    } else if name.contains(['\\', '\0']) || name == "." || name == ".." {
        "name must be usable as a file name"
    } else {
        return Ok(());
    };

    Err(RepoError::InvalidRepositoryName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}
