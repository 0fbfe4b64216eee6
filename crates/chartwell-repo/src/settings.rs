//! Per-invocation settings
//!
//! Every action takes a [`RepoSettings`] explicitly; nothing is read from
//! process-wide state after it has been built.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RepoError, Result};

/// Environment variable overriding the registry file location
pub const REPOSITORY_CONFIG_ENV: &str = "CHARTWELL_REPOSITORY_CONFIG";

/// Environment variable overriding the cache directory
pub const REPOSITORY_CACHE_ENV: &str = "CHARTWELL_REPOSITORY_CACHE";

/// Timing of the registry lock acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// Delay between two acquisition attempts
    pub poll_interval: Duration,
    /// Give up after this long
    pub timeout: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Locations and limits used by every repository action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSettings {
    /// Path of the registry file (`repositories.yaml`)
    pub repository_config: PathBuf,
    /// Directory holding cached `<name>-index.yaml` files
    pub repository_cache: PathBuf,
    pub lock: LockOptions,
    /// Cap on concurrent index downloads, unbounded when `None`
    pub max_concurrency: Option<usize>,
}

impl RepoSettings {
    /// Settings rooted at explicit paths
    pub fn new(repository_config: impl Into<PathBuf>, repository_cache: impl Into<PathBuf>) -> Self {
        Self {
            repository_config: repository_config.into(),
            repository_cache: repository_cache.into(),
            lock: LockOptions::default(),
            max_concurrency: None,
        }
    }

    /// Resolve settings from explicit overrides, then environment, then defaults
    pub fn resolve(config: Option<PathBuf>, cache: Option<PathBuf>) -> Result<Self> {
        let repository_config = match config.or_else(|| env_path(REPOSITORY_CONFIG_ENV)) {
            Some(path) => path,
            None => Self::default_config_path()?,
        };
        let repository_cache = match cache.or_else(|| env_path(REPOSITORY_CACHE_ENV)) {
            Some(path) => path,
            None => Self::default_cache_path()?,
        };

        Ok(Self::new(repository_config, repository_cache))
    }

    /// Default registry path (`<config dir>/chartwell/repositories.yaml`)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| RepoError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("chartwell").join("repositories.yaml"))
    }

    /// Default cache path (`<cache dir>/chartwell/repository`)
    pub fn default_cache_path() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir().ok_or_else(|| RepoError::InvalidConfig {
            message: "Could not determine cache directory".to_string(),
        })?;
        Ok(cache_dir.join("chartwell").join("repository"))
    }

    #[must_use]
    pub fn with_lock(mut self, lock: LockOptions) -> Self {
        self.lock = lock;
        self
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, max: Option<usize>) -> Self {
        self.max_concurrency = max.filter(|&n| n > 0);
        self
    }

    /// Lock file guarding the registry
    pub fn lock_path(&self) -> PathBuf {
        lock_path_for(&self.repository_config)
    }
}

/// The lock file next to `path`: extension replaced by `.lock`, or appended
pub fn lock_path_for(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.with_extension("lock")
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_path() {
        assert_eq!(
            lock_path_for(Path::new("/etc/chartwell/repositories.yaml")),
            PathBuf::from("/etc/chartwell/repositories.lock")
        );
        assert_eq!(
            lock_path_for(Path::new("/etc/chartwell/repositories")),
            PathBuf::from("/etc/chartwell/repositories.lock")
        );
    }

    #[test]
    fn test_explicit_paths_win() {
        let settings = RepoSettings::resolve(
            Some(PathBuf::from("/tmp/repos.yaml")),
            Some(PathBuf::from("/tmp/cache")),
        )
        .unwrap();

        assert_eq!(settings.repository_config, PathBuf::from("/tmp/repos.yaml"));
        assert_eq!(settings.repository_cache, PathBuf::from("/tmp/cache"));
        assert_eq!(settings.lock, LockOptions::default());
        assert_eq!(settings.lock_path(), PathBuf::from("/tmp/repos.lock"));
    }

    #[test]
    fn test_zero_concurrency_means_unbounded() {
        let settings = RepoSettings::new("/tmp/r.yaml", "/tmp/c").with_max_concurrency(Some(0));
        assert_eq!(settings.max_concurrency, None);
    }
}
