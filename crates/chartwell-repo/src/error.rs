//! Error types for repository operations

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a [`RepoError`]
///
/// Callers use this to decide how to present a failure (exit code, whether an
/// empty result is acceptable) without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Registry file absent, repository name unknown
    NotFound,
    /// A differently configured repository already uses the name
    Conflict,
    /// Malformed input: URL, constraint, query, index document
    Validation,
    /// Disk read/write failures
    Io,
    /// Download failures
    Network,
    /// Lock not acquired within the timeout
    Concurrency,
}

/// Repository operation errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Registry Errors ============
    #[error("Repository file not found: {}", path.display())]
    RegistryNotFound { path: PathBuf },

    #[error("No repositories configured")]
    NoRepositories,

    #[error("No repo named \"{name}\" found")]
    RepositoryNotFound { name: String },

    #[error("Repository name ({name}) already exists, please specify a different name")]
    RepositoryAlreadyExists { name: String },

    #[error("Invalid repository name '{name}': {reason}")]
    InvalidRepositoryName { name: String, reason: String },

    #[error("Invalid repository URL: {url} - {reason}")]
    InvalidRepositoryUrl { url: String, reason: String },

    #[error("Repo \"{url}\" is no longer available; try \"{replacement}\" instead")]
    DeprecatedRepository { url: String, replacement: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // ============ Locking Errors ============
    #[error("Timed out after {}s waiting for lock {}", waited.as_secs(), path.display())]
    LockTimeout { path: PathBuf, waited: Duration },

    // ============ Network Errors ============
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Authentication required for {url}")]
    AuthRequired { url: String },

    #[error("Looks like \"{url}\" is not a valid chart repository or cannot be reached: {source}")]
    UnreachableRepository {
        url: String,
        #[source]
        source: Box<RepoError>,
    },

    // ============ Index Errors ============
    #[error("Index parse error in {origin}: {message}")]
    IndexParseError { origin: String, message: String },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    // ============ Search Errors ============
    #[error("An invalid version/constraint format: {constraint} - {message}")]
    InvalidConstraint { constraint: String, message: String },

    #[error("Invalid search query '{query}': {message}")]
    InvalidQuery { query: String, message: String },

    // ============ IO Errors ============
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Chart error: {0}")]
    Chart(#[from] chartwell_core::CoreError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RepoError::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::RegistryNotFound { .. }
            | RepoError::NoRepositories
            | RepoError::RepositoryNotFound { .. } => ErrorKind::NotFound,

            RepoError::RepositoryAlreadyExists { .. } => ErrorKind::Conflict,

            RepoError::InvalidRepositoryName { .. }
            | RepoError::InvalidRepositoryUrl { .. }
            | RepoError::DeprecatedRepository { .. }
            | RepoError::InvalidConfig { .. }
            | RepoError::IndexParseError { .. }
            | RepoError::Parse { .. }
            | RepoError::InvalidConstraint { .. }
            | RepoError::InvalidQuery { .. }
            | RepoError::Chart(_)
            | RepoError::Serialization(_) => ErrorKind::Validation,

            RepoError::LockTimeout { .. } => ErrorKind::Concurrency,

            RepoError::HttpError { .. }
            | RepoError::NetworkError { .. }
            | RepoError::Timeout { .. }
            | RepoError::AuthRequired { .. }
            | RepoError::UnreachableRepository { .. } => ErrorKind::Network,

            RepoError::Io { .. } => ErrorKind::Io,
        }
    }
}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RepoError::Timeout {
                seconds: crate::credentials::REQUEST_TIMEOUT.as_secs(),
            }
        } else if e.is_connect() {
            RepoError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            RepoError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            RepoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}
