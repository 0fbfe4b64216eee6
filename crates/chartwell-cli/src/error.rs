//! CLI error types with exit code handling
//!
//! Library errors are classified by [`ErrorKind`] so every failure maps to
//! one exit code, with a hint for the common recoverable cases.

use chartwell_repo::{ErrorKind, RepoError};
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Invalid input or unparseable file
    #[error("{message}")]
    #[diagnostic(code(chartwell::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Unknown repository or missing registry
    #[error("{message}")]
    #[diagnostic(code(chartwell::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Repository name taken by a different configuration
    #[error("{message}")]
    #[diagnostic(code(chartwell::cli::conflict))]
    Conflict {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartwell::cli::io))]
    Io { message: String },

    /// Index download failed
    #[error("{message}")]
    #[diagnostic(code(chartwell::cli::network))]
    Network {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Registry lock not acquired in time
    #[error("{message}")]
    #[diagnostic(
        code(chartwell::cli::lock),
        help("Another chartwell process is modifying the repository file; retry once it finishes")
    )]
    Lock { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(chartwell::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Conflict { .. } => exit_codes::CONFLICT,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Network { .. } => exit_codes::NETWORK_ERROR,
            CliError::Lock { .. } => exit_codes::LOCK_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

fn help_for(err: &RepoError) -> Option<String> {
    let help = match err {
        RepoError::RegistryNotFound { .. } | RepoError::NoRepositories => {
            "Add one with: chartwell repo add <name> <url>".to_string()
        }
        RepoError::RepositoryNotFound { .. } => {
            "Run 'chartwell repo list' to see the configured repositories".to_string()
        }
        RepoError::RepositoryAlreadyExists { .. } => {
            "Use --force-update to replace the existing configuration".to_string()
        }
        RepoError::DeprecatedRepository { replacement, .. } => format!(
            "Use {} instead, or pass --allow-deprecated-repos",
            replacement
        ),
        RepoError::InvalidConstraint { .. } => {
            "Constraints look like '>=1.2.0', '~1.4' or '^2.0.0 || 3.x'".to_string()
        }
        RepoError::UnreachableRepository { .. } | RepoError::AuthRequired { .. } => {
            "Check the URL and credentials, then retry".to_string()
        }
        _ => return None,
    };
    Some(help)
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        let help = help_for(&err);
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => CliError::NotFound { message, help },
            ErrorKind::Conflict => CliError::Conflict { message, help },
            ErrorKind::Validation => CliError::Validation { message, help },
            ErrorKind::Io => CliError::Io { message },
            ErrorKind::Network => CliError::Network { message, help },
            ErrorKind::Concurrency => CliError::Lock { message },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
