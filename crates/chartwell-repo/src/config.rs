//! Repository registry file
//!
//! The registry is a single YAML document (by default
//! `~/.config/chartwell/repositories.yaml`) using the same field names as
//! Helm's `repositories.yaml`, so existing files can be read as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RepoError, Result};
use crate::fsutil::write_atomic;

/// Hosts that were permanently retired, with the location that replaced them
pub const DEPRECATED_REPOSITORIES: &[(&str, &str)] = &[
    (
        "//kubernetes-charts.storage.googleapis.com",
        "https://charts.helm.sh/stable",
    ),
    (
        "//kubernetes-charts-incubator.storage.googleapis.com",
        "https://charts.helm.sh/incubator",
    ),
];

/// The persisted set of configured repositories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryFile {
    /// API version
    #[serde(default)]
    pub api_version: String,

    /// Time of the last write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<DateTime<Utc>>,

    /// Configured repositories, in insertion order
    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,
}

impl RegistryFile {
    /// Load the registry from `path`
    ///
    /// Fails with [`RepoError::RegistryNotFound`] when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepoError::RegistryNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(RepoError::io(path, e)),
        };

        // An empty file is a valid, empty registry
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| RepoError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load the registry, treating a missing file as empty
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(RepoError::RegistryNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Write the whole registry to `path` atomically
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.generated = Some(Utc::now());
        let content = serde_yaml::to_string(self)?;
        write_atomic(path, content.as_bytes())
    }

    /// Check if a repository with this name is configured
    pub fn has(&self, name: &str) -> bool {
        self.repositories.iter().any(|r| r.name == name)
    }

    /// Get a repository by name
    pub fn get(&self, name: &str) -> Result<&RepositoryEntry> {
        self.repositories
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| RepoError::RepositoryNotFound {
                name: name.to_string(),
            })
    }

    /// Insert an entry, replacing a same-named one in place
    ///
    /// Returns the replaced entry, if any.
    pub fn upsert(&mut self, entry: RepositoryEntry) -> Option<RepositoryEntry> {
        match self.repositories.iter_mut().find(|r| r.name == entry.name) {
            Some(existing) => Some(std::mem::replace(existing, entry)),
            None => {
                self.repositories.push(entry);
                None
            }
        }
    }

    /// Remove a repository by name, returning whether it was present
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.repositories.len();
        self.repositories.retain(|r| r.name != name);
        self.repositories.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }
}

/// One configured repository
///
/// Optional string fields never hold an empty string: Helm writes `""` for
/// unset values and those are read back as `None`, so equality compares what
/// the user actually configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    /// Unique name for this repository
    pub name: String,

    /// Repository URL (`http(s)://` or `file://`)
    pub url: String,

    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,

    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub password: Option<String>,

    /// CA bundle used to verify the server certificate
    #[serde(
        default,
        rename = "caFile",
        deserialize_with = "empty_path_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub ca_file: Option<PathBuf>,

    /// Client certificate presented to the server
    #[serde(
        default,
        rename = "certFile",
        deserialize_with = "empty_path_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub cert_file: Option<PathBuf>,

    /// Private key for `cert_file`
    #[serde(
        default,
        rename = "keyFile",
        deserialize_with = "empty_path_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_file: Option<PathBuf>,

    /// Skip TLS verification (insecure, not recommended)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub insecure_skip_tls_verify: bool,

    /// Send credentials to every host, including redirect targets
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pass_credentials_all: bool,
}

impl RepositoryEntry {
    /// Create an entry with only a name and URL
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set basic-auth credentials; empty values count as absent
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        self.username = username.filter(|s| !s.is_empty());
        self.password = password.filter(|s| !s.is_empty());
        self
    }

    /// Set the TLS material; empty paths count as absent
    #[must_use]
    pub fn with_tls(
        mut self,
        ca_file: Option<PathBuf>,
        cert_file: Option<PathBuf>,
        key_file: Option<PathBuf>,
    ) -> Self {
        let non_empty = |p: Option<PathBuf>| p.filter(|p| !p.as_os_str().is_empty());
        self.ca_file = non_empty(ca_file);
        self.cert_file = non_empty(cert_file);
        self.key_file = non_empty(key_file);
        self
    }

    /// Get the index URL
    pub fn index_url(&self) -> String {
        format!("{}/index.yaml", self.url.trim_end_matches('/'))
    }

    pub fn scheme(&self) -> Result<RepositoryScheme> {
        RepositoryScheme::detect(&self.url)
    }
}

/// How a repository index is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryScheme {
    /// Traditional HTTP repository with index.yaml
    Http,

    /// Local filesystem
    File,
}

impl RepositoryScheme {
    /// Detect the scheme of a repository URL
    pub fn detect(url: &str) -> Result<Self> {
        if url.starts_with("http://") || url.starts_with("https://") {
            Ok(RepositoryScheme::Http)
        } else if url.starts_with("file://") {
            Ok(RepositoryScheme::File)
        } else if url.starts_with("oci://") {
            Err(RepoError::InvalidRepositoryUrl {
                url: url.to_string(),
                reason: "OCI registries do not publish an index and cannot be added as repositories"
                    .to_string(),
            })
        } else {
            Err(RepoError::InvalidRepositoryUrl {
                url: url.to_string(),
                reason: "URL must start with http://, https:// or file://".to_string(),
            })
        }
    }
}

/// Validate a URL before it is added to the registry
pub fn validate_repository_url(url: &str, allow_deprecated: bool) -> Result<RepositoryScheme> {
    if !allow_deprecated {
        for (host, replacement) in DEPRECATED_REPOSITORIES {
            if url.contains(host) {
                return Err(RepoError::DeprecatedRepository {
                    url: url.to_string(),
                    replacement: replacement.to_string(),
                });
            }
        }
    }

    let scheme = RepositoryScheme::detect(url)?;
    url::Url::parse(url).map_err(|e| RepoError::InvalidRepositoryUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    Ok(scheme)
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn empty_path_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()).map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scheme_detection() {
        assert_eq!(
            RepositoryScheme::detect("https://charts.bitnami.com/bitnami").unwrap(),
            RepositoryScheme::Http
        );
        assert_eq!(
            RepositoryScheme::detect("file:///srv/charts").unwrap(),
            RepositoryScheme::File
        );

        assert!(RepositoryScheme::detect("oci://ghcr.io/myorg/charts").is_err());
        assert!(RepositoryScheme::detect("invalid").is_err());
    }

    #[test]
    fn test_deprecated_repositories() {
        let err = validate_repository_url(
            "https://kubernetes-charts.storage.googleapis.com",
            false,
        )
        .unwrap_err();
        match err {
            RepoError::DeprecatedRepository { replacement, .. } => {
                assert_eq!(replacement, "https://charts.helm.sh/stable");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(
            validate_repository_url("https://kubernetes-charts.storage.googleapis.com", true)
                .is_ok()
        );
    }

    #[test]
    fn test_index_url() {
        let entry = RepositoryEntry::new("bitnami", "https://charts.bitnami.com/bitnami/");
        assert_eq!(
            entry.index_url(),
            "https://charts.bitnami.com/bitnami/index.yaml"
        );
    }

    #[test]
    fn test_empty_values_compare_as_absent() {
        let a = RepositoryEntry::new("stable", "https://example.com")
            .with_credentials(Some(String::new()), None)
            .with_tls(Some(PathBuf::new()), None, None);
        let b = RepositoryEntry::new("stable", "https://example.com");
        assert_eq!(a, b);
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut registry = RegistryFile::default();

        assert!(registry
            .upsert(RepositoryEntry::new("a", "https://a.example.com"))
            .is_none());
        registry.upsert(RepositoryEntry::new("b", "https://b.example.com"));

        let replaced = registry
            .upsert(RepositoryEntry::new("a", "https://a2.example.com"))
            .unwrap();
        assert_eq!(replaced.url, "https://a.example.com");

        // Replacement keeps the original position
        let names: Vec<&str> = registry.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().url, "https://a2.example.com");

        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert!(matches!(
            registry.get("a"),
            Err(RepoError::RepositoryNotFound { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repositories.yaml");

        assert!(matches!(
            RegistryFile::load(&path),
            Err(RepoError::RegistryNotFound { .. })
        ));
        assert!(RegistryFile::load_or_default(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_helm_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repositories.yaml");
        std::fs::write(
            &path,
            r#"apiVersion: ""
generated: "2024-01-01T00:00:00Z"
repositories:
- caFile: ""
  certFile: ""
  insecure_skip_tls_verify: false
  keyFile: ""
  name: bitnami
  pass_credentials_all: false
  password: ""
  url: https://charts.bitnami.com/bitnami
  username: ""
"#,
        )
        .unwrap();

        let registry = RegistryFile::load(&path).unwrap();
        let entry = registry.get("bitnami").unwrap();
        assert_eq!(
            entry,
            &RepositoryEntry::new("bitnami", "https://charts.bitnami.com/bitnami")
        );
    }

    #[test]
    fn test_load_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("repositories.yaml");
        std::fs::write(&path, "repositories: [not: valid: yaml").unwrap();

        assert!(matches!(
            RegistryFile::load(&path),
            Err(RepoError::Parse { .. })
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config").join("repositories.yaml");

        let mut registry = RegistryFile::default();
        registry.upsert(
            RepositoryEntry::new("private", "https://charts.example.com")
                .with_credentials(Some("admin".to_string()), Some("secret".to_string())),
        );
        registry.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("name: private"));
        assert!(!content.contains("caFile"));

        let loaded = RegistryFile::load(&path).unwrap();
        assert!(loaded.generated.is_some());
        assert_eq!(loaded.repositories, registry.repositories);
    }
}
