//! Repository index types
//!
//! Helm-compatible `index.yaml`: a map from chart name to every published
//! version of that chart, newest first.

use chartwell_core::{ChartMetadata, Maintainer, parse_lenient};
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::warn;

use crate::error::{RepoError, Result};
use crate::fsutil::write_atomic;

/// API version written to new indexes
pub const INDEX_API_VERSION: &str = "v1";

/// Repository index (Helm-compatible)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
    /// API version, required on load
    #[serde(default)]
    pub api_version: String,

    /// When this index was generated
    #[serde(default = "Utc::now")]
    pub generated: DateTime<Utc>,

    /// Chart versions grouped by chart name
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<ChartVersion>>,
}

impl Default for IndexFile {
    fn default() -> Self {
        Self {
            api_version: INDEX_API_VERSION.to_string(),
            generated: Utc::now(),
            entries: BTreeMap::new(),
        }
    }
}

impl IndexFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate an index document
    ///
    /// `origin` names the document (URL or path) in error messages.
    pub fn from_yaml(yaml: &str, origin: &str) -> Result<Self> {
        let mut index: Self = serde_yaml::from_str(yaml).map_err(|e| RepoError::IndexParseError {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;

        if index.api_version.trim().is_empty() {
            return Err(RepoError::IndexParseError {
                origin: origin.to_string(),
                message: "no API version specified".to_string(),
            });
        }

        index.drop_invalid_entries(origin);
        index.sort_entries();
        Ok(index)
    }

    /// Parse index from bytes
    pub fn from_bytes(bytes: &[u8], origin: &str) -> Result<Self> {
        let yaml = std::str::from_utf8(bytes).map_err(|e| RepoError::IndexParseError {
            origin: origin.to_string(),
            message: format!("Invalid UTF-8: {}", e),
        })?;
        Self::from_yaml(yaml, origin)
    }

    /// Load an index file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| RepoError::io(path, e))?;
        Self::from_bytes(&bytes, &path.display().to_string())
    }

    /// Write the index to `path` atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        write_atomic(path, content.as_bytes())
    }

    fn drop_invalid_entries(&mut self, origin: &str) {
        for (name, versions) in self.entries.iter_mut() {
            let mut seen = HashSet::new();
            versions.retain(|cv| {
                if cv.name.trim().is_empty() {
                    warn!("Skipping chart without a name under '{}' in {}", name, origin);
                    return false;
                }
                if cv.parsed_version().is_none() {
                    warn!(
                        "Skipping {} version '{}' in {}: not a valid semantic version",
                        cv.name, cv.version, origin
                    );
                    return false;
                }
                if !seen.insert(cv.version.clone()) {
                    warn!("Skipping duplicate {} {} in {}", cv.name, cv.version, origin);
                    return false;
                }
                true
            });
        }
        self.entries.retain(|_, versions| !versions.is_empty());
    }

    /// Sort every group by descending version
    pub fn sort_entries(&mut self) {
        for versions in self.entries.values_mut() {
            versions.sort_by(|a, b| b.parsed_version().cmp(&a.parsed_version()));
        }
    }

    /// Check if `name` at `version` is indexed
    pub fn has(&self, name: &str, version: &str) -> bool {
        self.get_version(name, version).is_some()
    }

    /// Get all versions of a chart, newest first
    pub fn get(&self, name: &str) -> Option<&[ChartVersion]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Get a specific version of a chart
    pub fn get_version(&self, name: &str, version: &str) -> Option<&ChartVersion> {
        self.entries
            .get(name)?
            .iter()
            .find(|e| e.version == version)
    }

    /// Add a chart version, unless that name+version is already present
    ///
    /// Returns whether the entry was added.
    pub fn add(&mut self, entry: ChartVersion) -> bool {
        if self.has(&entry.name, &entry.version) {
            return false;
        }
        self.entries
            .entry(entry.name.clone())
            .or_default()
            .push(entry);
        true
    }

    /// Add every entry of `other` whose name+version is not yet present
    ///
    /// Entries already in `self` win. Returns the number of entries added.
    pub fn merge_missing(&mut self, other: IndexFile) -> usize {
        let mut added = 0;
        for entry in other.entries.into_values().flatten() {
            if self.add(entry) {
                added += 1;
            }
        }
        self.sort_entries();
        self.generated = Utc::now();
        added
    }

    /// List all chart names
    pub fn chart_names(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    /// Total number of chart versions
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One version of one chart in the index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartVersion {
    /// Chart name
    pub name: String,

    /// Chart version (semver, parsed leniently)
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,

    /// Application version
    #[serde(
        default,
        deserialize_with = "optional_scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Keywords for search
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Chart type (application or library)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// URLs to download the chart archive
    #[serde(default)]
    pub urls: Vec<String>,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// SHA256 digest of the archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ChartVersion {
    /// Index entry for a packaged chart
    pub fn from_metadata(metadata: ChartMetadata, urls: Vec<String>, digest: String) -> Self {
        Self {
            name: metadata.name,
            version: metadata.version,
            app_version: metadata.app_version,
            description: metadata.description,
            home: metadata.home,
            icon: metadata.icon,
            sources: metadata.sources,
            keywords: metadata.keywords,
            maintainers: metadata.maintainers,
            deprecated: metadata.deprecated,
            api_version: metadata.api_version,
            chart_type: metadata.chart_type,
            annotations: metadata.annotations,
            urls,
            created: Some(Utc::now()),
            digest: Some(digest),
        }
    }

    /// Get the primary download URL
    pub fn download_url(&self) -> Option<&str> {
        self.urls.first().map(|s| s.as_str())
    }

    /// Parse version as semver, leniently
    pub fn parsed_version(&self) -> Option<Version> {
        parse_lenient(&self.version)
    }
}

/// Accept `version: 1.0` as well as `version: "1.0"`
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok(String::new()),
        _ => Err(serde::de::Error::custom("expected a scalar value")),
    }
}

fn optional_scalar_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = scalar_string(deserializer)?;
    Ok(Some(value).filter(|s| !s.is_empty()))
}
