//! Chart metadata (`Chart.yaml`)

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::version::parse_lenient;

/// The `Chart.yaml` document of a chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Chart API version (v1 or v2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Chart name (required)
    pub name: String,

    /// Chart version (required, SemVer)
    pub version: String,

    /// Application version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Kubernetes version constraint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_version: Option<String>,

    /// Home URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    /// Icon URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Source URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Keywords
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Maintainers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,

    /// Deprecated flag
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,

    /// Chart type (application or library)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,

    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Maintainer information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ChartMetadata {
    /// Create minimal metadata with a name and version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            api_version: Some("v2".to_string()),
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Parse and validate a `Chart.yaml` document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let metadata: Self = serde_yaml::from_str(yaml)?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Check the fields every chart must carry
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidChart {
                message: "chart name is required".to_string(),
            });
        }

        if self.name.contains(['/', '\\']) {
            return Err(CoreError::InvalidChart {
                message: format!("chart name '{}' must not contain path separators", self.name),
            });
        }

        if self.parsed_version().is_none() {
            return Err(CoreError::InvalidChart {
                message: format!(
                    "version '{}' of chart '{}' is not a valid semantic version",
                    self.version, self.name
                ),
            });
        }

        Ok(())
    }

    /// Parse version as semver
    pub fn parsed_version(&self) -> Option<Version> {
        parse_lenient(&self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_deserialize() {
        let yaml = r#"
apiVersion: v2
name: nginx
version: 15.0.0
appVersion: "1.25.0"
description: NGINX Open Source
type: application
keywords:
  - webserver
  - http
maintainers:
  - name: Jane
    email: jane@example.com
"#;

        let chart = ChartMetadata::from_yaml(yaml).unwrap();
        assert_eq!(chart.name, "nginx");
        assert_eq!(chart.version, "15.0.0");
        assert_eq!(chart.app_version.as_deref(), Some("1.25.0"));
        assert_eq!(chart.chart_type.as_deref(), Some("application"));
        assert_eq!(chart.keywords, vec!["webserver", "http"]);
        assert_eq!(chart.maintainers[0].email.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_chart_requires_name() {
        let err = ChartMetadata::from_yaml("name: ''\nversion: 1.0.0\n").unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }

    #[test]
    fn test_chart_rejects_invalid_version() {
        let err = ChartMetadata::from_yaml("name: demo\nversion: latest\n").unwrap_err();
        assert!(matches!(err, CoreError::InvalidChart { .. }));
    }

    #[test]
    fn test_chart_rejects_path_in_name() {
        let chart = ChartMetadata::new("../evil", "1.0.0");
        assert!(chart.validate().is_err());
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let chart = ChartMetadata::new("demo", "0.1.0");
        let yaml = serde_yaml::to_string(&chart).unwrap();
        assert!(!yaml.contains("keywords"));
        assert!(!yaml.contains("deprecated"));
        assert!(yaml.contains("apiVersion: v2"));
    }
}
