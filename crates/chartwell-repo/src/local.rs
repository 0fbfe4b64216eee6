//! Building an index for a directory of packaged charts

use chartwell_core::archive::{digest_file, read_chart_metadata};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::error::{RepoError, Result};
use crate::index::{ChartVersion, IndexFile};

/// File name of a repository index
pub const INDEX_FILE: &str = "index.yaml";

/// Options for [`LocalIndexBuilder`]
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// URL prefix of the charts; relative paths when unset
    pub base_url: Option<String>,
    /// Existing index to merge into
    pub merge: Option<PathBuf>,
}

/// Scans a directory for chart archives and writes its `index.yaml`
#[derive(Debug, Clone)]
pub struct LocalIndexBuilder {
    dir: PathBuf,
    options: IndexOptions,
}

impl LocalIndexBuilder {
    pub fn new(dir: impl Into<PathBuf>, options: IndexOptions) -> Self {
        Self {
            dir: dir.into(),
            options,
        }
    }

    /// Path the index is written to
    pub fn output_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Index every chart archive found in the directory
    ///
    /// Archives at the top level and one directory down are picked up.
    /// When the same name+version appears twice, the first archive wins.
    pub fn scan(&self) -> Result<IndexFile> {
        if !self.dir.is_dir() {
            return Err(RepoError::io(
                &self.dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let base_url = self.options.base_url.as_deref().map(parse_base_url).transpose()?;

        let mut index = IndexFile::new();
        for archive in self.archives()? {
            let metadata = match read_chart_metadata(&archive) {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Skipping {}: {}", archive.display(), e);
                    continue;
                }
            };

            let relative = relative_url_path(&self.dir, &archive)?;
            let chart_url = match &base_url {
                Some(base) => base
                    .join(&relative)
                    .map_err(|e| RepoError::InvalidRepositoryUrl {
                        url: format!("{}{}", base, relative),
                        reason: e.to_string(),
                    })?
                    .to_string(),
                None => relative,
            };

            if index.has(&metadata.name, &metadata.version) {
                debug!(
                    "Skipping {}: {} {} already indexed",
                    archive.display(),
                    metadata.name,
                    metadata.version
                );
                continue;
            }

            let digest = digest_file(&archive)?;
            debug!("Indexed {} {}", metadata.name, metadata.version);
            index.add(ChartVersion::from_metadata(metadata, vec![chart_url], digest));
        }

        index.sort_entries();
        Ok(index)
    }

    /// Scan, merge into the configured target and write `<dir>/index.yaml`
    pub fn build(&self) -> Result<IndexFile> {
        let scanned = self.scan()?;

        let index = match &self.options.merge {
            Some(target) => {
                let mut merged = if target.exists() {
                    IndexFile::load(target)?
                } else {
                    debug!("Merge target {} does not exist, starting empty", target.display());
                    IndexFile::new()
                };
                let added = merged.merge_missing(scanned);
                debug!("Merged {} new chart versions", added);
                merged
            }
            None => scanned,
        };

        index.save(&self.output_path())?;
        Ok(index)
    }

    fn archives(&self) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for pattern in ["*.tgz", "*/*.tgz"] {
            let full = self.dir.join(pattern);
            let full = full.to_string_lossy();
            let paths = glob::glob(&full).map_err(|e| RepoError::InvalidConfig {
                message: format!("Invalid archive pattern {}: {}", full, e),
            })?;
            for path in paths {
                match path {
                    Ok(path) if path.is_file() => found.push(path),
                    Ok(_) => {}
                    Err(e) => debug!("Skipping unreadable path: {}", e),
                }
            }
        }
        Ok(found)
    }
}

/// A base URL that `join` treats as a directory
fn parse_base_url(base: &str) -> Result<Url> {
    let with_slash = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    Url::parse(&with_slash).map_err(|e| RepoError::InvalidRepositoryUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })
}

/// Archive path relative to `dir`, with `/` separators
fn relative_url_path(dir: &Path, archive: &Path) -> Result<String> {
    let relative = archive
        .strip_prefix(dir)
        .map_err(|_| RepoError::InvalidConfig {
            message: format!("{} is outside {}", archive.display(), dir.display()),
        })?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}
