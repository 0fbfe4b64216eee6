//! Chart archive (`.tgz`) reading
//!
//! A packaged chart is a gzipped tarball whose top-level directory is named
//! after the chart and contains its `Chart.yaml`:
//!
//! ```text
//! nginx-15.0.0.tgz
//! └── nginx/
//!     ├── Chart.yaml
//!     └── ...
//! ```

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path};
use tar::Archive;

use crate::chart::ChartMetadata;
use crate::error::{CoreError, Result};

/// Name of the metadata file inside a chart
pub const CHART_FILE: &str = "Chart.yaml";

/// Read and validate the `Chart.yaml` of a chart archive
pub fn read_chart_metadata(archive_path: &Path) -> Result<ChartMetadata> {
    if !archive_path.exists() {
        return Err(CoreError::ChartNotFound {
            path: archive_path.display().to_string(),
        });
    }

    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !is_top_level_chart_file(&entry.path()?) {
            continue;
        }

        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        return ChartMetadata::from_yaml(&content);
    }

    Err(CoreError::Archive {
        message: format!("{} not found in {}", CHART_FILE, archive_path.display()),
    })
}

/// `<chart>/Chart.yaml`, never a `Chart.yaml` from a vendored subchart
fn is_top_level_chart_file(path: &Path) -> bool {
    let components: Vec<_> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    components.len() == 2
        && matches!(components[1], Component::Normal(name) if name == CHART_FILE)
}

/// Compute the SHA256 digest of a file as lowercase hex
pub fn digest_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Writing chart archives, used to build fixtures in tests
#[cfg(any(test, feature = "test-support"))]
mod fixture {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs::File;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tar::{Builder, Header};

    use super::CHART_FILE;
    use crate::chart::ChartMetadata;
    use crate::error::Result;

    /// Default archive file name for a chart (`<name>-<version>.tgz`)
    #[must_use]
    pub fn archive_file_name(metadata: &ChartMetadata) -> String {
        format!("{}-{}.tgz", metadata.name, metadata.version)
    }

    /// Write a minimal chart archive holding only `<name>/Chart.yaml`
    ///
    /// Returns the path of the created archive inside `output_dir`.
    pub fn create_archive(metadata: &ChartMetadata, output_dir: &Path) -> Result<PathBuf> {
        metadata.validate()?;
        std::fs::create_dir_all(output_dir)?;

        let output = output_dir.join(archive_file_name(metadata));
        let chart_yaml = serde_yaml::to_string(metadata)?;

        let file = File::create(&output)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = Builder::new(encoder);

        add_bytes_to_archive(
            &mut builder,
            &format!("{}/{}", metadata.name, CHART_FILE),
            chart_yaml.as_bytes(),
        )?;

        let encoder = builder.into_inner()?;
        encoder.finish()?;

        Ok(output)
    }

    pub(super) fn add_bytes_to_archive<W: Write>(
        builder: &mut Builder<W>,
        archive_path: &str,
        content: &[u8],
    ) -> Result<()> {
        let mut header = Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0); // Reproducible builds: use epoch time
        header.set_cksum();

        builder.append_data(&mut header, archive_path, content)?;

        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fixture::{archive_file_name, create_archive};
