//! Chartwell Core - Chart types shared by the repository tooling
//!
//! This crate provides the foundational types used throughout chartwell:
//! - `ChartMetadata`: The `Chart.yaml` document of a packaged chart
//! - `archive`: Reading metadata and digests out of `.tgz` chart archives
//! - `version`: Lenient semantic version parsing for index entries

pub mod archive;
pub mod chart;
pub mod error;
pub mod version;

pub use chart::{ChartMetadata, Maintainer};
pub use error::{CoreError, Result};
pub use version::parse_lenient;
