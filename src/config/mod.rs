//! Configuration loading and validation.
//!
//! The config file declares the upstream the binary forwards to and the
//! named filter registrations (URL patterns plus servlet-style init
//! params). Submodules provide the data model, validation logic, and the
//! file sources. Configuration is read once at startup and never changes
//! afterwards.

pub mod model;
pub mod sources;
pub mod validation;

use std::path::{Path, PathBuf};

use crate::error::HeaderFilterError;
use model::Config;

/// File names probed in the working directory when no `--config` is given.
pub const AUTO_DETECT_CANDIDATES: &[&str] = &[
    "header-filter.yaml",
    "header-filter.yml",
    "header-filter.json",
    "header-filter.toml",
];

/// Load and validate the explicit config file, or the first
/// auto-detected candidate in the working directory.
pub async fn load(explicit: Option<&Path>) -> Result<(Config, PathBuf), HeaderFilterError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => auto_detect().await.ok_or_else(|| HeaderFilterError::NoConfigSource {
            hint: "Provide --config <file>.\n  \
                   Run 'header-filter init' to create a config file."
                .into(),
        })?,
    };

    let source = sources::for_path(&path)?;
    let config = source.load().await?;
    tracing::debug!(path = %path.display(), format = source.name(), "config loaded");
    Ok((config, path))
}

async fn auto_detect() -> Option<PathBuf> {
    for name in AUTO_DETECT_CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return Some(path);
        }
    }
    None
}
