//! Generic async file-based config source.
//!
//! [`FileSource`] loads a config file in any supported format by
//! accepting a deserialization function at construction time. It reads
//! the file asynchronously via Tokio and validates the result.

use std::path::PathBuf;

use crate::config::model::Config;
use crate::config::validation::validate;
use crate::error::HeaderFilterError;

type Deserialize = fn(&str) -> Result<Config, Box<dyn std::error::Error + Send + Sync>>;

pub struct FileSource {
    path: PathBuf,
    name: &'static str,
    deserialize: Deserialize,
}

impl FileSource {
    #[must_use]
    pub fn new(path: PathBuf, name: &'static str, deserialize: Deserialize) -> Self {
        Self {
            path,
            name,
            deserialize,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    async fn read_content(&self) -> Result<String, HeaderFilterError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HeaderFilterError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                HeaderFilterError::Io(e)
            }
        })
    }

    /// Read, parse and validate the file.
    pub async fn load(&self) -> Result<Config, HeaderFilterError> {
        let content = self.read_content().await?;

        let config = (self.deserialize)(&content).map_err(|e| HeaderFilterError::ConfigParse {
            path: self.path.display().to_string(),
            source: e,
        })?;

        if let Err(errors) = validate(&config) {
            return Err(HeaderFilterError::ConfigValidation { errors });
        }

        Ok(config)
    }
}
