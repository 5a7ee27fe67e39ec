use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::layout::LayoutConfig;
use crate::source::SourceConfig;
use crate::viewport::ViewportConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Every tunable of the viewer. Missing tables and keys fall back to the
/// built-in defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub source: SourceConfig,
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let viewport = &self.viewport;
        if !(viewport.zoom_min > 0.0 && viewport.zoom_min <= viewport.zoom_max) {
            return Err(ConfigError::Invalid(format!(
                "zoom bounds [{}, {}] are empty or not positive",
                viewport.zoom_min, viewport.zoom_max
            )));
        }
        if viewport.wheel_factor <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "wheel_factor must be greater than 1, got {}",
                viewport.wheel_factor
            )));
        }
        if self.source.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".to_string()));
        }
        if self.layout.row_height < self.layout.node_height {
            return Err(ConfigError::Invalid(format!(
                "row_height {} is smaller than node_height {}",
                self.layout.row_height, self.layout.node_height
            )));
        }
        Ok(())
    }
}
