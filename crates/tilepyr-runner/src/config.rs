//! Pipeline configuration, loadable from YAML.
//!
//! ```yaml
//! name: coastline
//! work_dir: /var/tmp/tilepyr
//! enforced_zoom: 12
//! longitude_mode: antimeridian
//! commit_every: 5000
//! ```
//!
//! Every key is optional; command-line flags override file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tilepyr_geo::{AggregatorConfig, LongitudeMode};

/// Default number of tiles per committed write batch.
pub const DEFAULT_COMMIT_EVERY: u64 = 1000;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for one ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Tile set name; also the container file stem.
    pub name: String,
    /// Directory the container is created in. Defaults to the system temp dir.
    pub work_dir: Option<PathBuf>,
    /// Reject tiles at any other zoom level.
    pub enforced_zoom: Option<u8>,
    /// Longitude handling for the bounding box.
    pub longitude_mode: LongitudeMode,
    /// Tiles per committed batch. Zero commits once, at the end.
    pub commit_every: u64,
    /// Written to the container's `description` metadata key.
    pub description: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "tiles".to_string(),
            work_dir: None,
            enforced_zoom: None,
            longitude_mode: LongitudeMode::default(),
            commit_every: DEFAULT_COMMIT_EVERY,
            description: None,
        }
    }
}

impl PipelineConfig {
    /// Load from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse from a YAML string.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() || self.name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "tile set name {:?} must be a non-empty file stem",
                self.name
            )));
        }
        if let Some(zoom) = self.enforced_zoom {
            if zoom > tilepyr_geo::MAX_ZOOM {
                return Err(ConfigError::Invalid(format!(
                    "enforced_zoom {} exceeds maximum {}",
                    zoom,
                    tilepyr_geo::MAX_ZOOM
                )));
            }
        }
        Ok(())
    }

    /// Aggregator settings derived from this configuration.
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            enforced_zoom: self.enforced_zoom,
            longitude_mode: self.longitude_mode,
        }
    }

    /// Resolved working directory.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Container path inside `work_dir`.
    pub fn container_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(format!("{}.mbtiles", self.name))
    }
}
