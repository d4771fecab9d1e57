//! Configuration types and parsing for silo.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main project configuration from silo.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Pipeline name recorded on every run, e.g. `health_indicators_etl`
    pub pipeline: String,

    /// Path to the DuckDB database file holding both the metadata and
    /// warehouse schemas
    #[serde(default = "default_database")]
    pub database: String,

    /// Path to the quality ruleset YAML file
    #[serde(default = "default_ruleset")]
    pub ruleset: String,

    /// Reload sources even when their content fingerprint is unchanged
    #[serde(default)]
    pub force_reload: bool,
}

fn default_database() -> String {
    "silo.duckdb".to_string()
}

fn default_ruleset() -> String {
    "rules.yml".to_string()
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {e}", path.display()),
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.pipeline.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "pipeline name must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Database path resolved relative to `root`.
    pub fn database_path(&self, root: &Path) -> PathBuf {
        root.join(&self.database)
    }

    /// Ruleset path resolved relative to `root`.
    pub fn ruleset_path(&self, root: &Path) -> PathBuf {
        root.join(&self.ruleset)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
