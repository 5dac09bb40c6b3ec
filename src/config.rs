//! Configuration for TupleStore
//!
//! Centralized configuration with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// File key holding the page capacity
pub const MAX_ROWS_KEY: &str = "MaximumRowsCountinPage";

/// File key holding the data directory
pub const DATA_DIR_KEY: &str = "DataDirectory";

/// File key toggling fsync on every page write
pub const SYNC_WRITES_KEY: &str = "SyncWrites";

/// Main configuration for a TupleStore instance
///
/// Keys absent from a config file keep their default value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {table}/
    ///           ├── table.meta        (catalog: schema, page directory, indices)
    ///           └── page_{id}.page    (one file per page)
    #[serde(rename = "DataDirectory")]
    pub data_dir: PathBuf,

    /// fsync every page file before it is renamed into place
    #[serde(rename = "SyncWrites")]
    pub sync_writes: bool,

    // -------------------------------------------------------------------------
    // Page Configuration
    // -------------------------------------------------------------------------
    /// Fixed row budget of every page, read once when a page is created
    #[serde(rename = "MaximumRowsCountinPage")]
    pub max_rows_per_page: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./tuplestore_data"),
            sync_writes: true,
            max_rows_per_page: 200,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from a TOML file
    ///
    /// Unknown keys are ignored.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Check invariants that cannot be expressed in the type
    pub fn validate(&self) -> Result<()> {
        if self.max_rows_per_page == 0 {
            return Err(StoreError::Config(
                "max_rows_per_page must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the page capacity (rows per page)
    pub fn max_rows_per_page(mut self, rows: usize) -> Self {
        self.config.max_rows_per_page = rows;
        self
    }

    /// Enable or disable fsync on page writes
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.config.sync_writes = sync;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
