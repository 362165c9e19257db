//! Engine configuration: where indices live and how large result sets may
//! grow. Loadable from TOML; validated explicitly before use.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration format error: {0}")]
    Format(#[from] toml::de::Error),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

fn default_max_search() -> usize {
    1_000
}

fn default_writer_heap_bytes() -> usize {
    50_000_000
}

// Tantivy rejects writer budgets below this.
const WRITER_HEAP_MIN_BYTES: usize = 15_000_000;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EngineConfig {
    /// Root directory holding one index directory per application name.
    pub root_path: PathBuf,
    /// Ceiling on the size of any result set.
    #[serde(default = "default_max_search")]
    pub max_search: usize,
    /// Indexing buffer handed to each application's writer.
    #[serde(default = "default_writer_heap_bytes")]
    pub writer_heap_bytes: usize,
}

impl EngineConfig {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            max_search: default_max_search(),
            writer_heap_bytes: default_writer_heap_bytes(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue("root_path is empty".into()));
        }
        if self.max_search == 0 {
            return Err(ConfigError::InvalidValue(
                "max_search must be greater than zero".into(),
            ));
        }
        if self.writer_heap_bytes < WRITER_HEAP_MIN_BYTES {
            return Err(ConfigError::InvalidValue(format!(
                "writer_heap_bytes must be at least {WRITER_HEAP_MIN_BYTES}"
            )));
        }
        Ok(())
    }
}
