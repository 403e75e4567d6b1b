//! Engine configuration.
//!
//! Pure data loaded from JSON; every field has a default so an empty object is valid.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::shared::error::ConfigError;

/// Per-area log levels, as level names (`"error"` .. `"trace"`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogSettings {
    pub global: String,
    pub class: Option<String>,
    pub table: Option<String>,
    pub engine: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            global: "info".to_string(),
            class: None,
            table: None,
            engine: None,
        }
    }
}

impl LogSettings {
    /// Level name for an area, falling back to the global level.
    pub fn level_for(&self, area: &str) -> &str {
        let level = match area {
            "class" => self.class.as_deref(),
            "table" => self.table.as_deref(),
            "engine" => self.engine.as_deref(),
            _ => None,
        };
        level.unwrap_or(&self.global)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Chunk name used for inline source.
    pub chunk_name: String,
    /// Directory holding host scripts.
    pub script_dir: PathBuf,
    /// Script run by the `test` command, relative to `script_dir`.
    pub test_script: String,
    /// Instructions between cancellation checks.
    pub cancel_check_interval: u32,
    pub log: LogSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_name: "run".to_string(),
            script_dir: PathBuf::from("Lua"),
            test_script: "test.lua".to_string(),
            cancel_check_interval: 1000,
            log: LogSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cancel_check_interval == 0 {
            return Err(ConfigError::Invalid(
                "cancel_check_interval must be greater than zero".to_string(),
            ));
        }
        if self.chunk_name.is_empty() {
            return Err(ConfigError::Invalid("chunk_name is empty".to_string()));
        }
        Ok(())
    }

    pub fn test_script_path(&self) -> PathBuf {
        self.script_dir.join(&self.test_script)
    }
}
