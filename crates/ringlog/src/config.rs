//! Writer configuration and management

use crate::{Error, Result, Severity};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of files in the ring
pub const DEFAULT_SLOT_COUNT: usize = 5;

/// Default size cap per file (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Main writer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingLogConfig {
    /// Directory for log files
    pub log_dir: PathBuf,

    /// Base filename for logs
    pub base_name: String,

    /// Number of files in the ring
    pub slot_count: usize,

    /// Size at which the active file is rotated (in bytes)
    pub max_file_size_bytes: u64,

    /// Tag written before the pid in every prefix
    pub process_tag: String,

    /// Threshold used when no host supplies one
    pub threshold: Severity,

    /// Collapse consecutive identical messages
    pub dedup_enabled: bool,
}

impl Default for RingLogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            base_name: "ringlog".to_string(),
            slot_count: DEFAULT_SLOT_COUNT,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            process_tag: "ringlog".to_string(),
            threshold: Severity::Warning,
            dedup_enabled: true,
        }
    }
}

impl RingLogConfig {
    /// Load configuration from file or create default
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        let mut config = if config_file.exists() {
            let content = tokio::fs::read_to_string(&config_file).await?;
            toml::from_str(&content).map_err(|e| Error::Config {
                message: format!("Failed to parse ringlog config: {}", e),
            })?
        } else {
            Self::default()
        };

        config.load_env_overrides();
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config_path: Option<&Path>) -> Result<()> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if let Some(parent) = config_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            message: format!("Failed to serialize ringlog config: {}", e),
        })?;

        tokio::fs::write(&config_file, content).await?;
        Ok(())
    }

    /// Load environment variable overrides
    pub fn load_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("RINGLOG_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }

        if let Ok(name) = std::env::var("RINGLOG_BASE_NAME") {
            self.base_name = name;
        }

        if let Ok(count) = std::env::var("RINGLOG_SLOT_COUNT") {
            self.slot_count = count.parse().unwrap_or(self.slot_count);
        }

        if let Ok(size) = std::env::var("RINGLOG_MAX_FILE_SIZE") {
            self.max_file_size_bytes = size.parse().unwrap_or(self.max_file_size_bytes);
        }

        if let Ok(tag) = std::env::var("RINGLOG_PROCESS_TAG") {
            self.process_tag = tag;
        }

        if let Ok(level) = std::env::var("RINGLOG_LEVEL") {
            self.threshold = level.parse().unwrap_or(self.threshold);
        }

        if let Ok(enabled) = std::env::var("RINGLOG_DEDUP") {
            self.dedup_enabled = enabled.parse().unwrap_or(self.dedup_enabled);
        }
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("io", "ringlog", "ringlog").ok_or_else(|| Error::Config {
                message: "Could not determine config directory".to_string(),
            })?;

        Ok(project_dirs.config_dir().join("ringlog.toml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.slot_count == 0 {
            return Err(Error::Config {
                message: "slot_count must be greater than 0".to_string(),
            });
        }

        if self.max_file_size_bytes == 0 {
            return Err(Error::Config {
                message: "max_file_size_bytes must be greater than 0".to_string(),
            });
        }

        if self.base_name.is_empty() {
            return Err(Error::Config {
                message: "base_name must not be empty".to_string(),
            });
        }

        for (field, value) in [
            ("base_name", &self.base_name),
            ("process_tag", &self.process_tag),
        ] {
            if value.contains(['/', '\\']) {
                return Err(Error::Config {
                    message: format!("{} must not contain path separators", field),
                });
            }
        }

        Ok(())
    }
}
