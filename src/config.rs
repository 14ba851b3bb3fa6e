use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::OutputFormat;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub timetable: TimetableConfig,
    pub session: SessionConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub snapshot_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub marks_config_ttl_secs: u64,
    pub max_capacity: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableConfig {
    /// Let an upsert replace an occupied cell (last write wins)
    pub allow_overwrite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub default_format: String,
    pub output_directory: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                snapshot_path: "data/campus.json".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            cache: CacheConfig {
                marks_config_ttl_secs: 300,
                max_capacity: 1024,
            },
            timetable: TimetableConfig { allow_overwrite: true },
            session: SessionConfig { ttl_minutes: 60 },
            export: ExportConfig {
                default_format: "txt".to_string(),
                output_directory: "./output".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default()).context("Failed to serialize default configuration")?)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("campus-console").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("CAMPUS_CONSOLE").separator("__"))
            .build()
            .context("Failed to load configuration")?;

        let app_config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.store.snapshot_path.trim().is_empty() {
            return Err(anyhow::anyhow!("snapshot_path cannot be empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        if self.cache.marks_config_ttl_secs == 0 {
            return Err(anyhow::anyhow!("marks_config_ttl_secs must be greater than 0"));
        }
        if self.cache.max_capacity == 0 {
            return Err(anyhow::anyhow!("max_capacity must be greater than 0"));
        }

        if self.session.ttl_minutes <= 0 {
            return Err(anyhow::anyhow!("ttl_minutes must be greater than 0"));
        }

        self.export_format()?;
        if self.export.output_directory.trim().is_empty() {
            return Err(anyhow::anyhow!("output_directory cannot be empty"));
        }

        Ok(())
    }

    /// Default export format as a typed value
    pub fn export_format(&self) -> Result<OutputFormat> {
        self.export
            .default_format
            .parse()
            .map_err(|_| {
                anyhow::anyhow!(
                    "Invalid export format: {}. Must be one of: [\"txt\", \"csv\", \"json\"]",
                    self.export.default_format
                )
            })
    }

    /// Time-to-live of cached marks configurations
    #[must_use]
    pub const fn marks_config_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.marks_config_ttl_secs)
    }

    /// Export directory: the requested one, else `export.output_directory`
    #[must_use]
    pub fn export_dir(&self, requested: Option<PathBuf>) -> PathBuf {
        requested.unwrap_or_else(|| PathBuf::from(&self.export.output_directory))
    }

    /// Snapshot path, `CAMPUS_SNAPSHOT` taking precedence over the config
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        std::env::var("CAMPUS_SNAPSHOT")
            .map_or_else(|_| PathBuf::from(&self.store.snapshot_path), PathBuf::from)
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.timetable.allow_overwrite);
        assert_eq!(config.cache.marks_config_ttl_secs, 300);
        assert_eq!(config.export_format().unwrap(), OutputFormat::Txt);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.cache.max_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.export.default_format = "pdf".to_string();
        assert!(config.validate().is_err());
    }
}
