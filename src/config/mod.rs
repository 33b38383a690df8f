// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Configuration module

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::alerts::AlertConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Log level used when no CLI flag overrides it
    pub log_level: String,

    /// Reading cycle configuration
    pub cycle: CycleConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Alert configuration
    pub alerts: AlertConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "FarmTech".to_string(),
            log_level: "info".to_string(),
            cycle: CycleConfig::default(),
            database: DatabaseConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("invalid config {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("invalid config {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Reject values the cycle cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.cycle.default_plot == 0 {
            bail!("cycle.default_plot must be a positive plot id");
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("farmtech"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Reading cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Plot used when none is given on the command line
    pub default_plot: u32,

    /// Rows shown by `recent` when no limit is given
    pub recent_limit: usize,

    /// Fixed simulator seed; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            default_plot: 1,
            recent_limit: 20,
            seed: None,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database path
    pub path: PathBuf,

    /// How long a write waits on a locked database
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/farmtech.db"),
            busy_timeout_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertTransport;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.cycle.default_plot, 1);
        assert_eq!(config.alerts.transport, AlertTransport::None);
        assert_eq!(config.database.path, PathBuf::from("./data/farmtech.db"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [alerts]
            transport = "webhook"
            webhook_url = "https://hooks.example.org/farm"
            "#,
        )
        .unwrap();

        assert_eq!(config.alerts.transport, AlertTransport::Webhook);
        assert_eq!(config.alerts.webhook_url.as_deref(), Some("https://hooks.example.org/farm"));
        assert_eq!(config.alerts.timeout_ms, 5000);
        assert_eq!(config.cycle.recent_limit, 20);
    }

    #[test]
    fn test_load_or_create_writes_then_reads() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("conf").join("config.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());

        let mut edited = created.clone();
        edited.cycle.default_plot = 7;
        edited.alerts.transport = AlertTransport::Mqtt;
        edited.save(&path).unwrap();

        let loaded = Config::load_or_create(&path).unwrap();
        assert_eq!(loaded.cycle.default_plot, 7);
        assert_eq!(loaded.alerts.transport, AlertTransport::Mqtt);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "cycle = 3").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_zero_default_plot_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cycle]\ndefault_plot = 0\n").unwrap();

        let err = Config::load_or_create(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("default_plot"));
        assert!(Config::default().validate().is_ok());
    }
}
