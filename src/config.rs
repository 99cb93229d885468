//! Configuration management
//!
//! Loads the file-store root and the port-scan settings from an optional
//! `config.toml` with `HAVEN`-prefixed environment overrides. Everything
//! has a sensible default, so a missing file is not an error. The
//! extension policy tables are compiled in and deliberately not
//! configurable here.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Complete configuration for the control panel core
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub storage: StorageConfig,
    pub deploy: DeployConfig,
}

/// File store settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory beneath which all folders and files live.
    pub root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "uploads".to_string(),
        }
    }
}

/// Container deployment settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeployConfig {
    /// Inclusive bounds of the host-port scan range.
    pub port_range_start: u16,
    pub port_range_end: u16,

    /// Ports never handed out even when free: the panel's own web ports and
    /// the fixed ports of catalog services.
    pub reserved_ports: Vec<u16>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            port_range_start: 1024,
            port_range_end: 65535,
            reserved_ports: vec![80, 443, 3000, 8090, 8453],
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml (if present) with environment
    /// overrides, e.g. `HAVEN_STORAGE__ROOT=/srv/files`.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("HAVEN").separator("__"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.root.trim().is_empty() {
            return Err(ConfigError::Message("storage.root cannot be empty".into()));
        }

        if self.deploy.port_range_start == 0 {
            return Err(ConfigError::Message(
                "deploy.port_range_start cannot be 0".into(),
            ));
        }

        if self.deploy.port_range_start > self.deploy.port_range_end {
            return Err(ConfigError::Message(
                "deploy.port_range_start must not exceed deploy.port_range_end".into(),
            ));
        }

        Ok(())
    }
}

impl StorageConfig {
    /// Get the storage root as a PathBuf
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }
}

impl DeployConfig {
    /// Get the inclusive host-port scan range
    pub fn port_range(&self) -> RangeInclusive<u16> {
        self.port_range_start..=self.port_range_end
    }

    /// Get the reserved ports as a lookup set
    pub fn reserved_set(&self) -> HashSet<u16> {
        self.reserved_ports.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.root_path(), PathBuf::from("uploads"));
        assert_eq!(config.deploy.port_range(), 1024..=65535);
        assert!(config.deploy.reserved_set().contains(&8090));
    }

    #[test]
    fn test_inverted_port_range_rejected() {
        let mut config = ServerConfig::default();
        config.deploy.port_range_start = 50000;
        config.deploy.port_range_end = 1024;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_root_rejected() {
        let mut config = ServerConfig::default();
        config.storage.root = "  ".into();
        assert!(config.validate().is_err());
    }
}
