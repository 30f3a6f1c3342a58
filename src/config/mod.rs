//! Configuration management for showfetch
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use showfetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Rate limit: {}", config.http.rate_limit_wait);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `SHOWFETCH__<section>__<key>`
//!
//! Examples:
//! - `SHOWFETCH__HTTP__USER_AGENT=holo/2.0`
//! - `SHOWFETCH__HTTP__RATE_LIMIT_WAIT=2s`
//! - `SHOWFETCH__INFO__ANIDB__CLIENT=holo`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/showfetch.toml`.
//! This can be overridden using the `SHOWFETCH_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{Config, FetchSettings, HandlerConfig};
pub use validation::ValidationError;

use crate::handlers::Family;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`SHOWFETCH__*`)
    /// 2. TOML file (default: `config/showfetch.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Options block for one handler; unknown keys yield an empty map
    pub fn handler_config(&self, family: Family, key: &str) -> HandlerConfig {
        self.family_configs(family)
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn family_configs(
        &self,
        family: Family,
    ) -> &std::collections::HashMap<String, HandlerConfig> {
        match family {
            Family::Service => &self.services,
            Family::Info => &self.info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[http]
user_agent = "holo/1.0"

[services.crunchyroll]
region = "us"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.services.len(), 1);
        assert!(config.info.is_empty());
    }

    #[test]
    fn test_validation_catches_zero_capacity() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[http]
cache_capacity = 0
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::ZeroCacheCapacity)
        ));
    }

    #[test]
    fn test_handler_config_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[info.mal]
username = "holo"
password = "hunter2"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();

        let mal = config.handler_config(Family::Info, "mal");
        assert_eq!(mal.get_str("username"), Some("holo"));

        // Same key in the other family is unrelated
        assert!(config.handler_config(Family::Service, "mal").is_empty());
        assert!(config.handler_config(Family::Info, "unknown").is_empty());
    }
}
