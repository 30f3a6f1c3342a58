use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "SHOWFETCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/showfetch.toml";
const ENV_PREFIX: &str = "SHOWFETCH";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;

    load_secrets(&mut config);

    Ok(config)
}

/// Credentials for the MyAnimeList handler may come from the environment
/// instead of the TOML file
fn load_secrets(config: &mut Config) {
    for (option, var) in [("username", "MAL_USERNAME"), ("password", "MAL_PASSWORD")] {
        let Ok(value) = env::var(var) else {
            continue;
        };
        let mal = config.info.entry("mal".to_string()).or_default();
        if mal.get_str(option).is_none() {
            mal.insert(option, value);
        }
    }
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // SHOWFETCH__HTTP__USER_AGENT -> http.user_agent
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.http.cache_capacity, 100);
        assert_eq!(
            config.http.rate_limit_wait.as_duration(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[http]
user_agent = "showfetch-test/1.0"
rate_limit_wait = "250ms"
cache_capacity = 10

[services.crunchyroll]
locale = "enUS"

[info.anidb]
client = "holo"
clientver = 2
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(
            config.http.user_agent.as_deref(),
            Some("showfetch-test/1.0")
        );
        assert_eq!(
            config.http.rate_limit_wait.as_duration(),
            Duration::from_millis(250)
        );
        assert_eq!(config.http.cache_capacity, 10);

        let crunchyroll = &config.services["crunchyroll"];
        assert_eq!(crunchyroll.get_str("locale"), Some("enUS"));

        let anidb = &config.info["anidb"];
        assert_eq!(anidb.get_str("client"), Some("holo"));
        assert_eq!(anidb.get_u64("clientver"), Some(2));
    }

    // Environment overrides are not tested here: set_var is unsafe in edition 2024
}
