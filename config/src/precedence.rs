//! # Configuration Precedence
//!
//! Builds the effective configuration from every source.
//!
//! # Precedence Order
//! 1. Environment variables (highest priority)
//! 2. Configuration file
//! 3. Default values (lowest priority)

use crate::config::Config;
use crate::file_loader::{ConfigFileError, load_from_file};
use crate::loader::apply_env_overrides;
use errors::ConfigError;
use std::path::Path;
use validator::Validate;

/// Failure to produce a usable configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    File(#[from] ConfigFileError),

    #[error(transparent)]
    Config(#[from] ConfigError)
}

/// Load, merge and validate the configuration.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_config;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_config(Some(Path::new("dischargeval.toml")))?;
///     println!("Port: {}", config.server.port);
///     Ok(())
/// }
/// ```
pub fn load_config(path: Option<&Path>) -> Result<Config, LoadError> {
    let mut config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            load_from_file(path)?
        }
        None => Config::default()
    };

    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Validate a merged configuration.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    config.validate().map_err(|e| ConfigError::Invalid {
        reason: e.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dischargeval.toml");
        fs::write(&path, "[server]\nport = 8100\n[cache]\nttl_seconds = 120\n").unwrap();

        unsafe {
            env::set_var("API_PORT", "8200");
            env::remove_var("DV_CACHE_TTL_SECONDS");
        }
        let config = load_config(Some(&path)).unwrap();
        unsafe {
            env::remove_var("API_PORT");
        }

        assert_eq!(config.server.port, 8200);
        assert_eq!(config.cache.ttl_seconds, 120);
    }

    #[test]
    #[serial]
    fn test_invalid_merged_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dischargeval.yaml");
        fs::write(&path, "cache:\n  backend: memcached\n").unwrap();
        unsafe {
            env::remove_var("REDIS_ENABLED");
        }

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, LoadError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    #[serial]
    fn test_missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/dischargeval.toml"))).unwrap_err();
        assert!(matches!(err, LoadError::File(ConfigFileError::FileNotFound(_))));
    }
}
