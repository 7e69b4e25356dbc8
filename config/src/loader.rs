//! # Environment Variable Loader
//!
//! Loads configuration from environment variables following 12-factor app
//! principles.
//!
//! # Naming Convention
//! - Deployment variables keep the names used by existing deployments:
//!   `GEMINI_API_KEY`, `ANTHROPIC_API_KEY`, `REDIS_*`, `API_HOST`,
//!   `API_PORT`, `CORS_ORIGINS`
//! - `DV_*`: engine tuning and observability

use crate::config::Config;
use errors::ConfigError;
use std::env;

/// Load configuration from environment variables on top of the defaults.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_env;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_env()?;
///     println!("Cache backend: {}", config.cache.backend);
///     Ok(())
/// }
/// ```
///
/// ## Environment Variables
/// ### Server
/// - `API_HOST`: Bind address (default: "0.0.0.0")
/// - `API_PORT`: Bind port (default: 8000)
/// - `CORS_ORIGINS`: Comma-separated allowed origins
///
/// ### Providers
/// - `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_BASE_URL`
/// - `ANTHROPIC_API_KEY`, `CLAUDE_MODEL`, `ANTHROPIC_BASE_URL`
///
/// ### Cache
/// - `REDIS_ENABLED`: Use the Redis backend (true/false, default: false)
/// - `REDIS_HOST`, `REDIS_PORT`, `REDIS_PASSWORD`, `REDIS_DB`
/// - `DV_CACHE_TTL_SECONDS`: Entry TTL (default: 86400)
/// - `DV_CACHE_MAX_ENTRIES`: In-memory LRU bound (default: 10000)
/// - `DV_CACHE_KEY_PREFIX`: Key namespace (default: "dv")
///
/// ### Analysis
/// - `DV_CHECKS`: Comma-separated enabled checks
/// - `DV_MODEL_TIMEOUT_SECONDS`: Deadline of one model call (default: 60)
/// - `DV_RETRY_BASE_DELAY_MS`, `DV_RETRY_MAX_DELAY_MS`
/// - `DV_MAX_DOCUMENT_BYTES`: Largest accepted document (default: 200000)
///
/// ### Observability
/// - `DV_LOG_LEVEL`: Default log filter (default: "info")
/// - `DV_JSON_LOGS`: JSON log lines (true/false, default: false)
/// - `DV_METRICS_ENABLED`: Record metrics (true/false, default: true)
pub fn load_from_env() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Overwrite every field whose environment variable is set.
///
/// Unset variables leave the field untouched; malformed values are an error.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    apply_server(config)?;
    apply_providers(config);
    apply_cache(config)?;
    apply_analysis(config)?;
    apply_observability(config)?;
    Ok(())
}

fn apply_server(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(host) = string_env("API_HOST") {
        config.server.host = host;
    }
    if let Some(port) = parse_env("API_PORT")? {
        config.server.port = port;
    }
    if let Some(origins) = list_env("CORS_ORIGINS") {
        config.server.cors_origins = origins;
    }
    Ok(())
}

fn apply_providers(config: &mut Config) {
    let gemini = &mut config.providers.gemini;
    if let Some(key) = string_env("GEMINI_API_KEY") {
        gemini.api_key = Some(key);
    }
    if let Some(model) = string_env("GEMINI_MODEL") {
        gemini.model = model;
    }
    if let Some(url) = string_env("GEMINI_BASE_URL") {
        gemini.base_url = url;
    }

    let claude = &mut config.providers.claude;
    if let Some(key) = string_env("ANTHROPIC_API_KEY") {
        claude.api_key = Some(key);
    }
    if let Some(model) = string_env("CLAUDE_MODEL") {
        claude.model = model;
    }
    if let Some(url) = string_env("ANTHROPIC_BASE_URL") {
        claude.base_url = url;
    }
}

fn apply_cache(config: &mut Config) -> Result<(), ConfigError> {
    let cache = &mut config.cache;
    if let Some(enabled) = bool_env("REDIS_ENABLED")? {
        cache.backend = if enabled { "redis" } else { "memory" }.to_string();
    }
    if let Some(host) = string_env("REDIS_HOST") {
        cache.redis.host = host;
    }
    if let Some(port) = parse_env("REDIS_PORT")? {
        cache.redis.port = port;
    }
    if let Some(password) = string_env("REDIS_PASSWORD") {
        cache.redis.password = Some(password);
    }
    if let Some(db) = parse_env("REDIS_DB")? {
        cache.redis.db = db;
    }
    if let Some(ttl) = parse_env("DV_CACHE_TTL_SECONDS")? {
        cache.ttl_seconds = ttl;
    }
    if let Some(max_entries) = parse_env("DV_CACHE_MAX_ENTRIES")? {
        cache.max_entries = max_entries;
    }
    if let Some(prefix) = string_env("DV_CACHE_KEY_PREFIX") {
        cache.key_prefix = prefix;
    }
    Ok(())
}

fn apply_analysis(config: &mut Config) -> Result<(), ConfigError> {
    let analysis = &mut config.analysis;
    if let Some(checks) = list_env("DV_CHECKS") {
        analysis.checks = checks;
    }
    if let Some(timeout) = parse_env("DV_MODEL_TIMEOUT_SECONDS")? {
        analysis.model_timeout_seconds = timeout;
    }
    if let Some(base) = parse_env("DV_RETRY_BASE_DELAY_MS")? {
        analysis.retry_base_delay_ms = base;
    }
    if let Some(cap) = parse_env("DV_RETRY_MAX_DELAY_MS")? {
        analysis.retry_max_delay_ms = cap;
    }
    if let Some(max) = parse_env("DV_MAX_DOCUMENT_BYTES")? {
        analysis.max_document_bytes = max;
    }
    Ok(())
}

fn apply_observability(config: &mut Config) -> Result<(), ConfigError> {
    let observability = &mut config.observability;
    if let Some(level) = string_env("DV_LOG_LEVEL") {
        observability.log_level = level.to_lowercase();
    }
    if let Some(json) = bool_env("DV_JSON_LOGS")? {
        observability.json_logs = json;
    }
    if let Some(enabled) = bool_env("DV_METRICS_ENABLED")? {
        observability.metrics_enabled = enabled;
    }
    Ok(())
}

/// Non-empty, trimmed value of `key`.
fn string_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn list_env(key: &str) -> Option<Vec<String>> {
    string_env(key).map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect()
    })
}

fn bool_env(key: &str) -> Result<Option<bool>, ConfigError> {
    match string_env(key) {
        None => Ok(None),
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a boolean, got {raw:?}")
            })
        }
    }
}

fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display
{
    match string_env(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 12] = [
        "API_HOST",
        "API_PORT",
        "CORS_ORIGINS",
        "GEMINI_API_KEY",
        "ANTHROPIC_API_KEY",
        "REDIS_ENABLED",
        "REDIS_HOST",
        "REDIS_PORT",
        "DV_CHECKS",
        "DV_CACHE_TTL_SECONDS",
        "DV_LOG_LEVEL",
        "DV_JSON_LOGS"
    ];

    fn clear_vars() {
        for var in VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_load_from_env_defaults() {
        clear_vars();
        let config = load_from_env().unwrap();
        assert_eq!(config, Config::default());
        assert!(config.providers.gemini.api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_load_from_env_overrides() {
        clear_vars();
        unsafe {
            env::set_var("API_PORT", "9000");
            env::set_var("CORS_ORIGINS", "http://a.test, http://b.test");
            env::set_var("GEMINI_API_KEY", "g-key");
            env::set_var("REDIS_ENABLED", "TRUE");
            env::set_var("REDIS_HOST", "cache.internal");
            env::set_var("DV_CHECKS", "linguistic,clinical_safety");
            env::set_var("DV_CACHE_TTL_SECONDS", "60");
            env::set_var("DV_LOG_LEVEL", "DEBUG");
        }

        let config = load_from_env().unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.server.cors_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(config.providers.gemini.api_key.as_deref(), Some("g-key"));
        assert!(config.providers.claude.api_key.is_none());
        assert!(config.cache.uses_redis());
        assert_eq!(config.cache.redis.host, "cache.internal");
        assert_eq!(config.analysis.checks, vec!["linguistic", "clinical_safety"]);
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.observability.log_level, "debug");

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_blank_api_key_is_ignored() {
        clear_vars();
        unsafe {
            env::set_var("ANTHROPIC_API_KEY", "   ");
        }
        let config = load_from_env().unwrap();
        assert!(config.providers.claude.api_key.is_none());
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_malformed_values_are_rejected() {
        clear_vars();
        unsafe {
            env::set_var("API_PORT", "eighty");
        }
        let err = load_from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "API_PORT"));

        clear_vars();
        unsafe {
            env::set_var("DV_JSON_LOGS", "maybe");
        }
        assert!(load_from_env().is_err());
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_redis_disabled_selects_memory() {
        clear_vars();
        let mut config = Config::default();
        config.cache.backend = "redis".to_string();
        unsafe {
            env::set_var("REDIS_ENABLED", "false");
        }
        apply_env_overrides(&mut config).unwrap();
        assert!(!config.cache.uses_redis());
        clear_vars();
    }
}
