//! # Configuration Structures
//!
//! This module defines all configuration structures for the Discharge
//! Validator.
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization, with a default for every
//!   field so partial files are accepted
//! - Use `validator` for input validation

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Built-in checks, in the order they are reported when all are enabled.
pub const BUILTIN_CHECKS: [&str; 5] = [
    "linguistic",
    "structural",
    "terminology",
    "clinical_safety",
    "critical_data_safety"
];

/// Main configuration structure for the Discharge Validator.
///
/// ## Usage
/// ```rust,no_run
/// use config::Config;
///
/// let config = Config::default();
/// println!("Listening on {}:{}", config.server.host, config.server.port);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Result cache configuration
    #[serde(default)]
    #[validate(nested)]
    pub cache: CacheConfig,

    /// Model provider credentials and endpoints
    #[serde(default)]
    #[validate(nested)]
    pub providers: ProvidersConfig,

    /// Engine tuning
    #[serde(default)]
    #[validate(nested)]
    pub analysis: AnalysisConfig,

    /// Logging and metrics
    #[serde(default)]
    #[validate(nested)]
    pub observability: ObservabilityConfig
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_server_host")]
    #[validate(length(min = 1, max = 255))]
    pub host: String,

    /// Bind port
    #[serde(default = "default_server_port")]
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    /// Origins allowed by CORS. `*` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cors_origins: default_cors_origins()
        }
    }
}

/// Result cache configuration.
///
/// ## Fields
/// - `backend`: `memory` (in-process, default) or `redis`
/// - `ttl_seconds`: expiry set on every write (default: 86400)
/// - `max_entries`: LRU bound of the in-memory backend (default: 10000)
/// - `key_prefix`: namespace for keys, also scopes `clear` on Redis
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    #[validate(custom(function = "validate_cache_backend"))]
    pub backend: String,

    #[serde(default = "default_cache_ttl")]
    #[validate(range(min = 1))]
    pub ttl_seconds: u64,

    #[serde(default = "default_cache_max_entries")]
    #[validate(range(min = 1))]
    pub max_entries: usize,

    #[serde(default = "default_cache_key_prefix")]
    #[validate(length(min = 1, max = 64), custom(function = "validate_key_prefix"))]
    pub key_prefix: String,

    #[serde(default)]
    #[validate(nested)]
    pub redis: RedisConfig
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_cache_ttl() -> u64 {
    86400
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_cache_key_prefix() -> String {
    "dv".to_string()
}

fn validate_cache_backend(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "memory" | "redis" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid cache backend"))
    }
}

/// Prefixes end up in `SCAN MATCH` patterns, so glob metacharacters are out.
fn validate_key_prefix(value: &str) -> Result<(), validator::ValidationError> {
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-'))
    {
        Ok(())
    } else {
        Err(validator::ValidationError::new("Invalid cache key prefix"))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            ttl_seconds: default_cache_ttl(),
            max_entries: default_cache_max_entries(),
            key_prefix: default_cache_key_prefix(),
            redis: RedisConfig::default()
        }
    }
}

impl CacheConfig {
    pub fn uses_redis(&self) -> bool {
        self.backend == "redis"
    }
}

/// Redis connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct RedisConfig {
    #[serde(default = "default_redis_host")]
    #[validate(length(min = 1, max = 255))]
    pub host: String,

    #[serde(default = "default_redis_port")]
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, max = 15))]
    pub db: u8
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            password: None,
            db: 0
        }
    }
}

impl RedisConfig {
    /// Connection URL in the form accepted by `redis::Client::open`.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) if !password.is_empty() => {
                format!(
                    "redis://:{}@{}:{}/{}",
                    password, self.host, self.port, self.db
                )
            }
            _ => format!("redis://{}:{}/{}", self.host, self.port, self.db)
        }
    }
}

/// Model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default)]
    #[validate(nested)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    #[validate(nested)]
    pub claude: ClaudeConfig
}

/// Gemini settings. The provider is registered only when `api_key` is set.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    #[validate(length(min = 1))]
    pub model: String,

    #[serde(default = "default_gemini_base_url")]
    #[validate(url)]
    pub base_url: String,

    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1, max = 65536))]
    pub max_tokens: u32
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            max_tokens: default_max_tokens()
        }
    }
}

/// Claude settings. The provider is registered only when `api_key` is set.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ClaudeConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_claude_model")]
    #[validate(length(min = 1))]
    pub model: String,

    #[serde(default = "default_claude_base_url")]
    #[validate(url)]
    pub base_url: String,

    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1, max = 65536))]
    pub max_tokens: u32
}

fn default_claude_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_claude_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_claude_model(),
            base_url: default_claude_base_url(),
            max_tokens: default_max_tokens()
        }
    }
}

/// Engine tuning.
///
/// ## Fields
/// - `checks`: enabled checks, in reporting order
/// - `model_timeout_seconds`: deadline of one model call (default: 60)
/// - `retry_base_delay_ms` / `retry_max_delay_ms`: backoff of the single
///   retry after a transient failure
/// - `max_document_bytes`: documents above this size are rejected
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_retry_window"))]
pub struct AnalysisConfig {
    #[serde(default = "default_checks")]
    #[validate(custom(function = "validate_checks"))]
    pub checks: Vec<String>,

    #[serde(default = "default_model_timeout")]
    #[validate(range(min = 1, max = 600))]
    pub model_timeout_seconds: u64,

    #[serde(default = "default_retry_base_delay")]
    #[validate(range(min = 1))]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay")]
    #[validate(range(min = 1))]
    pub retry_max_delay_ms: u64,

    #[serde(default = "default_max_document_bytes")]
    #[validate(range(min = 1))]
    pub max_document_bytes: usize
}

fn default_checks() -> Vec<String> {
    BUILTIN_CHECKS.iter().map(|c| (*c).to_string()).collect()
}

fn default_model_timeout() -> u64 {
    60
}

fn default_retry_base_delay() -> u64 {
    500
}

fn default_retry_max_delay() -> u64 {
    5000
}

fn default_max_document_bytes() -> usize {
    200_000
}

fn validate_checks(checks: &[String]) -> Result<(), validator::ValidationError> {
    if checks.is_empty() {
        return Err(validator::ValidationError::new("At least one check is required"));
    }
    let mut seen = std::collections::HashSet::new();
    for check in checks {
        if !BUILTIN_CHECKS.contains(&check.as_str()) {
            return Err(validator::ValidationError::new("Unknown check"));
        }
        if !seen.insert(check.as_str()) {
            return Err(validator::ValidationError::new("Duplicate check"));
        }
    }
    Ok(())
}

fn validate_retry_window(config: &AnalysisConfig) -> Result<(), validator::ValidationError> {
    if config.retry_base_delay_ms > config.retry_max_delay_ms {
        return Err(validator::ValidationError::new(
            "retry_base_delay_ms must not exceed retry_max_delay_ms"
        ));
    }
    Ok(())
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            checks: default_checks(),
            model_timeout_seconds: default_model_timeout(),
            retry_base_delay_ms: default_retry_base_delay(),
            retry_max_delay_ms: default_retry_max_delay(),
            max_document_bytes: default_max_document_bytes()
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ObservabilityConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    #[validate(custom(function = "validate_log_level"))]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    /// Record metrics and expose `/metrics`
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn validate_log_level(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid log level"))
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            metrics_enabled: default_metrics_enabled()
        }
    }
}
