//! # Configuration System
//!
//! Centralized configuration management for the Discharge Validator.
//!
//! This crate provides:
//! - Configuration structures for the server, cache, providers and engine
//! - Environment variable loading (12-factor app principles)
//! - Configuration file loading (TOML/YAML)
//! - Configuration precedence (env > file > defaults)
//! - Configuration validation

pub mod config;
pub mod file_loader;
pub mod loader;
pub mod precedence;

pub use config::{
    AnalysisConfig, BUILTIN_CHECKS, CacheConfig, ClaudeConfig, Config, GeminiConfig,
    ObservabilityConfig, ProvidersConfig, RedisConfig, ServerConfig
};
pub use file_loader::{ConfigFileError, load_from_file, load_from_toml, load_from_yaml};
pub use loader::{apply_env_overrides, load_from_env};
pub use precedence::{LoadError, load_config, validate};
pub use validator::Validate;
