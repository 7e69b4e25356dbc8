//! # Discharge Validator Errors
//!
//! Error types shared by every crate of the Discharge Validator.
//!
//! Every failure in the system is classified into one [`ErrorKind`]. The kind,
//! not the concrete error type, decides how far a failure propagates:
//! - `Transient` and `Parse` are absorbed at the check boundary
//! - `Validation` and `FatalConfig` terminate the whole run

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classification carried on the wire in `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad or empty input, rejected before the run starts.
    Validation,
    /// Network or timeout condition on a model call.
    Transient,
    /// Bad credentials or a misconfigured provider.
    FatalConfig,
    /// Model response not in the expected schema.
    Parse
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Transient => "TRANSIENT",
            ErrorKind::FatalConfig => "FATAL_CONFIG",
            ErrorKind::Parse => "PARSE"
        }
    }

    /// Whether the failure terminates the enclosing run.
    #[must_use]
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, ErrorKind::Validation | ErrorKind::FatalConfig)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model gateway errors
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Request to {provider} failed: {reason}")]
    Network { provider: String, reason: String },

    #[error("Request to {provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("{provider} is unavailable (HTTP {status}): {reason}")]
    Unavailable {
        provider: String,
        status: u16,
        reason: String
    },

    #[error("{provider} rejected the credentials (HTTP {status})")]
    Unauthorized { provider: String, status: u16 },

    #[error("{provider} is misconfigured: {reason}")]
    Misconfigured { provider: String, reason: String },

    #[error("Could not parse {provider} response: {reason}")]
    Parse { provider: String, reason: String }
}

impl GatewayError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Network { .. }
            | GatewayError::Timeout { .. }
            | GatewayError::Unavailable { .. } => ErrorKind::Transient,
            GatewayError::Unauthorized { .. } | GatewayError::Misconfigured { .. } => {
                ErrorKind::FatalConfig
            }
            GatewayError::Parse { .. } => ErrorKind::Parse
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Result cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection error: {reason}")]
    Connection { reason: String },

    #[error("Cache serialization error: {reason}")]
    Serialization { reason: String },

    #[error("Cache operation error: {reason}")]
    Operation { reason: String }
}

/// Document rejection reasons
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Document content is empty")]
    EmptyDocument,

    #[error("Document too large: {length} bytes max {max}")]
    DocumentTooLarge { length: usize, max: usize },

    #[error("Document is not valid UTF-8: invalid sequence at byte {valid_up_to}")]
    InvalidEncoding { valid_up_to: usize },

    #[error("Unknown provider: {provider}")]
    UnknownProvider { provider: String }
}

impl ValidationError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Run-terminating failures surfaced as a single `error` event.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Provider {provider} is not configured: {reason}")]
    ProviderNotConfigured { provider: String, reason: String },

    #[error("Check {check} cannot run: {source}")]
    Gateway {
        check: String,
        #[source]
        source: GatewayError
    },

    #[error("No instructions for check {check} with provider {provider}")]
    MissingInstructions { check: String, provider: String }
}

impl RunError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::Validation(_) => ErrorKind::Validation,
            RunError::ProviderNotConfigured { .. } | RunError::MissingInstructions { .. } => {
                ErrorKind::FatalConfig
            }
            RunError::Gateway { source, .. } => source.kind()
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Configuration validation failed: {reason}")]
    Invalid { reason: String }
}
