use async_trait::async_trait;
use dv_core::Issue;
use errors::CacheError;
use serde::{Deserialize, Serialize};

/// Storage seam behind [`crate::ResultCache`].
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name reported by cache statistics.
    fn kind(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    async fn set(&self, key: &str, value: &CacheEntry, ttl_seconds: u64)
    -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Removes every entry whose key starts with `prefix`, returning how many
    /// were removed.
    async fn clear(&self, prefix: &str) -> Result<u64, CacheError>;

    /// Number of live entries under `prefix`, when the backend can tell.
    async fn len(&self, prefix: &str) -> Result<Option<u64>, CacheError>;

    async fn ping(&self) -> bool;
}

/// One cached check result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Check that produced the issues.
    pub check: String,
    pub issues: Vec<Issue>,
    /// Time the model call took when the entry was computed.
    pub duration_ms: u64,
    /// Unix timestamp of the write.
    pub cached_at: i64
}

impl CacheEntry {
    pub fn new(check: impl Into<String>, issues: Vec<Issue>, duration_ms: u64) -> Self {
        Self {
            check: check.into(),
            issues,
            duration_ms,
            cached_at: chrono::Utc::now().timestamp()
        }
    }
}
