use crate::backend::{CacheBackend, CacheEntry};
use crate::memory::InMemoryCacheBackend;
use crate::redis_backend::RedisCacheBackend;
use dv_core::{Fingerprint, Issue};
use errors::CacheError;
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Check results keyed by content fingerprint.
///
/// Reads fail closed and writes are best-effort: a broken backend degrades the
/// cache to "always miss" and never fails the caller.
pub struct ResultCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    key_prefix: String,
    hits: AtomicU64,
    misses: AtomicU64,
    write_failures: AtomicU64
}

/// Snapshot reported by `/api/cache/stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub backend: String,
    pub connected: bool,
    pub entries: Option<u64>,
    pub hits: u64,
    pub misses: u64,
    pub write_failures: u64,
    pub hit_rate_percent: f64,
    pub ttl_seconds: u64
}

impl ResultCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration, key_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            ttl,
            key_prefix: key_prefix.into(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            write_failures: AtomicU64::new(0)
        }
    }

    /// In-memory cache with default bounds.
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(InMemoryCacheBackend::new()), ttl, "dv")
    }

    /// Builds the configured backend.
    ///
    /// When Redis is selected but unreachable the cache falls back to the
    /// in-memory backend so the service can still start.
    pub async fn from_config(config: &config::CacheConfig) -> Self {
        let ttl = Duration::from_secs(config.ttl_seconds);
        let fallback = || -> Arc<dyn CacheBackend> {
            Arc::new(InMemoryCacheBackend::with_max_entries(config.max_entries))
        };

        let backend = if config.uses_redis() {
            match RedisCacheBackend::from_config(&config.redis).await {
                Ok(redis) => {
                    tracing::info!(
                        host = %config.redis.host,
                        port = config.redis.port,
                        "Connected to Redis result cache"
                    );
                    Arc::new(redis) as Arc<dyn CacheBackend>
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Redis unavailable, using in-memory cache");
                    fallback()
                }
            }
        } else {
            fallback()
        };

        Self::new(backend, ttl, config.key_prefix.clone())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    fn key(&self, fingerprint: &Fingerprint) -> String {
        format!("{}:{}", self.key_prefix, fingerprint)
    }

    fn scope(&self) -> String {
        format!("{}:", self.key_prefix)
    }

    /// Looks up a previous result. Backend errors read as a miss.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let key = self.key(fingerprint);
        let entry = match self.backend.get(&key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Result cache read failed");
                None
            }
        };

        if entry.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            counter!("dv_cache_hits_total", "backend" => self.backend.kind()).increment(1);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            counter!("dv_cache_misses_total", "backend" => self.backend.kind()).increment(1);
        }
        entry
    }

    /// Stores a computed result. Failures are logged and swallowed.
    pub async fn put(
        &self,
        fingerprint: &Fingerprint,
        check: &str,
        issues: &[Issue],
        duration: Duration
    ) {
        let key = self.key(fingerprint);
        let entry = CacheEntry::new(check, issues.to_vec(), duration.as_millis() as u64);

        if let Err(e) = self.backend.set(&key, &entry, self.ttl.as_secs()).await {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
            counter!("dv_cache_write_failures_total", "backend" => self.backend.kind())
                .increment(1);
            tracing::warn!(key = %key, check, error = %e, "Result cache write failed");
        }
    }

    /// Drops every entry in this cache's namespace.
    pub async fn clear(&self) -> Result<u64, CacheError> {
        let removed = self.backend.clear(&self.scope()).await?;
        tracing::info!(removed, backend = self.backend.kind(), "Result cache cleared");
        Ok(removed)
    }

    pub async fn is_connected(&self) -> bool {
        self.backend.ping().await
    }

    pub async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let entries = match self.backend.len(&self.scope()).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Could not count cache entries");
                None
            }
        };

        CacheStats {
            backend: self.backend.kind().to_string(),
            connected: self.backend.ping().await,
            entries,
            hits,
            misses,
            write_failures: self.write_failures.load(Ordering::Relaxed),
            hit_rate_percent: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64 * 100.0
            },
            ttl_seconds: self.ttl.as_secs()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dv_core::Severity;

    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        fn kind(&self) -> &'static str {
            "broken"
        }

        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
            Err(CacheError::Connection {
                reason: "connection reset".to_string()
            })
        }

        async fn set(
            &self,
            _key: &str,
            _value: &CacheEntry,
            _ttl_seconds: u64
        ) -> Result<(), CacheError> {
            Err(CacheError::Operation {
                reason: "READONLY".to_string()
            })
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Ok(())
        }

        async fn clear(&self, _prefix: &str) -> Result<u64, CacheError> {
            Err(CacheError::Operation {
                reason: "READONLY".to_string()
            })
        }

        async fn len(&self, _prefix: &str) -> Result<Option<u64>, CacheError> {
            Err(CacheError::Operation {
                reason: "READONLY".to_string()
            })
        }

        async fn ping(&self) -> bool {
            false
        }
    }

    fn fp(c: char) -> Fingerprint {
        Fingerprint::from_hex(c.to_string().repeat(64)).unwrap()
    }

    fn issue() -> Issue {
        Issue {
            category: "terminology".to_string(),
            issue_type: "abbreviation".to_string(),
            severity: Severity::Medium,
            location: "Medications".to_string(),
            current: "TID".to_string(),
            suggestion: "three times daily".to_string(),
            explanation: "Avoid ambiguous abbreviations".to_string()
        }
    }

    #[tokio::test]
    async fn test_put_then_get_hits() {
        let cache = ResultCache::in_memory(Duration::from_secs(60));
        assert!(cache.get(&fp('a')).await.is_none());

        cache
            .put(&fp('a'), "terminology", &[issue()], Duration::from_millis(1200))
            .await;
        let entry = cache.get(&fp('a')).await.unwrap();
        assert_eq!(entry.check, "terminology");
        assert_eq!(entry.issues, vec![issue()]);
        assert_eq!(entry.duration_ms, 1200);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, Some(1));
        assert!((stats.hit_rate_percent - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats.backend, "memory");
    }

    #[tokio::test]
    async fn test_broken_backend_fails_closed() {
        let cache = ResultCache::new(Arc::new(BrokenBackend), Duration::from_secs(60), "dv");

        cache
            .put(&fp('b'), "linguistic", &[issue()], Duration::ZERO)
            .await;
        assert!(cache.get(&fp('b')).await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.write_failures, 1);
        assert_eq!(stats.entries, None);
        assert!(!stats.connected);
        assert!(cache.clear().await.is_err());
    }

    #[tokio::test]
    async fn test_clear_only_touches_own_namespace() {
        let backend: Arc<dyn CacheBackend> = Arc::new(InMemoryCacheBackend::new());
        let ours = ResultCache::new(backend.clone(), Duration::from_secs(60), "dv");
        let theirs = ResultCache::new(backend, Duration::from_secs(60), "other");

        ours.put(&fp('c'), "structural", &[], Duration::ZERO).await;
        theirs.put(&fp('c'), "structural", &[], Duration::ZERO).await;

        assert_eq!(ours.clear().await.unwrap(), 1);
        assert!(ours.get(&fp('c')).await.is_none());
        assert!(theirs.get(&fp('c')).await.is_some());
    }

    #[tokio::test]
    async fn test_from_config_falls_back_to_memory() {
        let mut config = config::CacheConfig::default();
        config.backend = "redis".to_string();
        config.redis.host = "127.0.0.1".to_string();
        config.redis.port = 1;

        let cache = ResultCache::from_config(&config).await;
        assert_eq!(cache.backend_kind(), "memory");
        assert_eq!(cache.ttl(), Duration::from_secs(86400));
    }

    #[test]
    fn test_cache_metrics_recorded() {
        use metrics_util::debugging::DebuggingRecorder;

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let cache = ResultCache::in_memory(Duration::from_secs(60));
                cache.get(&fp('d')).await;
            });
        });

        let snapshot = snapshotter.snapshot().into_vec();
        assert!(!snapshot.is_empty(), "Expected cache metrics to be recorded");
    }
}
