use crate::backend::{CacheBackend, CacheEntry};
use async_trait::async_trait;
use errors::CacheError;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Process-local backend: LRU-bounded, expiry checked on read.
pub struct InMemoryCacheBackend {
    entries: Mutex<LruCache<String, (CacheEntry, Instant)>>
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity))
        }
    }
}

impl Default for InMemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some((entry, expires_at)) if Instant::now() < *expires_at => {
                return Ok(Some(entry.clone()));
            }
            Some(_) => true,
            None => false
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: &CacheEntry,
        ttl_seconds: u64
    ) -> Result<(), CacheError> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds);
        let mut entries = self.entries.lock().await;
        entries.put(key.to_string(), (value.clone(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().await.pop(key);
        Ok(())
    }

    async fn clear(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut entries = self.entries.lock().await;
        let keys: Vec<String> = entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            entries.pop(key);
        }
        Ok(keys.len() as u64)
    }

    async fn len(&self, prefix: &str) -> Result<Option<u64>, CacheError> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        let live = entries
            .iter()
            .filter(|(k, (_, expires_at))| k.starts_with(prefix) && now < *expires_at)
            .count();
        Ok(Some(live as u64))
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(check: &str) -> CacheEntry {
        CacheEntry::new(check, Vec::new(), 42)
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let backend = InMemoryCacheBackend::new();
        backend.set("dv:a", &entry("linguistic"), 60).await.unwrap();

        let cached = backend.get("dv:a").await.unwrap().unwrap();
        assert_eq!(cached.check, "linguistic");
        assert_eq!(cached.duration_ms, 42);
        assert!(backend.get("dv:b").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let backend = InMemoryCacheBackend::new();
        backend.set("dv:a", &entry("structural"), 10).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(backend.get("dv:a").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(backend.get("dv:a").await.unwrap().is_none());
        assert_eq!(backend.len("dv:").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let backend = InMemoryCacheBackend::with_max_entries(2);
        backend.set("dv:1", &entry("a"), 60).await.unwrap();
        backend.set("dv:2", &entry("b"), 60).await.unwrap();

        // touch 1 so 2 becomes the eviction candidate
        assert!(backend.get("dv:1").await.unwrap().is_some());
        backend.set("dv:3", &entry("c"), 60).await.unwrap();

        assert!(backend.get("dv:1").await.unwrap().is_some());
        assert!(backend.get("dv:2").await.unwrap().is_none());
        assert!(backend.get("dv:3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overwrite_is_last_write_wins() {
        let backend = InMemoryCacheBackend::new();
        backend.set("dv:a", &entry("first"), 60).await.unwrap();
        backend.set("dv:a", &entry("second"), 60).await.unwrap();
        assert_eq!(backend.get("dv:a").await.unwrap().unwrap().check, "second");
        assert_eq!(backend.len("dv:").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_clear_is_prefix_scoped() {
        let backend = InMemoryCacheBackend::new();
        backend.set("dv:a", &entry("a"), 60).await.unwrap();
        backend.set("dv:b", &entry("b"), 60).await.unwrap();
        backend.set("other:c", &entry("c"), 60).await.unwrap();

        assert_eq!(backend.clear("dv:").await.unwrap(), 2);
        assert!(backend.get("dv:a").await.unwrap().is_none());
        assert!(backend.get("other:c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = InMemoryCacheBackend::new();
        backend.set("dv:a", &entry("a"), 60).await.unwrap();
        backend.delete("dv:a").await.unwrap();
        assert!(backend.get("dv:a").await.unwrap().is_none());
    }
}
