use crate::backend::{CacheBackend, CacheEntry};
use async_trait::async_trait;
use errors::CacheError;
use redis::AsyncCommands;

const SCAN_BATCH: usize = 500;

/// Escapes `SCAN MATCH` metacharacters so a prefix only matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Shared durable backend. Expiry is delegated to Redis via `SET EX`.
pub struct RedisCacheBackend {
    connection_manager: redis::aio::ConnectionManager
}

impl RedisCacheBackend {
    pub async fn new(connection_string: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(connection_string).map_err(|e| {
            CacheError::Connection {
                reason: e.to_string()
            }
        })?;

        let connection_manager =
            client
                .get_connection_manager()
                .await
                .map_err(|e| CacheError::Connection {
                    reason: e.to_string()
                })?;

        Ok(Self { connection_manager })
    }

    pub async fn from_config(config: &config::RedisConfig) -> Result<Self, CacheError> {
        Self::new(&config.url()).await
    }

    /// Walks the keyspace under `prefix` with `SCAN`, handing each batch to `f`.
    async fn scan_prefix<F>(&self, prefix: &str, mut f: F) -> Result<(), CacheError>
    where
        F: FnMut(Vec<String>) -> Option<Vec<String>>
    {
        let mut conn = self.connection_manager.clone();
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::Operation {
                    reason: e.to_string()
                })?;

            if let Some(to_delete) = f(keys) {
                if !to_delete.is_empty() {
                    let _: usize = conn
                        .del(to_delete)
                        .await
                        .map_err(|e| CacheError::Operation {
                            reason: e.to_string()
                        })?;
                }
            }

            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    fn kind(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let mut conn = self.connection_manager.clone();

        let value: Option<String> = conn.get(key).await.map_err(|e| CacheError::Operation {
            reason: e.to_string()
        })?;

        value
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| CacheError::Serialization {
                    reason: e.to_string()
                })
            })
            .transpose()
    }

    async fn set(
        &self,
        key: &str,
        value: &CacheEntry,
        ttl_seconds: u64
    ) -> Result<(), CacheError> {
        let mut conn = self.connection_manager.clone();

        let json = serde_json::to_string(value).map_err(|e| CacheError::Serialization {
            reason: e.to_string()
        })?;

        let _: () = conn
            .set_ex(key, json, ttl_seconds)
            .await
            .map_err(|e| CacheError::Operation {
                reason: e.to_string()
            })?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection_manager.clone();

        let _: usize = conn.del(key).await.map_err(|e| CacheError::Operation {
            reason: e.to_string()
        })?;

        Ok(())
    }

    async fn clear(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut removed = 0u64;
        self.scan_prefix(prefix, |keys| {
            removed += keys.len() as u64;
            Some(keys)
        })
        .await?;
        Ok(removed)
    }

    async fn len(&self, prefix: &str) -> Result<Option<u64>, CacheError> {
        let mut count = 0u64;
        self.scan_prefix(prefix, |keys| {
            count += keys.len() as u64;
            None
        })
        .await?;
        Ok(Some(count))
    }

    async fn ping(&self) -> bool {
        let mut conn = self.connection_manager.clone();
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_pattern_escapes_prefix() {
        assert_eq!(escape_glob("dv:"), "dv:");
        assert_eq!(escape_glob("dv*"), "dv\\*");
        assert_eq!(escape_glob("a?[b]"), "a\\?\\[b\\]");
        assert_eq!(escape_glob("x\\y"), "x\\\\y");
    }
}
