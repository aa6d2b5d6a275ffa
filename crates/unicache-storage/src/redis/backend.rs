use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::{AsyncCommands, RedisError, Script};
use std::time::Duration;
use unicache_core::{CacheBackend, CacheError, Result};

use super::config::RedisConfig;

/// Deletes every key matching `ARGV[1]`, in batches small enough for `unpack`
const DELETE_PATTERN_LUA: &str = r#"
local keys = redis.call('KEYS', ARGV[1])
local removed = 0
for i = 1, #keys, 5000 do
    removed = removed + redis.call('DEL', unpack(keys, i, math.min(i + 4999, #keys)))
end
return removed
"#;

/// Redis backend implementation
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool<RedisConnectionManager>,
    config: RedisConfig,
    delete_pattern: Script,
}

impl RedisBackend {
    /// Create a new Redis backend
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|e| CacheError::Config(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(map_redis_err)?;

        tracing::info!(
            target: "unicache",
            url = %config.url,
            pool_size = config.pool_size,
            scripting = config.scripting,
            "connected to redis"
        );

        Ok(Self {
            pool,
            config,
            delete_pattern: Script::new(DELETE_PATTERN_LUA),
        })
    }

    /// Backend configuration
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Get connection from pool
    async fn get_connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }
}

/// Classify a Redis error
///
/// Anything that means "the store could not be reached" maps to
/// [`CacheError::Connection`]; command failures map to [`CacheError::Backend`].
pub(crate) fn map_redis_err(e: RedisError) -> CacheError {
    if e.is_io_error()
        || e.is_connection_refusal()
        || e.is_connection_dropped()
        || e.is_timeout()
        || e.is_cluster_error()
    {
        CacheError::Connection(e.to_string())
    } else {
        CacheError::Backend(e.to_string())
    }
}

/// Escape glob metacharacters so `prefix` matches literally
pub(crate) fn escape_glob(prefix: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + 1);
    for &b in prefix {
        if matches!(b, b'*' | b'?' | b'[' | b']' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out
}

fn prefix_pattern(prefix: &[u8]) -> Vec<u8> {
    let mut pattern = escape_glob(prefix);
    pattern.push(b'*');
    pattern
}

fn ttl_millis(ttl: Duration) -> i64 {
    ttl.as_millis().clamp(1, i64::MAX as u128) as i64
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn hget(&self, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut conn = self.get_connection().await?;
        conn.hget(key, field).await.map_err(map_redis_err)
    }

    async fn hset(&self, key: &[u8], field: &[u8], value: &[u8]) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: i64 = conn.hset(key, field, value).await.map_err(map_redis_err)?;
        Ok(())
    }

    async fn hkeys(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut conn = self.get_connection().await?;
        conn.hkeys(key).await.map_err(map_redis_err)
    }

    async fn expire(&self, key: &[u8], ttl: Duration) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        conn.pexpire(key, ttl_millis(ttl))
            .await
            .map_err(map_redis_err)
    }

    async fn hset_with_ttl(
        &self,
        key: &[u8],
        field: &[u8],
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<()> {
        let mut conn = self.get_connection().await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.hset(key, field, value).ignore();
        if let Some(ttl) = ttl {
            pipe.pexpire(key, ttl_millis(ttl)).ignore();
        }

        pipe.query_async::<()>(&mut *conn)
            .await
            .map_err(map_redis_err)
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut conn = self.get_connection().await?;
        conn.get(key).await.map_err(map_redis_err)
    }

    async fn set(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.get_connection().await?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }

        cmd.query_async::<()>(&mut *conn)
            .await
            .map_err(map_redis_err)
    }

    async fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let deleted: u64 = conn.del(key).await.map_err(map_redis_err)?;
        Ok(deleted > 0)
    }

    async fn delete_many(&self, keys: &[Vec<u8>]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.get_connection().await?;
        conn.del(keys).await.map_err(map_redis_err)
    }

    async fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut conn = self.get_connection().await?;
        let pattern = prefix_pattern(prefix);

        let mut found = Vec::new();
        let mut cursor = 0u64;
        loop {
            let (next_cursor, keys): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(self.config.scan_count)
                .query_async(&mut *conn)
                .await
                .map_err(map_redis_err)?;

            found.extend(keys);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }

    async fn delete_prefix_atomic(&self, prefix: &[u8]) -> Result<u64> {
        let mut conn = self.get_connection().await?;
        self.delete_pattern
            .arg(prefix_pattern(prefix))
            .invoke_async(&mut *conn)
            .await
            .map_err(map_redis_err)
    }

    fn supports_scripting(&self) -> bool {
        self.config.scripting
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob(b"users:"), b"users:".to_vec());
        assert_eq!(escape_glob(b"a*b?[c]"), b"a\\*b\\?\\[c\\]".to_vec());
        assert_eq!(escape_glob(b"x\\y"), b"x\\\\y".to_vec());
    }

    #[test]
    fn test_prefix_pattern() {
        assert_eq!(prefix_pattern(b"articleCache:"), b"articleCache:*".to_vec());
        assert_eq!(prefix_pattern(b"odd*"), b"odd\\**".to_vec());
    }

    #[test]
    fn test_ttl_millis() {
        assert_eq!(ttl_millis(Duration::from_secs(86400)), 86_400_000);
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
    }
}
