//! Cache backend trait

use std::time::Duration;

use async_trait::async_trait;

use crate::CacheError;

/// Remote key-value store under the cache layer
///
/// Keys and hash fields are binary. A versioned cache keeps one hash per key
/// (field = application version, value = payload); the plain cache uses
/// string values. Every call is one round trip and atomic on its own.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Read one hash field
    async fn hget(&self, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>, CacheError>;

    /// Write one hash field, creating the hash if needed
    async fn hset(&self, key: &[u8], field: &[u8], value: &[u8]) -> Result<(), CacheError>;

    /// List the field names of a hash (empty when the key is missing)
    async fn hkeys(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, CacheError>;

    /// Set the time-to-live of a whole key
    ///
    /// Returns `false` when the key does not exist.
    async fn expire(&self, key: &[u8], ttl: Duration) -> Result<bool, CacheError>;

    /// Write one hash field and refresh the key's TTL
    ///
    /// `None` leaves the key without expiry. The default is two round trips;
    /// backends that can pipeline should override it.
    async fn hset_with_ttl(
        &self,
        key: &[u8],
        field: &[u8],
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.hset(key, field, value).await?;
        if let Some(ttl) = ttl {
            self.expire(key, ttl).await?;
        }
        Ok(())
    }

    /// Read a plain value
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CacheError>;

    /// Write a plain value with an optional TTL
    async fn set(&self, key: &[u8], value: &[u8], ttl: Option<Duration>)
        -> Result<(), CacheError>;

    /// Delete a key of any type
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, key: &[u8]) -> Result<bool, CacheError>;

    /// Delete multiple keys in one call
    ///
    /// Returns the number of keys that were deleted.
    async fn delete_many(&self, keys: &[Vec<u8>]) -> Result<u64, CacheError>;

    /// Enumerate every key starting with `prefix`
    ///
    /// Not atomic: keys written while enumerating may be missed.
    async fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, CacheError>;

    /// Delete every key starting with `prefix` in one atomic server-side step
    ///
    /// Returns the number of keys removed.
    async fn delete_prefix_atomic(&self, prefix: &[u8]) -> Result<u64, CacheError> {
        let _ = prefix;
        Err(CacheError::Backend(
            "server-side pattern delete is not supported by this backend".to_string(),
        ))
    }

    /// True when [`delete_prefix_atomic`](Self::delete_prefix_atomic) is available
    fn supports_scripting(&self) -> bool {
        false
    }

    /// Backend name (for logs)
    fn name(&self) -> &'static str;
}
