//! Cache stores
//!
//! [`VersionedCache`] keeps one slot per application version under every
//! key and promotes values across versions when their shape is unchanged.
//! [`PlainCache`] keeps one value per key. Both implement [`Cache`];
//! [`ManagedCache`] is what the registry hands out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use unicache_core::{
    BoxError, CacheBackend, CacheCounters, CacheError, CacheKey, CacheMetrics, CacheOperation,
    CacheStats, CacheValue, ErrorKind, KeyCodec, MissReason, Result, Serializer, ValueCodec,
};
use unicache_storage::PrefixEvictor;

use crate::settings::{DEFAULT_KEY_DELIMITER, DEFAULT_TTL_SECS};

mod plain;
mod versioned;

pub use plain::PlainCache;
pub use versioned::VersionedCache;

/// Operations every cache supports
///
/// Only [`get_or_load`](Cache::get_or_load) can fail: backend and payload
/// problems are logged, counted and turned into misses or no-ops.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Cache name
    fn name(&self) -> &str;

    /// Read a value; any failure is a miss
    async fn get<K, T>(&self, key: &K) -> Option<T>
    where
        K: CacheKey + ?Sized,
        T: CacheValue;

    /// Write a value; failures are absorbed
    async fn put<K, T>(&self, key: &K, value: &T)
    where
        K: CacheKey + ?Sized,
        T: CacheValue;

    /// Write `value` and hand it back
    ///
    /// The write is unconditional: an existing value is overwritten.
    async fn put_if_absent<K, T>(&self, key: &K, value: T) -> T
    where
        K: CacheKey + ?Sized,
        T: CacheValue,
    {
        self.put(key, &value).await;
        value
    }

    /// Read a value, loading and storing it on a miss
    ///
    /// Not atomic: concurrent misses may each run their loader and the last
    /// write wins. A loader failure is returned as [`CacheError::Loader`].
    async fn get_or_load<K, T, F, Fut, E>(&self, key: &K, loader: F) -> Result<T>
    where
        K: CacheKey + ?Sized,
        T: CacheValue,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = std::result::Result<T, E>> + Send,
        E: Into<BoxError> + Send,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let value = loader()
            .await
            .map_err(|e| CacheError::loader(key.cache_key(), e))?;
        self.put(key, &value).await;
        Ok(value)
    }

    /// Remove a key (every version slot); `true` if something was removed
    async fn evict<K>(&self, key: &K) -> bool
    where
        K: CacheKey + ?Sized;

    /// Remove many keys in one call, returning how many were removed
    async fn evict_all<K>(&self, keys: &[K]) -> u64
    where
        K: CacheKey;

    /// Remove every key of this cache, returning how many were removed
    async fn clear(&self) -> u64;

    /// Counter snapshot
    fn stats(&self) -> CacheStats;
}

/// Per-cache knobs shared by both store variants
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Time-to-live of every written key (`None` = no expiry)
    pub ttl: Option<Duration>,
    /// Random extra TTL as a fraction of `ttl`
    pub ttl_jitter: f64,
    /// Namespace keys with the cache name
    pub use_key_prefix: bool,
    /// Separator between cache name and key
    pub key_delimiter: String,
    /// Bulk delete strategy (`None` = what the backend supports)
    pub evictor: Option<PrefixEvictor>,
    /// Deadline for every backend round trip
    pub operation_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: Some(Duration::from_secs(DEFAULT_TTL_SECS)),
            ttl_jitter: 0.0,
            use_key_prefix: true,
            key_delimiter: DEFAULT_KEY_DELIMITER.to_string(),
            evictor: None,
            operation_timeout: None,
        }
    }
}

impl StoreConfig {
    /// Create config with specific TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Default::default()
        }
    }

    /// Keys never expire
    pub fn no_expiry(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Bound every backend call
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Store keys without the cache-name prefix
    pub fn unprefixed(mut self) -> Self {
        self.use_key_prefix = false;
        self
    }

    /// Force a bulk delete strategy
    pub fn evictor(mut self, evictor: PrefixEvictor) -> Self {
        self.evictor = Some(evictor);
        self
    }
}

/// State and plumbing shared by the store variants
pub(crate) struct StoreCore<B, S, M> {
    pub(crate) name: String,
    pub(crate) backend: Arc<B>,
    pub(crate) codec: ValueCodec<S>,
    pub(crate) metrics: Arc<M>,
    pub(crate) keys: KeyCodec,
    pub(crate) counters: Arc<CacheCounters>,
    ttl: Option<Duration>,
    ttl_jitter: f64,
    evictor: PrefixEvictor,
    timeout: Option<Duration>,
}

impl<B, S, M> StoreCore<B, S, M>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    pub(crate) fn new(
        name: String,
        backend: Arc<B>,
        codec: ValueCodec<S>,
        metrics: Arc<M>,
        config: StoreConfig,
    ) -> Self {
        let keys = if config.use_key_prefix {
            let delimiter = if config.key_delimiter.trim().is_empty() {
                DEFAULT_KEY_DELIMITER
            } else {
                config.key_delimiter.as_str()
            };
            KeyCodec::prefixed(&name, delimiter)
        } else {
            KeyCodec::unprefixed()
        };
        let evictor = config
            .evictor
            .unwrap_or_else(|| PrefixEvictor::for_backend(backend.as_ref()));

        Self {
            name,
            backend,
            codec,
            metrics,
            keys,
            counters: Arc::new(CacheCounters::new()),
            ttl: config.ttl.filter(|ttl| !ttl.is_zero()),
            ttl_jitter: config.ttl_jitter.clamp(0.0, 1.0),
            evictor,
            timeout: config.operation_timeout,
        }
    }

    pub(crate) fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub(crate) fn evictor(&self) -> PrefixEvictor {
        self.evictor
    }

    /// TTL for one write, jitter applied
    ///
    /// Jitter that would overflow `Duration` is dropped.
    pub(crate) fn write_ttl(&self) -> Option<Duration> {
        let ttl = self.ttl?;
        if self.ttl_jitter > 0.0 {
            let extra = Duration::try_from_secs_f64(
                ttl.as_secs_f64() * self.ttl_jitter * rand::random::<f64>(),
            )
            .unwrap_or(Duration::ZERO);
            return Some(ttl.checked_add(extra).unwrap_or(ttl));
        }
        Some(ttl)
    }

    /// Run one backend round trip under the configured deadline
    pub(crate) async fn call<F, R>(&self, op: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, op)
                .await
                .map_err(|_| CacheError::Timeout)?,
            None => op.await,
        }
    }

    pub(crate) fn hit(&self) {
        self.counters.hit();
        self.metrics.record_hit(&self.name);
    }

    pub(crate) fn miss(&self, reason: MissReason) {
        self.counters.miss(reason);
        self.metrics.record_miss(&self.name, reason);
    }

    /// Log and count an error that will not reach the caller
    pub(crate) fn absorb(&self, op: CacheOperation, key: &[u8], err: &CacheError) -> MissReason {
        let kind = err.kind();
        let key = String::from_utf8_lossy(key);
        match kind {
            ErrorKind::FingerprintMismatch => tracing::warn!(
                target: "unicache",
                cache = %self.name,
                key = %key,
                operation = op.as_str(),
                error = %err,
                "cached value was written by an incompatible type; treating as a miss"
            ),
            _ => tracing::debug!(
                target: "unicache",
                cache = %self.name,
                key = %key,
                operation = op.as_str(),
                kind = kind.as_str(),
                error = %err,
                "cache operation failed"
            ),
        }
        self.metrics.record_error(&self.name, op, kind);

        match kind {
            ErrorKind::FingerprintMismatch => MissReason::FingerprintMismatch,
            ErrorKind::SerializationFailure => MissReason::Serialization,
            ErrorKind::BackingStoreUnavailable
            | ErrorKind::LoaderFailure
            | ErrorKind::Configuration => MissReason::Unavailable,
        }
    }

    pub(crate) fn put_failed(&self, key: &[u8], err: &CacheError) {
        self.absorb(CacheOperation::Put, key, err);
        self.counters.put_error();
    }

    pub(crate) fn put_succeeded(&self) {
        self.counters.put();
        self.metrics.record_put(&self.name);
    }

    fn evicted(&self, count: u64) {
        if count > 0 {
            self.counters.evicted(count);
            self.metrics.record_eviction(&self.name, count);
        }
    }

    pub(crate) async fn evict(&self, key: Vec<u8>) -> bool {
        match self.call(self.backend.delete(&key)).await {
            Ok(removed) => {
                self.evicted(u64::from(removed));
                removed
            }
            Err(e) => {
                self.absorb(CacheOperation::Evict, &key, &e);
                false
            }
        }
    }

    pub(crate) async fn evict_all(&self, keys: Vec<Vec<u8>>) -> u64 {
        if keys.is_empty() {
            return 0;
        }
        match self.call(self.backend.delete_many(&keys)).await {
            Ok(removed) => {
                self.evicted(removed);
                removed
            }
            Err(e) => {
                self.absorb(CacheOperation::Evict, self.keys.prefix(), &e);
                0
            }
        }
    }

    pub(crate) async fn clear(&self) -> u64 {
        let prefix = self.keys.prefix();
        match self
            .call(self.evictor.clear(self.backend.as_ref(), prefix))
            .await
        {
            Ok(removed) => {
                self.evicted(removed);
                tracing::debug!(
                    target: "unicache",
                    cache = %self.name,
                    removed,
                    "cache cleared"
                );
                removed
            }
            Err(e) => {
                self.absorb(CacheOperation::Clear, prefix, &e);
                0
            }
        }
    }
}

/// A cache built by the registry, of either variant
pub enum ManagedCache<B, S, M>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    Versioned(VersionedCache<B, S, M>),
    Plain(PlainCache<B, S, M>),
}

impl<B, S, M> ManagedCache<B, S, M>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    /// True for the version-slotted variant
    pub fn is_versioned(&self) -> bool {
        matches!(self, ManagedCache::Versioned(_))
    }

    /// TTL applied to written keys
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            ManagedCache::Versioned(cache) => cache.ttl(),
            ManagedCache::Plain(cache) => cache.ttl(),
        }
    }

    /// Bulk delete strategy in use
    pub fn evictor(&self) -> PrefixEvictor {
        match self {
            ManagedCache::Versioned(cache) => cache.evictor(),
            ManagedCache::Plain(cache) => cache.evictor(),
        }
    }
}

#[async_trait]
impl<B, S, M> Cache for ManagedCache<B, S, M>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    fn name(&self) -> &str {
        match self {
            ManagedCache::Versioned(cache) => cache.name(),
            ManagedCache::Plain(cache) => cache.name(),
        }
    }

    async fn get<K, T>(&self, key: &K) -> Option<T>
    where
        K: CacheKey + ?Sized,
        T: CacheValue,
    {
        match self {
            ManagedCache::Versioned(cache) => cache.get(key).await,
            ManagedCache::Plain(cache) => cache.get(key).await,
        }
    }

    async fn put<K, T>(&self, key: &K, value: &T)
    where
        K: CacheKey + ?Sized,
        T: CacheValue,
    {
        match self {
            ManagedCache::Versioned(cache) => cache.put(key, value).await,
            ManagedCache::Plain(cache) => cache.put(key, value).await,
        }
    }

    async fn evict<K>(&self, key: &K) -> bool
    where
        K: CacheKey + ?Sized,
    {
        match self {
            ManagedCache::Versioned(cache) => cache.evict(key).await,
            ManagedCache::Plain(cache) => cache.evict(key).await,
        }
    }

    async fn evict_all<K>(&self, keys: &[K]) -> u64
    where
        K: CacheKey,
    {
        match self {
            ManagedCache::Versioned(cache) => cache.evict_all(keys).await,
            ManagedCache::Plain(cache) => cache.evict_all(keys).await,
        }
    }

    async fn clear(&self) -> u64 {
        match self {
            ManagedCache::Versioned(cache) => cache.clear().await,
            ManagedCache::Plain(cache) => cache.clear().await,
        }
    }

    fn stats(&self) -> CacheStats {
        match self {
            ManagedCache::Versioned(cache) => cache.stats(),
            ManagedCache::Plain(cache) => cache.stats(),
        }
    }
}
