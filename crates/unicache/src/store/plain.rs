//! Single-value cache

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use unicache_core::{
    CacheBackend, CacheKey, CacheMetrics, CacheOperation, CacheStats, CacheValue, JsonSerializer,
    MissReason, NoopMetrics, Serializer, ValueCodec,
};
use unicache_storage::PrefixEvictor;

use super::{Cache, StoreConfig, StoreCore};

/// Cache with one value per key and no version slots
///
/// Payloads still carry their type fingerprint, so a value written by a build
/// with a different shape reads as a miss.
pub struct PlainCache<B, S = JsonSerializer, M = NoopMetrics>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    core: StoreCore<B, S, M>,
}

impl<B: CacheBackend> PlainCache<B, JsonSerializer, NoopMetrics> {
    /// Create a cache with the JSON codec, no metrics and default config
    pub fn new(name: impl Into<String>, backend: Arc<B>) -> Self {
        Self::with_config(name, backend, StoreConfig::default())
    }

    /// Create with custom config
    pub fn with_config(name: impl Into<String>, backend: Arc<B>, config: StoreConfig) -> Self {
        Self::with_codec_and_metrics(
            name,
            backend,
            ValueCodec::json(),
            Arc::new(NoopMetrics),
            config,
        )
    }
}

impl<B, S, M> PlainCache<B, S, M>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    /// Create a cache with a custom codec and metrics
    pub fn with_codec_and_metrics(
        name: impl Into<String>,
        backend: Arc<B>,
        codec: ValueCodec<S>,
        metrics: Arc<M>,
        config: StoreConfig,
    ) -> Self {
        Self {
            core: StoreCore::new(name.into(), backend, codec, metrics, config),
        }
    }

    /// TTL applied to written keys
    pub fn ttl(&self) -> Option<Duration> {
        self.core.ttl()
    }

    /// Bulk delete strategy in use
    pub fn evictor(&self) -> PrefixEvictor {
        self.core.evictor()
    }
}

#[async_trait]
impl<B, S, M> Cache for PlainCache<B, S, M>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    fn name(&self) -> &str {
        &self.core.name
    }

    async fn get<K, T>(&self, key: &K) -> Option<T>
    where
        K: CacheKey + ?Sized,
        T: CacheValue,
    {
        let start = Instant::now();
        let core = &self.core;
        let storage_key = core.keys.encode(key);

        let value = match core.call(core.backend.get(&storage_key)).await {
            Ok(Some(bytes)) => match core.codec.decode::<T>(&bytes) {
                Ok(value) => {
                    core.hit();
                    Some(value)
                }
                Err(e) => {
                    let reason = core.absorb(CacheOperation::Get, &storage_key, &e);
                    core.miss(reason);
                    None
                }
            },
            Ok(None) => {
                core.miss(MissReason::Absent);
                None
            }
            Err(e) => {
                let reason = core.absorb(CacheOperation::Get, &storage_key, &e);
                core.miss(reason);
                None
            }
        };

        core.metrics
            .record_latency(&core.name, CacheOperation::Get, start.elapsed());
        value
    }

    async fn put<K, T>(&self, key: &K, value: &T)
    where
        K: CacheKey + ?Sized,
        T: CacheValue,
    {
        let start = Instant::now();
        let core = &self.core;
        let storage_key = core.keys.encode(key);

        let bytes = match core.codec.encode(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                core.put_failed(&storage_key, &e);
                return;
            }
        };

        match core
            .call(core.backend.set(&storage_key, &bytes, core.write_ttl()))
            .await
        {
            Ok(()) => core.put_succeeded(),
            Err(e) => core.put_failed(&storage_key, &e),
        }

        core.metrics
            .record_latency(&core.name, CacheOperation::Put, start.elapsed());
    }

    async fn evict<K>(&self, key: &K) -> bool
    where
        K: CacheKey + ?Sized,
    {
        self.core.evict(self.core.keys.encode(key)).await
    }

    async fn evict_all<K>(&self, keys: &[K]) -> u64
    where
        K: CacheKey,
    {
        let encoded = keys.iter().map(|key| self.core.keys.encode(key)).collect();
        self.core.evict_all(encoded).await
    }

    async fn clear(&self) -> u64 {
        self.core.clear().await
    }

    fn stats(&self) -> CacheStats {
        self.core.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unicache_storage::MemoryBackend;

    #[tokio::test]
    async fn test_basic_get_put() {
        let backend = Arc::new(MemoryBackend::with_defaults());
        let cache = PlainCache::new("sessions", backend.clone());

        cache.put("ada", &vec![1u32, 2, 3]).await;
        assert_eq!(cache.get::<_, Vec<u32>>("ada").await, Some(vec![1, 2, 3]));
        assert!(backend.contains_key(b"sessions:ada"));
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let backend = Arc::new(MemoryBackend::with_defaults());
        let cache = PlainCache::new("sessions", backend);

        assert_eq!(cache.get::<_, String>("nobody").await, None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_type_change_is_a_miss() {
        let backend = Arc::new(MemoryBackend::with_defaults());
        let cache = PlainCache::new("sessions", backend);

        cache.put("ada", &"token".to_string()).await;
        assert_eq!(cache.get::<_, u64>("ada").await, None);
        assert_eq!(cache.stats().serialization_misses, 1);
    }

    #[tokio::test]
    async fn test_evict_and_clear() {
        let backend = Arc::new(MemoryBackend::with_defaults());
        let cache = PlainCache::new("sessions", backend.clone());

        for i in 0..4u64 {
            cache.put(&i, &i).await;
        }
        assert!(cache.evict(&0u64).await);
        assert!(!cache.evict(&0u64).await);
        assert_eq!(cache.evict_all(&[1u64, 2, 9]).await, 2);
        assert_eq!(cache.clear().await, 1);
        assert!(backend.is_empty());
        assert_eq!(cache.stats().evictions, 4);
    }

    #[tokio::test]
    async fn test_ttl_applied() {
        let backend = Arc::new(MemoryBackend::with_defaults());
        let cache = PlainCache::with_config(
            "sessions",
            backend.clone(),
            StoreConfig::with_ttl(Duration::from_secs(30)),
        );

        cache.put("ada", &1u8).await;
        let ttl = backend.ttl_of(b"sessions:ada").unwrap();
        assert!(ttl <= Duration::from_secs(30));
    }
}
