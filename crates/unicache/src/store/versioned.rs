//! Version-slotted cache
//!
//! Every key is a hash whose fields are application versions and whose values
//! are encoded payloads. A process reads and writes only its own field. On a
//! miss, a process with a numeric version looks for the newest other numeric
//! version under the same key; if that payload decodes against the local type
//! (same tag, same fingerprint) it is copied into the local slot and served.
//! A payload whose fingerprint differs is never decoded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use unicache_core::{
    AppVersion, CacheBackend, CacheKey, CacheMetrics, CacheOperation, CacheStats, CacheValue,
    JsonSerializer, MissReason, NoopMetrics, Serializer, ValueCodec,
};
use unicache_storage::PrefixEvictor;

use super::{Cache, StoreConfig, StoreCore};

/// Cache that partitions values by application version
///
/// Generic over:
/// - `B`: The backing store (Memory, Redis)
/// - `S`: The body serializer (JSON, MessagePack, Bincode)
/// - `M`: The metrics observer
pub struct VersionedCache<B, S = JsonSerializer, M = NoopMetrics>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    core: StoreCore<B, S, M>,
    version: AppVersion,
}

impl<B: CacheBackend> VersionedCache<B, JsonSerializer, NoopMetrics> {
    /// Create a cache with the JSON codec, no metrics and default config
    pub fn new(name: impl Into<String>, backend: Arc<B>, version: impl Into<AppVersion>) -> Self {
        Self::with_config(name, backend, version, StoreConfig::default())
    }

    /// Create with custom config
    pub fn with_config(
        name: impl Into<String>,
        backend: Arc<B>,
        version: impl Into<AppVersion>,
        config: StoreConfig,
    ) -> Self {
        Self::with_codec_and_metrics(
            name,
            backend,
            version,
            ValueCodec::json(),
            Arc::new(NoopMetrics),
            config,
        )
    }
}

impl<B, S, M> VersionedCache<B, S, M>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    /// Create a cache with a custom codec and metrics
    pub fn with_codec_and_metrics(
        name: impl Into<String>,
        backend: Arc<B>,
        version: impl Into<AppVersion>,
        codec: ValueCodec<S>,
        metrics: Arc<M>,
        config: StoreConfig,
    ) -> Self {
        Self {
            core: StoreCore::new(name.into(), backend, codec, metrics, config),
            version: version.into(),
        }
    }

    /// Application version this cache reads and writes
    pub fn version(&self) -> &AppVersion {
        &self.version
    }

    /// TTL applied to written keys
    pub fn ttl(&self) -> Option<Duration> {
        self.core.ttl()
    }

    /// Bulk delete strategy in use
    pub fn evictor(&self) -> PrefixEvictor {
        self.core.evictor()
    }

    /// Backing-store key for a logical key
    pub fn storage_key<K: CacheKey + ?Sized>(&self, key: &K) -> Vec<u8> {
        self.core.keys.encode(key)
    }

    async fn lookup<T: CacheValue>(&self, key: &[u8]) -> Option<T> {
        let core = &self.core;

        let own = match core.call(core.backend.hget(key, self.version.as_bytes())).await {
            Ok(own) => own,
            Err(e) => {
                let reason = core.absorb(CacheOperation::Get, key, &e);
                core.miss(reason);
                return None;
            }
        };

        if let Some(bytes) = own {
            return match core.codec.decode::<T>(&bytes) {
                Ok(value) => {
                    core.hit();
                    tracing::trace!(
                        target: "unicache",
                        cache = %core.name,
                        key = %String::from_utf8_lossy(key),
                        "cache hit"
                    );
                    Some(value)
                }
                Err(e) => {
                    let reason = core.absorb(CacheOperation::Get, key, &e);
                    core.miss(reason);
                    None
                }
            };
        }

        if !self.version.is_numeric() {
            core.miss(MissReason::Absent);
            return None;
        }
        self.promote(key).await
    }

    /// Serve a value from the newest other numeric version, copying it locally
    async fn promote<T: CacheValue>(&self, key: &[u8]) -> Option<T> {
        let core = &self.core;

        let fields = match core.call(core.backend.hkeys(key)).await {
            Ok(fields) => fields,
            Err(e) => {
                let reason = core.absorb(CacheOperation::Promote, key, &e);
                core.miss(reason);
                return None;
            }
        };

        let own = self.version.ordinal();
        let source = fields
            .into_iter()
            .filter_map(|field| {
                AppVersion::parse_field(&field)
                    .filter(|version| Some(*version) != own)
                    .map(|version| (version, field))
            })
            .max_by_key(|(version, _)| *version);

        let Some((source_version, field)) = source else {
            core.miss(MissReason::Absent);
            tracing::trace!(
                target: "unicache",
                cache = %core.name,
                key = %String::from_utf8_lossy(key),
                "cache miss"
            );
            return None;
        };

        let bytes = match core.call(core.backend.hget(key, &field)).await {
            Ok(Some(bytes)) => bytes,
            // Evicted between enumeration and read
            Ok(None) => {
                core.miss(MissReason::Absent);
                return None;
            }
            Err(e) => {
                let reason = core.absorb(CacheOperation::Promote, key, &e);
                core.miss(reason);
                return None;
            }
        };

        let value = match core.codec.decode::<T>(&bytes) {
            Ok(value) => value,
            Err(e) => {
                let reason = core.absorb(CacheOperation::Promote, key, &e);
                core.miss(reason);
                return None;
            }
        };

        // The payload is already valid for this version; copy the bytes as-is.
        let write = core.backend.hset_with_ttl(
            key,
            self.version.as_bytes(),
            &bytes,
            core.write_ttl(),
        );
        match core.call(write).await {
            Ok(()) => {
                core.counters.promotion();
                core.metrics.record_promotion(&core.name);
                tracing::debug!(
                    target: "unicache",
                    cache = %core.name,
                    key = %String::from_utf8_lossy(key),
                    from = source_version,
                    to = %self.version,
                    "promoted cached value"
                );
            }
            Err(e) => {
                core.absorb(CacheOperation::Promote, key, &e);
            }
        }

        core.hit();
        Some(value)
    }
}

#[async_trait]
impl<B, S, M> Cache for VersionedCache<B, S, M>
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
        let storage_key = self.core.keys.encode(key);
        let value = self.lookup(&storage_key).await;
        self.core
            .metrics
            .record_latency(&self.core.name, CacheOperation::Get, start.elapsed());
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

        let write = core.backend.hset_with_ttl(
            &storage_key,
            self.version.as_bytes(),
            &bytes,
            core.write_ttl(),
        );
        match core.call(write).await {
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
