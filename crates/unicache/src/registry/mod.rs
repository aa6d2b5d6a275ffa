//! Cache registry: one store per cache name

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use unicache_core::{
    AppVersion, CacheBackend, CacheMetrics, CacheStats, FingerprintRegistry, JsonSerializer,
    NoopMetrics, Result, Serializer, ValueCodec,
};
use unicache_storage::PrefixEvictor;

use crate::settings::{CacheMode, CacheSettings};
use crate::store::{Cache, ManagedCache, PlainCache, StoreConfig, VersionedCache};

mod helper;

pub use helper::CacheHelper;

/// Creates and hands out caches by name
///
/// All caches share one backend, one codec (and so one fingerprint registry)
/// and one metrics observer. When `cache_names` is configured the set is fixed
/// and created up front; otherwise a cache is created on first request.
pub struct CacheRegistry<B, S = JsonSerializer, M = NoopMetrics>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    backend: Arc<B>,
    codec: ValueCodec<S>,
    metrics: Arc<M>,
    settings: CacheSettings,
    version: AppVersion,
    caches: DashMap<String, Arc<ManagedCache<B, S, M>>>,
}

impl<B: CacheBackend> CacheRegistry<B, JsonSerializer, NoopMetrics> {
    /// Create a registry with the JSON codec and no metrics
    pub fn new(backend: B, settings: CacheSettings) -> Result<Self> {
        Self::with_codec_and_metrics(
            Arc::new(backend),
            settings,
            ValueCodec::json(),
            Arc::new(NoopMetrics),
        )
    }
}

impl<B, S, M> CacheRegistry<B, S, M>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    /// Create a registry with a custom codec and metrics
    pub fn with_codec_and_metrics(
        backend: Arc<B>,
        settings: CacheSettings,
        codec: ValueCodec<S>,
        metrics: Arc<M>,
    ) -> Result<Self> {
        settings.validate()?;

        let registry = Self {
            backend,
            codec,
            metrics,
            version: AppVersion::new(settings.application_version.clone()),
            settings,
            caches: DashMap::new(),
        };

        if let Some(names) = &registry.settings.cache_names {
            for name in names {
                registry.insert(name);
            }
        }

        tracing::info!(
            target: "unicache",
            backend = registry.backend.name(),
            version = %registry.version,
            mode = ?registry.settings.mode,
            serializer = registry.codec.serializer_name(),
            fixed = registry.settings.cache_names.is_some(),
            "cache registry ready"
        );
        Ok(registry)
    }

    /// Get a cache by name
    ///
    /// Returns `None` for names outside a configured fixed set, and for the
    /// empty name.
    pub fn get_cache(&self, name: &str) -> Option<Arc<ManagedCache<B, S, M>>> {
        if let Some(cache) = self.caches.get(name) {
            return Some(cache.clone());
        }
        if self.settings.cache_names.is_some() || name.is_empty() {
            tracing::debug!(target: "unicache", cache = %name, "unknown cache requested");
            return None;
        }
        Some(self.insert(name))
    }

    fn insert(&self, name: &str) -> Arc<ManagedCache<B, S, M>> {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(self.build(name)))
            .clone()
    }

    fn build(&self, name: &str) -> ManagedCache<B, S, M> {
        let config = self.store_config(name);
        let cache = match self.settings.mode {
            CacheMode::Versioned => ManagedCache::Versioned(VersionedCache::with_codec_and_metrics(
                name,
                self.backend.clone(),
                self.version.clone(),
                self.codec.clone(),
                self.metrics.clone(),
                config,
            )),
            CacheMode::Plain => ManagedCache::Plain(PlainCache::with_codec_and_metrics(
                name,
                self.backend.clone(),
                self.codec.clone(),
                self.metrics.clone(),
                config,
            )),
        };

        tracing::info!(
            target: "unicache",
            cache = %name,
            ttl_secs = cache.ttl().map(|ttl| ttl.as_secs()),
            evictor = cache.evictor().as_str(),
            versioned = cache.is_versioned(),
            "cache created"
        );
        cache
    }

    /// Per-cache config derived from the settings
    pub fn store_config(&self, name: &str) -> StoreConfig {
        let evictor = match self.settings.atomic_pattern_delete {
            Some(atomic) => PrefixEvictor::from_capability(atomic),
            None => PrefixEvictor::for_backend(self.backend.as_ref()),
        };
        StoreConfig {
            ttl: self.settings.ttl_for(name),
            ttl_jitter: self.settings.ttl_jitter,
            use_key_prefix: self.settings.use_key_prefix,
            key_delimiter: self.settings.delimiter().to_string(),
            evictor: Some(evictor),
            operation_timeout: self.settings.operation_timeout(),
        }
    }

    /// TTL a cache gets (or has) for its keys
    pub fn ttl_for(&self, name: &str) -> Option<Duration> {
        self.settings.ttl_for(name)
    }

    /// Names of the caches created so far, sorted
    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Counter snapshot of every cache
    pub fn stats(&self) -> BTreeMap<String, CacheStats> {
        self.caches
            .iter()
            .map(|e| (e.key().clone(), e.value().stats()))
            .collect()
    }

    /// Application version of this process
    pub fn version(&self) -> &AppVersion {
        &self.version
    }

    /// Settings the registry was built with
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Fingerprint registry shared by every cache
    pub fn registry(&self) -> &Arc<FingerprintRegistry> {
        self.codec.registry()
    }

    /// The shared backend
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}
