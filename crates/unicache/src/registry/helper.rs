//! Name-addressed convenience calls over a registry

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use unicache_core::{
    CacheBackend, CacheKey, CacheMetrics, CacheValue, JsonSerializer, NoopMetrics, Serializer,
};

use super::CacheRegistry;
use crate::store::Cache;

/// Facade that addresses caches by name
///
/// Every call tolerates unknown cache names: reads come back empty and
/// writes do nothing.
pub struct CacheHelper<B, S = JsonSerializer, M = NoopMetrics>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    registry: Arc<CacheRegistry<B, S, M>>,
}

impl<B, S, M> Clone for CacheHelper<B, S, M>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<B, S, M> CacheHelper<B, S, M>
where
    B: CacheBackend,
    S: Serializer,
    M: CacheMetrics,
{
    pub fn new(registry: Arc<CacheRegistry<B, S, M>>) -> Self {
        Self { registry }
    }

    /// The wrapped registry
    pub fn registry(&self) -> &Arc<CacheRegistry<B, S, M>> {
        &self.registry
    }

    /// True when `name` resolves to a cache
    pub fn is_cache_enabled(&self, name: &str) -> bool {
        self.registry.get_cache(name).is_some()
    }

    pub async fn get<K, T>(&self, name: &str, key: &K) -> Option<T>
    where
        K: CacheKey + ?Sized,
        T: CacheValue,
    {
        let cache = self.registry.get_cache(name)?;
        cache.get(key).await
    }

    /// Read many keys; misses are left out of the result
    pub async fn get_all<K, T>(&self, name: &str, keys: &[K]) -> HashMap<K, T>
    where
        K: CacheKey + Eq + Hash + Clone,
        T: CacheValue,
    {
        let mut found = HashMap::new();
        let Some(cache) = self.registry.get_cache(name) else {
            return found;
        };
        for key in keys {
            if let Some(value) = cache.get(key).await {
                found.insert(key.clone(), value);
            }
        }
        found
    }

    /// Write a value, optionally evicting the key (all versions) first
    pub async fn put<K, T>(&self, name: &str, key: &K, value: &T, evict_first: bool)
    where
        K: CacheKey + ?Sized,
        T: CacheValue,
    {
        let Some(cache) = self.registry.get_cache(name) else {
            return;
        };
        if evict_first {
            cache.evict(key).await;
        }
        cache.put(key, value).await;
    }

    /// Write many values
    pub async fn put_all<K, T, I>(&self, name: &str, entries: I, evict_first: bool)
    where
        K: CacheKey,
        T: CacheValue,
        I: IntoIterator<Item = (K, T)>,
    {
        let Some(cache) = self.registry.get_cache(name) else {
            return;
        };
        for (key, value) in entries {
            if evict_first {
                cache.evict(&key).await;
            }
            cache.put(&key, &value).await;
        }
    }

    pub async fn evict<K>(&self, name: &str, key: &K) -> bool
    where
        K: CacheKey + ?Sized,
    {
        match self.registry.get_cache(name) {
            Some(cache) => cache.evict(key).await,
            None => false,
        }
    }

    pub async fn evict_all<K>(&self, name: &str, keys: &[K]) -> u64
    where
        K: CacheKey,
    {
        match self.registry.get_cache(name) {
            Some(cache) => cache.evict_all(keys).await,
            None => 0,
        }
    }
}
