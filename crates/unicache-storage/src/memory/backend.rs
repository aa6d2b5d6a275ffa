//! In-memory backend using DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use unicache_core::{CacheBackend, CacheError, Result};

/// Configuration for the memory backend
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Maximum number of keys (0 = unlimited)
    pub max_capacity: usize,
    /// Support the atomic server-side prefix delete
    ///
    /// Turn off to behave like a clustered store where scripts cannot span
    /// keys.
    pub scripting: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: 0,
            scripting: true,
        }
    }
}

impl MemoryConfig {
    /// Create config with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            max_capacity: capacity,
            ..Default::default()
        }
    }

    /// Behave like a clustered store (no cross-key scripts)
    pub fn cluster() -> Self {
        Self {
            scripting: false,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
enum Stored {
    Hash(HashMap<Vec<u8>, Vec<u8>>),
    Plain(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Record {
    value: Stored,
    expires_at: Option<Instant>,
}

impl Record {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn wrong_type() -> CacheError {
    CacheError::Backend(
        "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
    )
}

/// In-memory stand-in for a remote key-value store
///
/// Cloning creates a new handle to the SAME underlying store, so two caches
/// built over clones see each other's writes the way two processes sharing
/// one Redis would. Expired keys are dropped lazily on access.
///
/// Faults can be injected at runtime: [`set_available`](Self::set_available)
/// makes every call fail with a connection error and
/// [`set_latency`](Self::set_latency) delays every call.
#[derive(Clone)]
pub struct MemoryBackend {
    data: Arc<DashMap<Vec<u8>, Record>>,
    /// Writers share, the scripted prefix delete excludes
    write_gate: Arc<RwLock<()>>,
    available: Arc<AtomicBool>,
    latency_us: Arc<AtomicU64>,
    config: MemoryConfig,
}

impl MemoryBackend {
    /// Create a new memory backend
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            write_gate: Arc::new(RwLock::new(())),
            available: Arc::new(AtomicBool::new(true)),
            latency_us: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(MemoryConfig::default())
    }

    /// Simulate an outage (`false`) or recovery (`true`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_us
            .store(latency.as_micros() as u64, Ordering::SeqCst);
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.data.iter().filter(|r| !r.is_expired(now)).count()
    }

    /// True when no live key exists
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `key` exists and has not expired
    pub fn contains_key(&self, key: &[u8]) -> bool {
        let now = Instant::now();
        self.data.get(key).is_some_and(|r| !r.is_expired(now))
    }

    /// Remaining time-to-live of a key (`None` when missing or persistent)
    pub fn ttl_of(&self, key: &[u8]) -> Option<Duration> {
        let now = Instant::now();
        let record = self.data.get(key)?;
        let at = record.expires_at?;
        at.checked_duration_since(now)
    }

    /// Drop expired keys now and return how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.data.len();
        self.data.retain(|_, r| !r.is_expired(now));
        before.saturating_sub(self.data.len())
    }

    /// Simulated round trip: latency, then availability
    async fn round_trip(&self) -> Result<()> {
        let latency = self.latency_us.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_micros(latency)).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(CacheError::Connection(
                "connection refused (memory backend offline)".to_string(),
            ));
        }
        Ok(())
    }

    /// Evict arbitrary keys if at capacity
    fn maybe_evict(&self, incoming: &[u8]) {
        if self.config.max_capacity == 0 || self.data.contains_key(incoming) {
            return;
        }
        if self.data.len() < self.config.max_capacity {
            return;
        }

        let keys_to_remove: Vec<Vec<u8>> = self
            .data
            .iter()
            .take(self.data.len() + 1 - self.config.max_capacity)
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys_to_remove {
            self.data.remove(&key);
        }
    }

    /// Live record for `key`, dropping it if expired
    fn live(&self, key: &[u8]) -> Option<Record> {
        let now = Instant::now();
        let record = self.data.get(key)?.value().clone();
        if record.is_expired(now) {
            self.data.remove_if(key, |_, r| r.is_expired(now));
            return None;
        }
        Some(record)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn hget(&self, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>> {
        self.round_trip().await?;
        match self.live(key) {
            Some(Record {
                value: Stored::Hash(fields),
                ..
            }) => Ok(fields.get(field).cloned()),
            Some(_) => Err(wrong_type()),
            None => Ok(None),
        }
    }

    async fn hset(&self, key: &[u8], field: &[u8], value: &[u8]) -> Result<()> {
        self.round_trip().await?;
        let _gate = self.write_gate.read();
        self.maybe_evict(key);

        let now = Instant::now();
        let mut record = self.data.entry(key.to_vec()).or_insert_with(|| Record {
            value: Stored::Hash(HashMap::new()),
            expires_at: None,
        });
        if record.is_expired(now) {
            *record = Record {
                value: Stored::Hash(HashMap::new()),
                expires_at: None,
            };
        }
        match &mut record.value {
            Stored::Hash(fields) => {
                fields.insert(field.to_vec(), value.to_vec());
                Ok(())
            }
            Stored::Plain(_) => Err(wrong_type()),
        }
    }

    async fn hkeys(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.round_trip().await?;
        match self.live(key) {
            Some(Record {
                value: Stored::Hash(fields),
                ..
            }) => Ok(fields.into_keys().collect()),
            Some(_) => Err(wrong_type()),
            None => Ok(Vec::new()),
        }
    }

    async fn expire(&self, key: &[u8], ttl: Duration) -> Result<bool> {
        self.round_trip().await?;
        let now = Instant::now();
        match self.data.get_mut(key) {
            Some(mut record) if !record.is_expired(now) => {
                record.expires_at = now.checked_add(ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.round_trip().await?;
        match self.live(key) {
            Some(Record {
                value: Stored::Plain(bytes),
                ..
            }) => Ok(Some(bytes)),
            Some(_) => Err(wrong_type()),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.round_trip().await?;
        let _gate = self.write_gate.read();
        self.maybe_evict(key);

        self.data.insert(
            key.to_vec(),
            Record {
                value: Stored::Plain(value.to_vec()),
                expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<bool> {
        self.round_trip().await?;
        let now = Instant::now();
        Ok(self
            .data
            .remove(key)
            .is_some_and(|(_, r)| !r.is_expired(now)))
    }

    async fn delete_many(&self, keys: &[Vec<u8>]) -> Result<u64> {
        self.round_trip().await?;
        let now = Instant::now();
        let mut count = 0;
        for key in keys {
            if self
                .data
                .remove(key.as_slice())
                .is_some_and(|(_, r)| !r.is_expired(now))
            {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.round_trip().await?;
        let now = Instant::now();
        Ok(self
            .data
            .iter()
            .filter(|r| r.key().starts_with(prefix) && !r.is_expired(now))
            .map(|r| r.key().clone())
            .collect())
    }

    async fn delete_prefix_atomic(&self, prefix: &[u8]) -> Result<u64> {
        if !self.config.scripting {
            return Err(CacheError::Backend(
                "CROSSSLOT Keys in request don't hash to the same slot".to_string(),
            ));
        }
        self.round_trip().await?;

        let _gate = self.write_gate.write();
        let now = Instant::now();
        let mut count = 0;
        self.data.retain(|key, record| {
            if key.starts_with(prefix) {
                if !record.is_expired(now) {
                    count += 1;
                }
                false
            } else {
                true
            }
        });
        Ok(count)
    }

    fn supports_scripting(&self) -> bool {
        self.config.scripting
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_slots() {
        let backend = MemoryBackend::with_defaults();

        backend.hset(b"articles:13", b"876", b"a").await.unwrap();
        backend.hset(b"articles:13", b"877", b"b").await.unwrap();

        assert_eq!(
            backend.hget(b"articles:13", b"876").await.unwrap(),
            Some(b"a".to_vec())
        );
        assert_eq!(backend.hget(b"articles:13", b"900").await.unwrap(), None);

        let mut fields = backend.hkeys(b"articles:13").await.unwrap();
        fields.sort();
        assert_eq!(fields, vec![b"876".to_vec(), b"877".to_vec()]);
        assert!(backend.hkeys(b"missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plain_values() {
        let backend = MemoryBackend::with_defaults();

        backend.set(b"key1", b"value1", None).await.unwrap();
        assert_eq!(backend.get(b"key1").await.unwrap(), Some(b"value1".to_vec()));
        assert_eq!(backend.get(b"nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let backend = MemoryBackend::with_defaults();
        backend.set(b"plain", b"v", None).await.unwrap();

        let err = backend.hget(b"plain", b"1").await.unwrap_err();
        assert!(matches!(err, CacheError::Backend(_)));
    }

    #[tokio::test]
    async fn test_expire_applies_to_whole_key() {
        let backend = MemoryBackend::with_defaults();
        backend.hset(b"k", b"1", b"a").await.unwrap();

        assert!(backend.expire(b"k", Duration::from_millis(20)).await.unwrap());
        assert!(backend.ttl_of(b"k").is_some());
        assert!(!backend.expire(b"missing", Duration::from_secs(1)).await.unwrap());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(backend.hget(b"k", b"1").await.unwrap(), None);
        assert!(!backend.contains_key(b"k"));
    }

    #[tokio::test]
    async fn test_hset_with_ttl() {
        let backend = MemoryBackend::with_defaults();
        backend
            .hset_with_ttl(b"k", b"1", b"a", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        let ttl = backend.ttl_of(b"k").unwrap();
        assert!(ttl > Duration::from_secs(59));

        backend.hset_with_ttl(b"p", b"1", b"a", None).await.unwrap();
        assert!(backend.contains_key(b"p"));
        assert_eq!(backend.ttl_of(b"p"), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = MemoryBackend::with_defaults();
        backend.hset(b"key1", b"1", b"v").await.unwrap();

        assert!(backend.delete(b"key1").await.unwrap());
        assert!(!backend.delete(b"key1").await.unwrap());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_delete_many() {
        let backend = MemoryBackend::with_defaults();
        backend.set(b"a", b"1", None).await.unwrap();
        backend.set(b"b", b"2", None).await.unwrap();

        let removed = backend
            .delete_many(&[b"a".to_vec(), b"b".to_vec(), b"c".to_vec()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
    }

    #[tokio::test]
    async fn test_prefix_enumeration_and_atomic_delete() {
        let backend = MemoryBackend::with_defaults();
        backend.set(b"users:1", b"a", None).await.unwrap();
        backend.set(b"users:2", b"b", None).await.unwrap();
        backend.set(b"orders:1", b"c", None).await.unwrap();

        let mut keys = backend.keys_with_prefix(b"users:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec![b"users:1".to_vec(), b"users:2".to_vec()]);

        assert!(backend.supports_scripting());
        assert_eq!(backend.delete_prefix_atomic(b"users:").await.unwrap(), 2);
        assert_eq!(backend.len(), 1);
        assert!(backend.contains_key(b"orders:1"));
    }

    #[tokio::test]
    async fn test_cluster_mode_refuses_scripts() {
        let backend = MemoryBackend::new(MemoryConfig::cluster());
        backend.set(b"users:1", b"a", None).await.unwrap();

        assert!(!backend.supports_scripting());
        assert!(backend.delete_prefix_atomic(b"users:").await.is_err());
        assert!(backend.contains_key(b"users:1"));
    }

    #[tokio::test]
    async fn test_outage() {
        let backend = MemoryBackend::with_defaults();
        backend.set(b"k", b"v", None).await.unwrap();

        let handle = backend.clone();
        handle.set_available(false);
        assert!(matches!(
            backend.get(b"k").await,
            Err(CacheError::Connection(_))
        ));

        handle.set_available(true);
        assert_eq!(backend.get(b"k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let a = MemoryBackend::with_defaults();
        let b = a.clone();

        a.hset(b"k", b"1", b"v").await.unwrap();
        assert_eq!(b.hget(b"k", b"1").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_capacity_eviction() {
        let backend = MemoryBackend::new(MemoryConfig::with_capacity(2));

        backend.set(b"key1", b"1", None).await.unwrap();
        backend.set(b"key2", b"2", None).await.unwrap();
        backend.set(b"key3", b"3", None).await.unwrap();

        assert!(backend.len() <= 2);
        assert!(backend.contains_key(b"key3"));
    }

    #[tokio::test]
    async fn test_ttl_beyond_clock_range_never_expires() {
        let backend = MemoryBackend::with_defaults();

        backend.set(b"plain", b"1", Some(Duration::MAX)).await.unwrap();
        backend.hset(b"hash", b"876", b"2").await.unwrap();
        assert!(backend.expire(b"hash", Duration::MAX).await.unwrap());

        assert_eq!(backend.ttl_of(b"plain"), None);
        assert_eq!(backend.ttl_of(b"hash"), None);
        assert_eq!(backend.get(b"plain").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let backend = MemoryBackend::with_defaults();
        backend
            .set(b"short", b"1", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        backend.set(b"long", b"2", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(backend.cleanup_expired(), 1);
        assert_eq!(backend.len(), 1);
    }
}
