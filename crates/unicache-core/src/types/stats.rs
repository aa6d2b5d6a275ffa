//! Cache statistics

use std::sync::atomic::{AtomicU64, Ordering};

use crate::MissReason;

/// Snapshot of a cache's counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits (promotions included)
    pub hits: u64,
    /// Number of cache misses, all causes
    pub misses: u64,
    /// Misses caused by an unavailable or slow backing store
    pub unavailable_misses: u64,
    /// Misses caused by a changed type shape
    pub fingerprint_misses: u64,
    /// Misses caused by undecodable payloads
    pub serialization_misses: u64,
    /// Number of successful puts
    pub puts: u64,
    /// Number of puts that were dropped
    pub put_errors: u64,
    /// Number of cross-version promotions
    pub promotions: u64,
    /// Number of keys removed by evict, evict_all and clear
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate miss ratio (0.0 to 1.0)
    pub fn miss_ratio(&self) -> f64 {
        if self.total_requests() == 0 {
            0.0
        } else {
            1.0 - self.hit_ratio()
        }
    }

    /// Total requests (hits + misses)
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Add the counts of another snapshot
    pub fn merge(&mut self, other: &CacheStats) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.unavailable_misses += other.unavailable_misses;
        self.fingerprint_misses += other.fingerprint_misses;
        self.serialization_misses += other.serialization_misses;
        self.puts += other.puts;
        self.put_errors += other.put_errors;
        self.promotions += other.promotions;
        self.evictions += other.evictions;
    }
}

/// Live, lock-free counters owned by one cache
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    unavailable_misses: AtomicU64,
    fingerprint_misses: AtomicU64,
    serialization_misses: AtomicU64,
    puts: AtomicU64,
    put_errors: AtomicU64,
    promotions: AtomicU64,
    evictions: AtomicU64,
}

impl CacheCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a miss under its cause
    pub fn miss(&self, reason: MissReason) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        let by_cause = match reason {
            MissReason::Absent => return,
            MissReason::Unavailable => &self.unavailable_misses,
            MissReason::FingerprintMismatch => &self.fingerprint_misses,
            MissReason::Serialization => &self.serialization_misses,
        };
        by_cause.fetch_add(1, Ordering::Relaxed);
    }

    pub fn put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn put_error(&self) {
        self.put_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn evicted(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Read every counter
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            unavailable_misses: self.unavailable_misses.load(Ordering::Relaxed),
            fingerprint_misses: self.fingerprint_misses.load(Ordering::Relaxed),
            serialization_misses: self.serialization_misses.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            put_errors: self.put_errors.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
