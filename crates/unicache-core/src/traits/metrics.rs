//! Metrics trait for cache observability

use std::time::Duration;

use crate::ErrorKind;

/// Why a `get` returned nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissReason {
    /// No usable slot existed
    Absent,
    /// The backing store failed or timed out
    Unavailable,
    /// The cached shape differs from the loaded type
    FingerprintMismatch,
    /// The payload could not be decoded
    Serialization,
}

impl MissReason {
    /// Get reason as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            MissReason::Absent => "absent",
            MissReason::Unavailable => "unavailable",
            MissReason::FingerprintMismatch => "fingerprint_mismatch",
            MissReason::Serialization => "serialization",
        }
    }
}

/// Cache operation for latency and error labeling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Get,
    Put,
    Evict,
    Clear,
    Promote,
}

impl CacheOperation {
    /// Get operation as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOperation::Get => "get",
            CacheOperation::Put => "put",
            CacheOperation::Evict => "evict",
            CacheOperation::Clear => "clear",
            CacheOperation::Promote => "promote",
        }
    }
}

/// Observer for cache events
///
/// Implement this to export counters to a monitoring system. Every method
/// receives the cache name so one observer can serve a whole registry.
pub trait CacheMetrics: Send + Sync + 'static {
    /// Record a cache hit
    fn record_hit(&self, cache: &str);

    /// Record a cache miss
    fn record_miss(&self, cache: &str, reason: MissReason);

    /// Record a cross-version promotion
    fn record_promotion(&self, cache: &str);

    /// Record a successful put
    fn record_put(&self, cache: &str);

    /// Record an absorbed error
    fn record_error(&self, cache: &str, operation: CacheOperation, kind: ErrorKind);

    /// Record operation latency
    fn record_latency(&self, cache: &str, operation: CacheOperation, duration: Duration);

    /// Record removed keys
    fn record_eviction(&self, cache: &str, count: u64);
}

/// No-op metrics implementation (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    #[inline]
    fn record_hit(&self, _cache: &str) {}

    #[inline]
    fn record_miss(&self, _cache: &str, _reason: MissReason) {}

    #[inline]
    fn record_promotion(&self, _cache: &str) {}

    #[inline]
    fn record_put(&self, _cache: &str) {}

    #[inline]
    fn record_error(&self, _cache: &str, _operation: CacheOperation, _kind: ErrorKind) {}

    #[inline]
    fn record_latency(&self, _cache: &str, _operation: CacheOperation, _duration: Duration) {}

    #[inline]
    fn record_eviction(&self, _cache: &str, _count: u64) {}
}

/// Metrics adapter using the `metrics` crate
///
/// # Example
/// ```ignore
/// use unicache_core::MetricsCrateAdapter;
///
/// // Install a recorder first, e.g. a Prometheus exporter.
/// let metrics = MetricsCrateAdapter::new("unicache");
/// // Emits: unicache_hits_total{cache="articleCache"}, unicache_misses_total{...}, ...
/// ```
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsCrateAdapter {
    prefix: String,
}

#[cfg(feature = "metrics")]
impl MetricsCrateAdapter {
    /// Create a new adapter with the given metric name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn metric_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }
}

#[cfg(feature = "metrics")]
impl CacheMetrics for MetricsCrateAdapter {
    fn record_hit(&self, cache: &str) {
        metrics::counter!(self.metric_name("hits_total"), "cache" => cache.to_string())
            .increment(1);
    }

    fn record_miss(&self, cache: &str, reason: MissReason) {
        metrics::counter!(
            self.metric_name("misses_total"),
            "cache" => cache.to_string(),
            "reason" => reason.as_str()
        )
        .increment(1);
    }

    fn record_promotion(&self, cache: &str) {
        metrics::counter!(self.metric_name("promotions_total"), "cache" => cache.to_string())
            .increment(1);
    }

    fn record_put(&self, cache: &str) {
        metrics::counter!(self.metric_name("puts_total"), "cache" => cache.to_string())
            .increment(1);
    }

    fn record_error(&self, cache: &str, operation: CacheOperation, kind: ErrorKind) {
        metrics::counter!(
            self.metric_name("errors_total"),
            "cache" => cache.to_string(),
            "operation" => operation.as_str(),
            "kind" => kind.as_str()
        )
        .increment(1);
    }

    fn record_latency(&self, cache: &str, operation: CacheOperation, duration: Duration) {
        metrics::histogram!(
            self.metric_name("operation_duration_seconds"),
            "cache" => cache.to_string(),
            "operation" => operation.as_str()
        )
        .record(duration.as_secs_f64());
    }

    fn record_eviction(&self, cache: &str, count: u64) {
        metrics::counter!(self.metric_name("evictions_total"), "cache" => cache.to_string())
            .increment(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_reason_as_str() {
        assert_eq!(MissReason::Absent.as_str(), "absent");
        assert_eq!(MissReason::FingerprintMismatch.as_str(), "fingerprint_mismatch");
    }

    #[test]
    fn test_operation_as_str() {
        assert_eq!(CacheOperation::Get.as_str(), "get");
        assert_eq!(CacheOperation::Promote.as_str(), "promote");
    }

    #[test]
    fn test_noop_metrics() {
        let metrics = NoopMetrics;
        metrics.record_hit("articleCache");
        metrics.record_miss("articleCache", MissReason::Unavailable);
        metrics.record_error(
            "articleCache",
            CacheOperation::Put,
            ErrorKind::BackingStoreUnavailable,
        );
        metrics.record_latency("articleCache", CacheOperation::Get, Duration::from_millis(1));
    }
}
