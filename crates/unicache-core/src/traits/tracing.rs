use crate::{CacheMetrics, CacheOperation, ErrorKind, MissReason};
use std::time::Duration;
use tracing::{debug, trace};

/// Metrics adapter that logs events via `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingMetrics {
    /// Service name (optional)
    service_name: Option<String>,
}

impl TracingMetrics {
    /// Create new tracing metrics adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every event with a service name
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

impl CacheMetrics for TracingMetrics {
    fn record_hit(&self, cache: &str) {
        trace!(
            target: "unicache",
            event = "hit",
            cache = %cache,
            service = ?self.service_name,
            "Cache Hit"
        );
    }

    fn record_miss(&self, cache: &str, reason: MissReason) {
        trace!(
            target: "unicache",
            event = "miss",
            cache = %cache,
            reason = reason.as_str(),
            service = ?self.service_name,
            "Cache Miss"
        );
    }

    fn record_promotion(&self, cache: &str) {
        debug!(
            target: "unicache",
            event = "promotion",
            cache = %cache,
            service = ?self.service_name,
            "Cache Promotion"
        );
    }

    fn record_put(&self, cache: &str) {
        trace!(
            target: "unicache",
            event = "put",
            cache = %cache,
            service = ?self.service_name,
            "Cache Put"
        );
    }

    fn record_error(&self, cache: &str, operation: CacheOperation, kind: ErrorKind) {
        debug!(
            target: "unicache",
            event = "error",
            cache = %cache,
            operation = operation.as_str(),
            kind = kind.as_str(),
            service = ?self.service_name,
            "Cache Error"
        );
    }

    fn record_latency(&self, cache: &str, operation: CacheOperation, duration: Duration) {
        trace!(
            target: "unicache",
            event = "latency",
            cache = %cache,
            operation = operation.as_str(),
            duration_us = duration.as_micros() as u64,
            service = ?self.service_name,
            "Cache Operation Latency"
        );
    }

    fn record_eviction(&self, cache: &str, count: u64) {
        debug!(
            target: "unicache",
            event = "eviction",
            cache = %cache,
            count,
            service = ?self.service_name,
            "Cache Eviction"
        );
    }
}
