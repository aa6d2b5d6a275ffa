//! Bulk deletion of every key under a namespace prefix

use unicache_core::{CacheBackend, Result};

/// Keys per delete command in the scan fallback
const DELETE_BATCH: usize = 1000;

/// Strategy for deleting all keys of one cache
///
/// Chosen once from the backend's capabilities. `ServerScript` removes the
/// keys in one atomic server-side step; `ScanDelete` enumerates them first
/// and deletes in batches, so keys written during the scan can survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixEvictor {
    /// One atomic server-side call
    ServerScript,
    /// Client-side enumerate then batch delete
    ScanDelete,
}

impl PrefixEvictor {
    /// Pick the strategy from a scripting capability flag
    pub fn from_capability(scripting: bool) -> Self {
        if scripting {
            PrefixEvictor::ServerScript
        } else {
            PrefixEvictor::ScanDelete
        }
    }

    /// Pick the strategy the backend supports
    pub fn for_backend<B: CacheBackend + ?Sized>(backend: &B) -> Self {
        Self::from_capability(backend.supports_scripting())
    }

    /// Label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefixEvictor::ServerScript => "server_script",
            PrefixEvictor::ScanDelete => "scan_delete",
        }
    }

    /// Delete every key starting with `prefix`, returning how many went
    ///
    /// An empty prefix would match the whole store and is refused.
    pub async fn clear<B: CacheBackend + ?Sized>(&self, backend: &B, prefix: &[u8]) -> Result<u64> {
        if prefix.is_empty() {
            tracing::warn!(
                target: "unicache",
                backend = backend.name(),
                "refusing to clear with an empty key prefix; enable key prefixing to clear a cache"
            );
            return Ok(0);
        }

        let removed = match self {
            PrefixEvictor::ServerScript => backend.delete_prefix_atomic(prefix).await?,
            PrefixEvictor::ScanDelete => {
                let keys = backend.keys_with_prefix(prefix).await?;
                let mut removed = 0;
                for batch in keys.chunks(DELETE_BATCH) {
                    removed += backend.delete_many(batch).await?;
                }
                removed
            }
        };

        tracing::debug!(
            target: "unicache",
            strategy = self.as_str(),
            prefix = %String::from_utf8_lossy(prefix),
            removed,
            "cleared keys by prefix"
        );
        Ok(removed)
    }
}
