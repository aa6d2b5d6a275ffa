//! unicache: version-aware caching over a shared key-value store
//!
//! Several deployed versions of one application can share a cache. Each
//! version reads and writes its own slot under every key; a version that
//! misses may take over another version's value, but only when the value's
//! type has the same shape in both builds. A changed type is a cache miss,
//! never a garbage decode.
//!
//! # Features
//!
//! - **Version slots with promotion** between numbered versions
//! - **Shape fingerprints** via `#[derive(CacheValue)]`
//! - **Pluggable serialization** (JSON, MessagePack, Bincode)
//! - **Redis backend** with atomic or scan-based bulk eviction
//! - **Failure absorption**: backend outages and timeouts are misses
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use unicache::prelude::*;
//!
//! #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, CacheValue)]
//! #[cache_value(crate = "unicache")]
//! struct Article {
//!     title: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let backend = MemoryBackend::new(MemoryConfig::default());
//!     let registry = CacheRegistry::new(backend, CacheSettings::new("877"))?;
//!
//!     let articles = registry.get_cache("articleCache").expect("dynamic caches are enabled");
//!     articles.put(&13u64, &Article { title: "A".into() }).await;
//!
//!     match articles.get::<_, Article>(&13u64).await {
//!         Some(article) => println!("Got: {}", article.title),
//!         None => println!("Cache miss"),
//!     }
//!
//!     Ok(())
//! }
//! ```

mod registry;
mod settings;
mod store;

// Re-export core
pub use unicache_core::*;

// Re-export storage
pub use unicache_storage::PrefixEvictor;

#[cfg(feature = "memory")]
pub use unicache_storage::{MemoryBackend, MemoryConfig};

#[cfg(feature = "redis")]
pub use unicache_storage::{RedisBackend, RedisConfig};

#[cfg(feature = "derive")]
pub use unicache_derive::CacheValue;

pub use registry::{CacheHelper, CacheRegistry};
pub use settings::{CacheMode, CacheSettings, DEFAULT_KEY_DELIMITER, DEFAULT_TTL_SECS};
pub use store::{Cache, ManagedCache, PlainCache, StoreConfig, VersionedCache};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AppVersion, Cache, CacheError, CacheHelper, CacheKey, CacheMode, CacheRegistry,
        CacheSettings, CacheStats, CacheValue, JsonSerializer, ManagedCache, PlainCache, Result,
        Serializer, StoreConfig, ValueCodec, VersionedCache,
    };

    #[cfg(feature = "memory")]
    pub use crate::{MemoryBackend, MemoryConfig};

    #[cfg(feature = "redis")]
    pub use crate::{RedisBackend, RedisConfig};

    #[cfg(feature = "msgpack")]
    pub use crate::MsgPackSerializer;

    #[cfg(feature = "bincode")]
    pub use crate::BincodeSerializer;
}
