//! unicache-storage: Storage backends and bulk eviction for unicache

mod eviction;

pub use eviction::PrefixEvictor;

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::{MemoryBackend, MemoryConfig};

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "redis")]
pub use self::redis::{RedisBackend, RedisConfig};
