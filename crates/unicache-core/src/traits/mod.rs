//! Core traits for cache operations

mod backend;
mod key;
mod metrics;
mod serializer;
mod tracing;

pub use backend::CacheBackend;
pub use key::{CacheKey, CompositeKey, KeyCodec};
pub use metrics::{CacheMetrics, CacheOperation, MissReason, NoopMetrics};
pub use serializer::{JsonSerializer, Serializer};
pub use self::tracing::TracingMetrics;

#[cfg(feature = "metrics")]
pub use metrics::MetricsCrateAdapter;

#[cfg(feature = "msgpack")]
pub use serializer::MsgPackSerializer;

#[cfg(feature = "bincode")]
pub use serializer::BincodeSerializer;
