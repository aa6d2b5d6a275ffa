//! Core types for cache operations

mod stats;
mod version;

pub use stats::{CacheCounters, CacheStats};
pub use version::AppVersion;
