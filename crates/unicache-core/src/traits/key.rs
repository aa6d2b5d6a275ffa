//! Cache keys and their encoding into backing-store keys

use std::fmt::Display;

/// Trait for types that can be used as cache keys
///
/// The cache name is not part of the key; [`KeyCodec`] adds it.
pub trait CacheKey: Send + Sync {
    /// Logical key string
    fn cache_key(&self) -> String;
}

impl CacheKey for String {
    fn cache_key(&self) -> String {
        self.clone()
    }
}

impl CacheKey for str {
    fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl<K: CacheKey + ?Sized> CacheKey for &K {
    fn cache_key(&self) -> String {
        (**self).cache_key()
    }
}

macro_rules! display_key {
    ($($ty:ty),*) => {
        $(
            impl CacheKey for $ty {
                fn cache_key(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_key!(i16, i32, i64, i128, u16, u32, u64, u128, usize, isize, char);

impl<T1: Display + Send + Sync, T2: Display + Send + Sync> CacheKey for (T1, T2) {
    fn cache_key(&self) -> String {
        format!("{}:{}", self.0, self.1)
    }
}

impl<T1: Display + Send + Sync, T2: Display + Send + Sync, T3: Display + Send + Sync> CacheKey
    for (T1, T2, T3)
{
    fn cache_key(&self) -> String {
        format!("{}:{}:{}", self.0, self.1, self.2)
    }
}

/// Multi-part key, joined with `:`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    parts: Vec<String>,
}

impl CompositeKey {
    /// Create an empty composite key
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a part to the key
    pub fn part(mut self, part: impl Display) -> Self {
        self.parts.push(part.to_string());
        self
    }
}

impl CacheKey for CompositeKey {
    fn cache_key(&self) -> String {
        self.parts.join(":")
    }
}

/// Builds backing-store keys for one cache
///
/// With prefixing enabled every key becomes `<cacheName><delimiter><key>`;
/// the same prefix is what `clear` deletes by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodec {
    prefix: Vec<u8>,
}

impl KeyCodec {
    /// Prefix keys with `cache_name` followed by `delimiter`
    pub fn prefixed(cache_name: &str, delimiter: &str) -> Self {
        let mut prefix = Vec::with_capacity(cache_name.len() + delimiter.len());
        prefix.extend_from_slice(cache_name.as_bytes());
        prefix.extend_from_slice(delimiter.as_bytes());
        Self { prefix }
    }

    /// Use logical keys as-is
    pub fn unprefixed() -> Self {
        Self { prefix: Vec::new() }
    }

    /// The namespace prefix (empty when prefixing is off)
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// True when keys carry a namespace prefix
    pub fn uses_prefix(&self) -> bool {
        !self.prefix.is_empty()
    }

    /// Encode a logical key
    pub fn encode<K: CacheKey + ?Sized>(&self, key: &K) -> Vec<u8> {
        let logical = key.cache_key();
        let mut out = Vec::with_capacity(self.prefix.len() + logical.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(logical.as_bytes());
        out
    }
}
