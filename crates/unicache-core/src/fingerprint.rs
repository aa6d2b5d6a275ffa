//! Shape fingerprints and the per-process fingerprint registry

use std::any::TypeId;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Shape, ShapeWriter};

/// 64-bit digest of a type's shape
///
/// Derived from SHA-256 so the value is identical in every process and build
/// that shares the type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Wrap a raw value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Fingerprint a canonical shape string
    pub fn of_shape(shape: &str) -> Self {
        let digest = Sha256::digest(shape.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(head))
    }

    /// Raw value
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A value that can be stored in a unicache cache
///
/// Implemented by `#[derive(CacheValue)]` for structs and enums, and below for
/// common std types.
pub trait CacheValue: Shape + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Identifier written into every payload of this type
    fn type_tag() -> Cow<'static, str>;
}

macro_rules! std_cache_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CacheValue for $ty {
                fn type_tag() -> Cow<'static, str> {
                    Cow::Owned(ShapeWriter::shape_of::<Self>())
                }
            }
        )*
    };
}

std_cache_value!(bool, char, i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, f32, f64, String);

impl<T: CacheValue> CacheValue for Option<T> {
    fn type_tag() -> Cow<'static, str> {
        Cow::Owned(format!("Option<{}>", T::type_tag()))
    }
}

impl<T: CacheValue> CacheValue for Vec<T> {
    fn type_tag() -> Cow<'static, str> {
        Cow::Owned(format!("Seq<{}>", T::type_tag()))
    }
}

impl<V: CacheValue> CacheValue for HashMap<String, V> {
    fn type_tag() -> Cow<'static, str> {
        Cow::Owned(format!("Map<str,{}>", V::type_tag()))
    }
}

impl<V: CacheValue> CacheValue for BTreeMap<String, V> {
    fn type_tag() -> Cow<'static, str> {
        Cow::Owned(format!("Map<str,{}>", V::type_tag()))
    }
}

/// Memoized identity of one concrete type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFingerprint {
    /// Type identifier written into payloads
    pub tag: Arc<str>,
    /// Fingerprint of `shape`
    pub fingerprint: Fingerprint,
    /// Canonical shape string
    pub shape: Arc<str>,
}

impl TypeFingerprint {
    /// Compute the identity of `T` without memoization
    pub fn compute<T: CacheValue>() -> Self {
        let shape = ShapeWriter::shape_of::<T>();
        Self {
            tag: Arc::from(T::type_tag().as_ref()),
            fingerprint: Fingerprint::of_shape(&shape),
            shape: Arc::from(shape),
        }
    }
}

/// Lazily computed, process-lifetime map from type to fingerprint
///
/// Owned by the cache layer and shared by `Arc` with every codec; the first
/// lookup for a type computes its shape, later lookups are a map read.
#[derive(Debug, Default)]
pub struct FingerprintRegistry {
    entries: DashMap<TypeId, TypeFingerprint>,
}

impl FingerprintRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (computing on first use) the identity of `T`
    pub fn fingerprint_of<T: CacheValue>(&self) -> TypeFingerprint {
        let id = TypeId::of::<T>();
        if let Some(entry) = self.entries.get(&id) {
            return entry.clone();
        }
        let computed = TypeFingerprint::compute::<T>();
        tracing::trace!(
            target: "unicache",
            tag = %computed.tag,
            fingerprint = %computed.fingerprint,
            "computed type fingerprint"
        );
        self.entries.entry(id).or_insert(computed).clone()
    }

    /// Number of memoized types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no type has been fingerprinted yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every memoized type, sorted by tag
    pub fn known_types(&self) -> Vec<TypeFingerprint> {
        let mut types: Vec<_> = self.entries.iter().map(|e| e.value().clone()).collect();
        types.sort_by(|a, b| a.tag.cmp(&b.tag));
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unicache_derive::CacheValue;

    mod v1 {
        use super::*;

        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, CacheValue)]
        #[cache_value(tag = "Article")]
        pub struct Article {
            pub title: String,
        }
    }

    mod v2 {
        use super::*;

        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, CacheValue)]
        #[cache_value(tag = "Article")]
        pub struct Article {
            pub title: String,
            pub subtitle: Option<String>,
        }
    }

    mod nested_v1 {
        use super::*;

        #[derive(Debug, Clone, Serialize, Deserialize, CacheValue)]
        pub struct Address {
            pub city: String,
        }

        #[derive(Debug, Clone, Serialize, Deserialize, CacheValue)]
        #[cache_value(tag = "Customer")]
        pub struct Customer {
            pub name: String,
            pub addresses: Vec<Address>,
        }
    }

    mod nested_v2 {
        use super::*;

        #[derive(Debug, Clone, Serialize, Deserialize, CacheValue)]
        pub struct Address {
            pub city: String,
            pub zip: u32,
        }

        #[derive(Debug, Clone, Serialize, Deserialize, CacheValue)]
        #[cache_value(tag = "Customer")]
        pub struct Customer {
            pub name: String,
            pub addresses: Vec<Address>,
        }
    }

    mod lines_v1 {
        use super::*;

        pub mod part {
            use super::*;

            #[derive(Debug, Clone, Serialize, Deserialize, CacheValue)]
            pub struct Item {
                pub qty: u32,
            }
        }

        #[derive(Debug, Clone, Serialize, Deserialize, CacheValue)]
        #[cache_value(tag = "Item")]
        pub struct Item {
            pub name: String,
            pub part: part::Item,
        }
    }

    mod lines_v2 {
        use super::*;

        pub mod part {
            use super::*;

            #[derive(Debug, Clone, Serialize, Deserialize, CacheValue)]
            pub struct Item {
                pub qty: u32,
                pub discount: Option<u32>,
            }
        }

        #[derive(Debug, Clone, Serialize, Deserialize, CacheValue)]
        #[cache_value(tag = "Item")]
        pub struct Item {
            pub name: String,
            pub part: part::Item,
        }
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = Fingerprint::of_shape("Article{title:str}");
        let b = Fingerprint::of_shape("Article{title:str}");
        assert_eq!(a, b);
        assert_ne!(a, Fingerprint::of_shape("Article{title:str,subtitle:Option<str>}"));
    }

    #[test]
    fn test_shape_change_changes_fingerprint() {
        let registry = FingerprintRegistry::new();
        let old = registry.fingerprint_of::<v1::Article>();
        let new = registry.fingerprint_of::<v2::Article>();

        assert_eq!(old.tag, new.tag);
        assert_ne!(old.fingerprint, new.fingerprint);
    }

    #[test]
    fn test_nested_change_changes_root_fingerprint() {
        let old = TypeFingerprint::compute::<nested_v1::Customer>();
        let new = TypeFingerprint::compute::<nested_v2::Customer>();
        assert_eq!(old.tag, new.tag);
        assert_ne!(old.fingerprint, new.fingerprint);
    }

    #[test]
    fn test_nested_type_sharing_the_root_name_is_fingerprinted() {
        let old = TypeFingerprint::compute::<lines_v1::Item>();
        let new = TypeFingerprint::compute::<lines_v2::Item>();

        assert_eq!(&*old.shape, "Item{name:str,part:Item{qty:u32}}");
        assert_eq!(
            &*new.shape,
            "Item{name:str,part:Item{qty:u32,discount:Option<u32>}}"
        );
        assert_ne!(old.fingerprint, new.fingerprint);
    }

    #[test]
    fn test_registry_memoizes() {
        let registry = FingerprintRegistry::new();
        assert!(registry.is_empty());

        let first = registry.fingerprint_of::<v1::Article>();
        let second = registry.fingerprint_of::<v1::Article>();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);

        registry.fingerprint_of::<u64>();
        let tags: Vec<_> = registry.known_types().iter().map(|t| t.tag.to_string()).collect();
        assert_eq!(tags, vec!["Article".to_string(), "u64".to_string()]);
    }

    #[test]
    fn test_std_type_tags() {
        assert_eq!(<Vec<String> as CacheValue>::type_tag(), "Seq<str>");
        assert_eq!(<Option<i32> as CacheValue>::type_tag(), "Option<i32>");
    }
}
