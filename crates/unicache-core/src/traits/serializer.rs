//! Pluggable body serialization
//!
//! The serializer only produces the payload *body*; type identity and
//! fingerprint framing is added by [`ValueCodec`](crate::ValueCodec). Bodies
//! must be self-describing enough for any process sharing the type
//! definitions to read them back.

use crate::CacheError;
use serde::{de::DeserializeOwned, Serialize};

/// Body format used inside encoded payloads
pub trait Serializer: Send + Sync + Clone + 'static {
    /// Name of the format (for logs and metrics)
    fn name(&self) -> &str;

    /// Serialize a value to bytes
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError>;

    /// Deserialize bytes to a value
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError>;
}

/// JSON bodies (default)
///
/// Readable with `redis-cli`, which helps when inspecting version slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}

/// MessagePack bodies, field names included
///
/// Enable with the `msgpack` feature.
#[cfg(feature = "msgpack")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackSerializer;

#[cfg(feature = "msgpack")]
impl Serializer for MsgPackSerializer {
    fn name(&self) -> &str {
        "msgpack"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        rmp_serde::to_vec_named(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        rmp_serde::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}

/// Bincode bodies
///
/// Not self-describing: only safe because the fingerprint check rejects any
/// payload whose writer had a different shape. Enable with the `bincode`
/// feature.
#[cfg(feature = "bincode")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

#[cfg(feature = "bincode")]
impl Serializer for BincodeSerializer {
    fn name(&self) -> &str {
        "bincode"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        let (val, _len) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;
        Ok(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_body() {
        let bytes = JsonSerializer.serialize(&vec!["a", "b"]).unwrap();
        assert_eq!(bytes, br#"["a","b"]"#.to_vec());

        let decoded: Vec<String> = JsonSerializer.deserialize(&bytes).unwrap();
        assert_eq!(decoded, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_json_rejects_garbage() {
        let err = JsonSerializer.deserialize::<u32>(b"{not json").unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
    }

    #[cfg(feature = "msgpack")]
    #[test]
    fn test_msgpack_body() {
        let bytes = MsgPackSerializer.serialize(&(1u8, "x")).unwrap();
        let decoded: (u8, String) = MsgPackSerializer.deserialize(&bytes).unwrap();
        assert_eq!(decoded, (1, "x".to_string()));
    }
}
