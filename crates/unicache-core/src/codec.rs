//! Self-describing value codec
//!
//! Payload layout:
//!
//! ```text
//! [tag len: u16 BE][tag: UTF-8][fingerprint: u64 BE][body]
//! ```
//!
//! The body is produced by the configured [`Serializer`]. Decoding checks the
//! tag and the fingerprint against the type currently loaded before the body
//! is touched, so a payload written by an incompatible build is rejected
//! rather than decoded on a best-effort basis.

use std::sync::Arc;

use crate::{
    CacheError, CacheValue, Fingerprint, FingerprintRegistry, JsonSerializer, Result, Serializer,
};

const TAG_LEN_BYTES: usize = 2;
const FINGERPRINT_BYTES: usize = 8;

/// Parsed payload header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadHeader {
    /// Type identifier of the writer
    pub tag: String,
    /// Shape fingerprint of the writer's type
    pub fingerprint: Fingerprint,
    /// Offset of the body within the payload
    pub body_offset: usize,
}

impl PayloadHeader {
    /// Parse the header of an encoded payload
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < TAG_LEN_BYTES {
            return Err(CacheError::MalformedPayload(format!(
                "payload of {} bytes has no header",
                bytes.len()
            )));
        }
        let tag_len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
        let tag_end = TAG_LEN_BYTES + tag_len;
        let body_offset = tag_end + FINGERPRINT_BYTES;
        if bytes.len() < body_offset {
            return Err(CacheError::MalformedPayload(format!(
                "header needs {} bytes, payload has {}",
                body_offset,
                bytes.len()
            )));
        }

        let tag = std::str::from_utf8(&bytes[TAG_LEN_BYTES..tag_end])
            .map_err(|e| CacheError::MalformedPayload(format!("type tag is not UTF-8: {e}")))?
            .to_string();

        let mut raw = [0u8; FINGERPRINT_BYTES];
        raw.copy_from_slice(&bytes[tag_end..body_offset]);

        Ok(Self {
            tag,
            fingerprint: Fingerprint::new(u64::from_be_bytes(raw)),
            body_offset,
        })
    }
}

/// Encodes values with their type identity and decodes them back
///
/// Cloning is cheap; clones share the fingerprint registry.
#[derive(Debug, Clone)]
pub struct ValueCodec<S = JsonSerializer> {
    registry: Arc<FingerprintRegistry>,
    serializer: S,
}

impl ValueCodec<JsonSerializer> {
    /// JSON codec with a fresh registry
    pub fn json() -> Self {
        Self::new(Arc::new(FingerprintRegistry::new()), JsonSerializer)
    }
}

impl Default for ValueCodec<JsonSerializer> {
    fn default() -> Self {
        Self::json()
    }
}

impl<S: Serializer> ValueCodec<S> {
    /// Create a codec over a shared registry
    pub fn new(registry: Arc<FingerprintRegistry>, serializer: S) -> Self {
        Self {
            registry,
            serializer,
        }
    }

    /// The registry fingerprints are read from
    pub fn registry(&self) -> &Arc<FingerprintRegistry> {
        &self.registry
    }

    /// Name of the body serializer
    pub fn serializer_name(&self) -> &str {
        self.serializer.name()
    }

    /// Encode a value
    pub fn encode<T: CacheValue>(&self, value: &T) -> Result<Vec<u8>> {
        let identity = self.registry.fingerprint_of::<T>();
        let tag = identity.tag.as_bytes();
        let tag_len = u16::try_from(tag.len()).map_err(|_| {
            CacheError::Serialization(format!("type tag of {} bytes is too long", tag.len()))
        })?;

        let body = self.serializer.serialize(value)?;

        let mut out =
            Vec::with_capacity(TAG_LEN_BYTES + tag.len() + FINGERPRINT_BYTES + body.len());
        out.extend_from_slice(&tag_len.to_be_bytes());
        out.extend_from_slice(tag);
        out.extend_from_slice(&identity.fingerprint.value().to_be_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode a payload written for `T`
    ///
    /// Fails with [`CacheError::UnknownType`] when the payload belongs to a
    /// different type and with [`CacheError::FingerprintMismatch`] when `T`
    /// changed shape since the payload was written.
    pub fn decode<T: CacheValue>(&self, bytes: &[u8]) -> Result<T> {
        let header = PayloadHeader::parse(bytes)?;
        let identity = self.registry.fingerprint_of::<T>();

        if header.tag != *identity.tag {
            return Err(CacheError::UnknownType {
                expected: identity.tag.to_string(),
                found: header.tag,
            });
        }
        if header.fingerprint != identity.fingerprint {
            return Err(CacheError::FingerprintMismatch {
                type_name: header.tag,
                cached: header.fingerprint,
                current: identity.fingerprint,
            });
        }

        self.serializer.deserialize(&bytes[header.body_offset..])
    }

    /// Read a payload's header without decoding the body
    pub fn inspect(&self, bytes: &[u8]) -> Result<PayloadHeader> {
        PayloadHeader::parse(bytes)
    }
}
