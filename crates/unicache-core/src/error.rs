//! Error types for cache operations

use std::sync::Arc;

use thiserror::Error;

use crate::Fingerprint;

/// Boxed error returned by caller-supplied loaders
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for all cache operations
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Backend connection failed (refused, dropped, pool exhausted)
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend rejected or failed a command
    #[error("backend error: {0}")]
    Backend(String),

    /// A backend round trip exceeded its deadline
    #[error("operation timed out")]
    Timeout,

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization of the payload body failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Payload header could not be parsed
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Payload was written for a different type
    #[error("unknown type identifier: expected {expected}, found {found}")]
    UnknownType { expected: String, found: String },

    /// Cached value was written by a type with a different shape
    #[error("fingerprint mismatch for {type_name}: cached {cached}, current {current}")]
    FingerprintMismatch {
        type_name: String,
        cached: Fingerprint,
        current: Fingerprint,
    },

    /// A caller-supplied loader failed
    #[error("loader failed for key {key}: {source}")]
    Loader {
        key: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`CacheError`] used for counters and policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Store unreachable, failing or too slow: get misses, put is a no-op
    BackingStoreUnavailable,
    /// Cached shape differs from the loaded type
    FingerprintMismatch,
    /// Bytes could not be produced or understood
    SerializationFailure,
    /// The caller's own loader failed; the only kind that propagates
    LoaderFailure,
    /// Construction-time problems
    Configuration,
}

impl ErrorKind {
    /// Get kind as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BackingStoreUnavailable => "unavailable",
            ErrorKind::FingerprintMismatch => "fingerprint_mismatch",
            ErrorKind::SerializationFailure => "serialization",
            ErrorKind::LoaderFailure => "loader",
            ErrorKind::Configuration => "configuration",
        }
    }
}

impl CacheError {
    /// Wrap a loader failure with the key it was loading
    pub fn loader(key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        let source: BoxError = source.into();
        CacheError::Loader {
            key: key.into(),
            source: Arc::from(source),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CacheError::Connection(_) | CacheError::Backend(_) | CacheError::Timeout => {
                ErrorKind::BackingStoreUnavailable
            }
            CacheError::FingerprintMismatch { .. } => ErrorKind::FingerprintMismatch,
            CacheError::Serialization(_)
            | CacheError::Deserialization(_)
            | CacheError::MalformedPayload(_)
            | CacheError::UnknownType { .. } => ErrorKind::SerializationFailure,
            CacheError::Loader { .. } => ErrorKind::LoaderFailure,
            CacheError::Config(_) | CacheError::Internal(_) => ErrorKind::Configuration,
        }
    }

    /// True when the backing store could not serve the request
    pub fn is_unavailable(&self) -> bool {
        self.kind() == ErrorKind::BackingStoreUnavailable
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::Connection("refused".to_string());
        assert_eq!(err.to_string(), "connection error: refused");

        let err = CacheError::FingerprintMismatch {
            type_name: "Article".to_string(),
            cached: Fingerprint::new(1),
            current: Fingerprint::new(2),
        };
        assert_eq!(
            err.to_string(),
            "fingerprint mismatch for Article: cached 0000000000000001, current 0000000000000002"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(CacheError::Timeout.kind(), ErrorKind::BackingStoreUnavailable);
        assert_eq!(
            CacheError::Backend("WRONGTYPE".into()).kind(),
            ErrorKind::BackingStoreUnavailable
        );
        assert_eq!(
            CacheError::UnknownType {
                expected: "a".into(),
                found: "b".into()
            }
            .kind(),
            ErrorKind::SerializationFailure
        );
        assert!(CacheError::Connection("x".into()).is_unavailable());
        assert!(!CacheError::MalformedPayload("x".into()).is_unavailable());
    }

    #[test]
    fn test_loader_error_keeps_key_and_source() {
        let err = CacheError::loader("article:13", "database down");
        assert_eq!(err.kind(), ErrorKind::LoaderFailure);
        assert_eq!(
            err.to_string(),
            "loader failed for key article:13: database down"
        );
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }
}
