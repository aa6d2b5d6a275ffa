//! Application version identity

use std::fmt;

/// Version of the running application
///
/// Used verbatim as the hash field of every slot this process writes. When the
/// string parses as an integer the cache may promote values from other
/// numbered versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppVersion {
    raw: String,
    ordinal: Option<i64>,
}

impl AppVersion {
    /// Create a version from its string form
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let ordinal = raw.trim().parse::<i64>().ok();
        Self { raw, ordinal }
    }

    /// The version string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Bytes used as the slot field
    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }

    /// Integer form, if the version is numeric
    pub fn ordinal(&self) -> Option<i64> {
        self.ordinal
    }

    /// True when promotion from other versions is possible
    pub fn is_numeric(&self) -> bool {
        self.ordinal.is_some()
    }

    /// Parse a slot field written by any version
    pub fn parse_field(field: &[u8]) -> Option<i64> {
        std::str::from_utf8(field).ok()?.trim().parse().ok()
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for AppVersion {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for AppVersion {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<i64> for AppVersion {
    fn from(version: i64) -> Self {
        Self::new(version.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_version() {
        let v = AppVersion::new("877");
        assert_eq!(v.ordinal(), Some(877));
        assert!(v.is_numeric());
        assert_eq!(v.as_bytes(), b"877");
    }

    #[test]
    fn test_opaque_version() {
        let v = AppVersion::from("2024.10-hotfix");
        assert_eq!(v.ordinal(), None);
        assert!(!v.is_numeric());
        assert_eq!(v.to_string(), "2024.10-hotfix");
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(AppVersion::parse_field(b"876"), Some(876));
        assert_eq!(AppVersion::parse_field(b"-3"), Some(-3));
        assert_eq!(AppVersion::parse_field(b"beta"), None);
        assert_eq!(AppVersion::parse_field(&[0xff, 0xfe]), None);
    }
}
