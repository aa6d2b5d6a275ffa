//! Registry configuration

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use unicache_core::{CacheError, Result};

/// Default time-to-live: one day
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Default separator between cache name and key
pub const DEFAULT_KEY_DELIMITER: &str = ":";

/// Which cache variant the registry builds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// One slot per application version, with promotion
    #[default]
    Versioned,
    /// One value per key
    Plain,
}

impl FromStr for CacheMode {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "versioned" => Ok(CacheMode::Versioned),
            "plain" => Ok(CacheMode::Plain),
            other => Err(CacheError::Config(format!(
                "unknown cache mode {other:?}, expected \"versioned\" or \"plain\""
            ))),
        }
    }
}

/// Settings for a [`CacheRegistry`](crate::CacheRegistry)
///
/// Deserializable from any serde format; missing fields take their defaults.
/// `from_env` reads the same fields from `UNICACHE_*` variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Version of this deployment; numeric versions enable promotion
    pub application_version: String,
    /// TTL for caches without an override (0 = no expiry)
    pub default_ttl_secs: u64,
    /// Per-cache TTL overrides in seconds
    pub expirations: BTreeMap<String, u64>,
    /// Namespace keys as `<cacheName><delimiter><key>`
    pub use_key_prefix: bool,
    /// Separator for prefixed keys (blank means `:`)
    pub key_delimiter: String,
    /// Fixed set of caches; unknown names are refused when set
    pub cache_names: Option<Vec<String>>,
    /// Cache variant to build
    pub mode: CacheMode,
    /// Force (or forbid) the server-side prefix delete; `None` asks the backend
    pub atomic_pattern_delete: Option<bool>,
    /// Deadline for every backend round trip
    pub operation_timeout_ms: Option<u64>,
    /// Random extra TTL as a fraction of the TTL (0 disables)
    pub ttl_jitter: f64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            application_version: "0".to_string(),
            default_ttl_secs: DEFAULT_TTL_SECS,
            expirations: BTreeMap::new(),
            use_key_prefix: true,
            key_delimiter: DEFAULT_KEY_DELIMITER.to_string(),
            cache_names: None,
            mode: CacheMode::Versioned,
            atomic_pattern_delete: None,
            operation_timeout_ms: None,
            ttl_jitter: 0.0,
        }
    }
}

impl CacheSettings {
    /// Settings for the given application version, everything else default
    pub fn new(application_version: impl Into<String>) -> Self {
        Self {
            application_version: application_version.into(),
            ..Default::default()
        }
    }

    /// Defaults overridden by `UNICACHE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Override fields from a variable lookup
    ///
    /// Recognized variables: `UNICACHE_APPLICATION_VERSION`,
    /// `UNICACHE_DEFAULT_TTL_SECS`, `UNICACHE_EXPIRATIONS` (`name=secs,...`),
    /// `UNICACHE_USE_KEY_PREFIX`, `UNICACHE_KEY_DELIMITER`,
    /// `UNICACHE_CACHE_NAMES` (comma separated), `UNICACHE_MODE`,
    /// `UNICACHE_ATOMIC_PATTERN_DELETE`, `UNICACHE_OPERATION_TIMEOUT_MS`,
    /// `UNICACHE_TTL_JITTER`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(version) = lookup("UNICACHE_APPLICATION_VERSION") {
            self.application_version = version.trim().to_string();
        }
        if let Some(raw) = lookup("UNICACHE_DEFAULT_TTL_SECS") {
            self.default_ttl_secs = parse_var("UNICACHE_DEFAULT_TTL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("UNICACHE_EXPIRATIONS") {
            self.expirations = parse_expirations(&raw)?;
        }
        if let Some(raw) = lookup("UNICACHE_USE_KEY_PREFIX") {
            self.use_key_prefix = parse_var("UNICACHE_USE_KEY_PREFIX", &raw)?;
        }
        if let Some(delimiter) = lookup("UNICACHE_KEY_DELIMITER") {
            self.key_delimiter = delimiter;
        }
        if let Some(raw) = lookup("UNICACHE_CACHE_NAMES") {
            let names: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
            self.cache_names = Some(names);
        }
        if let Some(raw) = lookup("UNICACHE_MODE") {
            self.mode = raw.parse()?;
        }
        if let Some(raw) = lookup("UNICACHE_ATOMIC_PATTERN_DELETE") {
            self.atomic_pattern_delete = Some(parse_var("UNICACHE_ATOMIC_PATTERN_DELETE", &raw)?);
        }
        if let Some(raw) = lookup("UNICACHE_OPERATION_TIMEOUT_MS") {
            self.operation_timeout_ms = Some(parse_var("UNICACHE_OPERATION_TIMEOUT_MS", &raw)?);
        }
        if let Some(raw) = lookup("UNICACHE_TTL_JITTER") {
            self.ttl_jitter = parse_var("UNICACHE_TTL_JITTER", &raw)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject settings no registry can run with
    pub fn validate(&self) -> Result<()> {
        if self.application_version.trim().is_empty() {
            return Err(CacheError::Config(
                "application_version must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::Config(format!(
                "ttl_jitter must be within 0.0..=1.0, got {}",
                self.ttl_jitter
            )));
        }
        // Overrides are also matched case-insensitively, so `Foo` and `FOO`
        // would compete for the same caches.
        let mut folded = HashMap::new();
        for name in self.expirations.keys() {
            if let Some(other) = folded.insert(name.to_ascii_lowercase(), name) {
                return Err(CacheError::Config(format!(
                    "expirations {other:?} and {name:?} differ only in case"
                )));
            }
        }
        if let Some(names) = &self.cache_names {
            if names.iter().any(|name| name.is_empty()) {
                return Err(CacheError::Config(
                    "cache_names must not contain empty names".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// TTL for a cache: exact override, then case-insensitive, then default
    ///
    /// `None` means the cache's keys never expire.
    pub fn ttl_for(&self, cache_name: &str) -> Option<Duration> {
        let secs = self
            .expirations
            .get(cache_name)
            .or_else(|| {
                self.expirations
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(cache_name))
                    .map(|(_, secs)| secs)
            })
            .copied()
            .unwrap_or(self.default_ttl_secs);

        (secs > 0).then(|| Duration::from_secs(secs))
    }

    /// Key delimiter with the blank-means-default rule applied
    pub fn delimiter(&self) -> &str {
        if self.key_delimiter.trim().is_empty() {
            DEFAULT_KEY_DELIMITER
        } else {
            &self.key_delimiter
        }
    }

    /// Backend deadline, if configured
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    /// Builder-style TTL override for one cache
    pub fn expiration(mut self, cache_name: impl Into<String>, secs: u64) -> Self {
        self.expirations.insert(cache_name.into(), secs);
        self
    }

    /// Builder-style fixed cache set
    pub fn fixed_caches<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.cache_names = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| CacheError::Config(format!("invalid {name}={raw:?}: {e}")))
}

fn parse_expirations(raw: &str) -> Result<BTreeMap<String, u64>> {
    let mut expirations = BTreeMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, secs) = pair.split_once('=').ok_or_else(|| {
            CacheError::Config(format!(
                "invalid UNICACHE_EXPIRATIONS entry {pair:?}, expected name=secs"
            ))
        })?;
        expirations.insert(
            name.trim().to_string(),
            parse_var("UNICACHE_EXPIRATIONS", secs)?,
        );
    }
    Ok(expirations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = CacheSettings::default();
        assert_eq!(settings.default_ttl_secs, 86_400);
        assert!(settings.use_key_prefix);
        assert_eq!(settings.delimiter(), ":");
        assert_eq!(settings.mode, CacheMode::Versioned);
        assert_eq!(settings.ttl_for("anything"), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn test_ttl_resolution() {
        let settings = CacheSettings::new("877")
            .expiration("articleCache", 60)
            .expiration("Sessions", 0);

        assert_eq!(settings.ttl_for("articleCache"), Some(Duration::from_secs(60)));
        assert_eq!(settings.ttl_for("ARTICLECACHE"), Some(Duration::from_secs(60)));
        assert_eq!(settings.ttl_for("sessions"), None);
        assert_eq!(settings.ttl_for("users"), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn test_blank_delimiter_falls_back() {
        let settings = CacheSettings {
            key_delimiter: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.delimiter(), ":");
    }

    #[test]
    fn test_env_overrides() {
        let settings = CacheSettings::default()
            .with_env_overrides(env(&[
                ("UNICACHE_APPLICATION_VERSION", "877"),
                ("UNICACHE_DEFAULT_TTL_SECS", "3600"),
                ("UNICACHE_EXPIRATIONS", "articleCache=60, authors=120"),
                ("UNICACHE_CACHE_NAMES", "articleCache, authors,"),
                ("UNICACHE_MODE", "Plain"),
                ("UNICACHE_ATOMIC_PATTERN_DELETE", "false"),
                ("UNICACHE_OPERATION_TIMEOUT_MS", "250"),
            ]))
            .unwrap();

        assert_eq!(settings.application_version, "877");
        assert_eq!(settings.default_ttl_secs, 3600);
        assert_eq!(settings.expirations.get("authors"), Some(&120));
        assert_eq!(
            settings.cache_names,
            Some(vec!["articleCache".to_string(), "authors".to_string()])
        );
        assert_eq!(settings.mode, CacheMode::Plain);
        assert_eq!(settings.atomic_pattern_delete, Some(false));
        assert_eq!(settings.operation_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_env_parse_errors() {
        let err = CacheSettings::default()
            .with_env_overrides(env(&[("UNICACHE_DEFAULT_TTL_SECS", "a day")]))
            .unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));

        let err = CacheSettings::default()
            .with_env_overrides(env(&[("UNICACHE_EXPIRATIONS", "articleCache")]))
            .unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));

        assert!(CacheSettings::default()
            .with_env_overrides(env(&[("UNICACHE_MODE", "tiered")]))
            .is_err());
    }

    #[test]
    fn test_validate() {
        assert!(CacheSettings::new("  ").validate().is_err());
        assert!(CacheSettings {
            ttl_jitter: 1.5,
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(CacheSettings::new("877").validate().is_ok());
    }

    #[test]
    fn test_case_colliding_expirations_are_rejected() {
        let settings = CacheSettings::new("877")
            .expiration("Foo", 60)
            .expiration("FOO", 120);

        let err = settings.validate().unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));

        let err = CacheSettings::default()
            .with_env_overrides(env(&[("UNICACHE_EXPIRATIONS", "Foo=60,FOO=120")]))
            .unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));

        // Distinct names that merely share a prefix are fine
        assert!(CacheSettings::new("877")
            .expiration("Foo", 60)
            .expiration("FooBar", 120)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let settings: CacheSettings = serde_json::from_str(
            r#"{"application_version":"877","expirations":{"articleCache":60},"mode":"plain"}"#,
        )
        .unwrap();

        assert_eq!(settings.application_version, "877");
        assert_eq!(settings.default_ttl_secs, 86_400);
        assert_eq!(settings.mode, CacheMode::Plain);
        assert_eq!(settings.ttl_for("articleCache"), Some(Duration::from_secs(60)));
    }
}
