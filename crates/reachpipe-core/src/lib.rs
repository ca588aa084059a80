use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod registry;

pub use registry::Registry;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("external tool failed: {0}")]
    Tool(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("no working backend: {0}")]
    Unavailable(String),
    #[error("registry error: {0}")]
    Registry(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Marker prepended to `ReadResult.content` when a read degraded into an
/// explanation instead of real content.
pub const WARNING_MARKER: &str = "⚠️";

/// Key-lookup view over credentials and knobs. Explicit values win; then
/// `REACHPIPE_<KEY>`; then the bare upper-cased env var. Never written to.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(v) = self.values.get(key) {
            return Some(v.clone()).filter(|s| !s.trim().is_empty());
        }
        let upper = key.to_ascii_uppercase().replace('-', "_");
        std::env::var(format!("REACHPIPE_{upper}"))
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| std::env::var(&upper).ok().filter(|v| !v.trim().is_empty()))
    }
}

/// Coarse availability classification of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// Works out of the box.
    ZeroConfig,
    /// Needs a free credential.
    FreeCredential,
    /// Needs manual/local setup.
    ManualSetup,
}

impl Tier {
    pub fn as_u8(self) -> u8 {
        match self {
            Tier::ZeroConfig => 0,
            Tier::FreeCredential => 1,
            Tier::ManualSetup => 2,
        }
    }
}

impl Serialize for Tier {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Tier {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        match u8::deserialize(d)? {
            0 => Ok(Tier::ZeroConfig),
            1 => Ok(Tier::FreeCredential),
            2 => Ok(Tier::ManualSetup),
            n => Err(serde::de::Error::custom(format!("tier out of range: {n}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Warn,
    Off,
    Error,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Ok => "ok",
            HealthStatus::Warn => "warn",
            HealthStatus::Off => "off",
            HealthStatus::Error => "error",
        }
    }
}

/// One axis of adapter operability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "yes")]
    Yes,
    #[serde(rename = "no")]
    No,
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl Signal {
    /// Parse a free-form value, coercing anything outside the closed set to
    /// `Unknown` rather than failing.
    pub fn parse_lossy(s: &str) -> Signal {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Signal::Yes,
            "no" => Signal::No,
            "n/a" | "na" => Signal::NotApplicable,
            _ => Signal::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Yes => "yes",
            Signal::No => "no",
            Signal::Unknown => "unknown",
            Signal::NotApplicable => "n/a",
        }
    }
}

/// Four-axis operability classification inferred from a check's status and
/// message. Best-effort by design; see the doctor module in reachpipe-local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSignals {
    pub installed: Signal,
    pub configured: Signal,
    pub reachable: Signal,
    pub authenticated: Signal,
}

/// Content extracted from one URL, normalized across platforms.
///
/// `platform` is always set by the producing adapter. `content` is always a
/// string: degraded reads carry a [`WARNING_MARKER`]-prefixed explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResult {
    pub title: String,
    pub content: String,
    pub url: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<BTreeMap<String, serde_json::Value>>,
}

impl ReadResult {
    pub fn new(
        platform: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            url: url.into(),
            platform: platform.into(),
            author: None,
            date: None,
            extra: None,
        }
    }

    /// Envelope for a read that could not produce real content. The
    /// explanation becomes the content, prefixed with the warning marker.
    pub fn degraded(
        platform: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        explanation: impl AsRef<str>,
    ) -> Self {
        Self::new(
            platform,
            url,
            title,
            format!("{WARNING_MARKER} {}", explanation.as_ref()),
        )
    }

    pub fn is_degraded(&self) -> bool {
        self.content.starts_with(WARNING_MARKER)
    }

    pub fn with_extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value);
        self
    }
}

fn score_is_zero(score: &f64) -> bool {
    *score == 0.0
}

/// One hit from a platform search. Adapters drop hits without a resolvable
/// URL rather than emitting an empty-URL result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "score_is_zero")]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<BTreeMap<String, serde_json::Value>>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: String::new(),
            author: None,
            date: None,
            score: 0.0,
            extra: None,
        }
    }
}

/// One platform integration: a routing predicate, a read path, an optional
/// search path, and a self-check. Implementations are stateless aside from
/// short-lived availability caches and must be safe to call concurrently.
#[async_trait::async_trait]
pub trait Adapter: Send + Sync {
    /// Unique key across the registry, e.g. "github".
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// Backend names in fallback order, primary first.
    fn backends(&self) -> &'static [&'static str];
    fn tier(&self) -> Tier;

    /// Pure, fast host/string predicate. Must not perform I/O.
    fn can_handle(&self, url: &str) -> bool;

    /// Fetch and normalize content. Content-not-found class failures come
    /// back as a degraded [`ReadResult`], never as an error.
    async fn read(&self, url: &str, config: &Config) -> Result<ReadResult>;

    /// Platform search. The default signals capability absence, which is
    /// distinct from a backend answering with zero matches.
    async fn search(
        &self,
        query: &str,
        config: &Config,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let _ = (query, config, limit);
        Err(Error::NotSupported(format!(
            "{} does not support search",
            self.name()
        )))
    }

    /// Availability self-check. The message is human-readable and may span
    /// multiple lines with remediation steps. Errors from here are caught by
    /// the aggregated reporter and rendered as status `error`.
    async fn check(&self, config: &Config) -> Result<(HealthStatus, String)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_result_serializes_only_set_fields() {
        let r = ReadResult::new("web", "u", "T", "C");
        let v = serde_json::to_value(&r).unwrap();
        let obj = v.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["content", "platform", "title", "url"]);
    }

    #[test]
    fn read_result_keeps_optional_fields_when_set() {
        let r = ReadResult {
            author: Some("u/name".to_string()),
            date: Some("2026-01-02".to_string()),
            ..ReadResult::new("reddit", "u", "T", "C")
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["author"], "u/name");
        assert_eq!(v["date"], "2026-01-02");
    }

    #[test]
    fn degraded_read_carries_warning_marker() {
        let r = ReadResult::degraded("web", "u", "T", "page needs login");
        assert!(r.is_degraded());
        assert!(r.content.contains("page needs login"));
    }

    #[test]
    fn search_result_omits_defaults() {
        let hit = SearchResult::new("T", "https://example.com");
        let v = serde_json::to_value(&hit).unwrap();
        let obj = v.as_object().unwrap();
        assert!(!obj.contains_key("snippet"));
        assert!(!obj.contains_key("score"));
        assert!(!obj.contains_key("author"));
    }

    #[test]
    fn signal_parse_is_lossy() {
        assert_eq!(Signal::parse_lossy("yes"), Signal::Yes);
        assert_eq!(Signal::parse_lossy("N/A"), Signal::NotApplicable);
        assert_eq!(Signal::parse_lossy("definitely"), Signal::Unknown);
        assert_eq!(Signal::parse_lossy(""), Signal::Unknown);
    }

    #[test]
    fn signal_serde_uses_wire_names() {
        assert_eq!(
            serde_json::to_string(&Signal::NotApplicable).unwrap(),
            "\"n/a\""
        );
        assert_eq!(serde_json::to_string(&HealthStatus::Ok).unwrap(), "\"ok\"");
    }

    #[test]
    fn tier_roundtrips_as_integer() {
        assert_eq!(serde_json::to_string(&Tier::ManualSetup).unwrap(), "2");
        let t: Tier = serde_json::from_str("1").unwrap();
        assert_eq!(t, Tier::FreeCredential);
        assert!(serde_json::from_str::<Tier>("3").is_err());
    }

    #[test]
    fn config_prefers_explicit_values_over_env() {
        let mut c = Config::new();
        c.set("reddit_proxy", "http://proxy.local:8080");
        assert_eq!(
            c.get("reddit_proxy").as_deref(),
            Some("http://proxy.local:8080")
        );
        assert_eq!(c.get("missing-key-for-sure"), None);
    }
}
