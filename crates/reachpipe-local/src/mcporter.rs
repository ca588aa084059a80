//! Client for the `mcporter` CLI — the local intermediary that fronts
//! per-platform MCP servers (`mcporter list` to discover, `mcporter call
//! "<server>.<fn>(args)"` to invoke).
//!
//! Availability probes shell out, so they are memoized per server key with a
//! short TTL. The cache is an explicit object with an injected clock: no
//! global mutable state, tests run in isolation.

use crate::shellout;
use reachpipe_core::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const DEFAULT_PROBE_TTL: Duration = Duration::from_secs(60);
const LIST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_OUTPUT_CHARS: usize = 400_000;

#[derive(Debug, Clone)]
struct Probe {
    server: Option<String>,
    checked_at: Instant,
}

pub struct Mcporter {
    ttl: Duration,
    clock: Arc<dyn Fn() -> Instant + Send + Sync>,
    probes: Mutex<HashMap<String, Probe>>,
}

impl Default for Mcporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Mcporter {
    pub fn new() -> Self {
        Self::with_clock(DEFAULT_PROBE_TTL, Arc::new(Instant::now))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Fn() -> Instant + Send + Sync>) -> Self {
        Self {
            ttl,
            clock,
            probes: Mutex::new(HashMap::new()),
        }
    }

    pub fn installed(&self) -> bool {
        shellout::has("mcporter")
    }

    /// Resolve the configured server whose `mcporter list` line matches any
    /// of `aliases`, memoized under `key` for the cache TTL. A stale read at
    /// worst triggers one redundant probe.
    pub fn server_for(&self, key: &str, aliases: &[&str]) -> Option<String> {
        let now = (self.clock)();
        if let Some(p) = self.probes.lock().unwrap_or_else(|e| e.into_inner()).get(key) {
            if now.duration_since(p.checked_at) < self.ttl {
                return p.server.clone();
            }
        }

        let server = self.probe(aliases);
        self.probes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                key.to_string(),
                Probe {
                    server: server.clone(),
                    checked_at: now,
                },
            );
        server
    }

    pub fn has_server(&self, key: &str, aliases: &[&str]) -> bool {
        self.server_for(key, aliases).is_some()
    }

    fn probe(&self, aliases: &[&str]) -> Option<String> {
        if !self.installed() {
            return None;
        }
        let out = shellout::run_text("mcporter", &["list"], LIST_TIMEOUT, 200_000).ok()?;
        for line in out.lines() {
            let lower = line.trim().to_ascii_lowercase();
            if aliases.iter().any(|a| lower.contains(a)) {
                // First whitespace-delimited token is the server name.
                if let Some(name) = line.split_whitespace().next() {
                    return Some(name.to_string());
                }
            }
        }
        None
    }

    /// Call a named remote function with a string expression, e.g.
    /// `xiaohongshu.search_feeds(keyword: "rust")`. Blocking; callers on the
    /// async side wrap this in `spawn_blocking`.
    pub fn call(&self, expr: &str, timeout: Duration) -> Result<String> {
        shellout::run_text("mcporter", &["call", expr], timeout, MAX_OUTPUT_CHARS)
            .map_err(|code| Error::Tool(format!("mcporter call failed: {code}")))
    }
}

/// Escape a value for interpolation into a call expression's double-quoted
/// string argument.
pub fn quote_arg(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn quote_arg_escapes_quotes_and_backslashes() {
        assert_eq!(quote_arg(r#"a "b" c\d"#), r#"a \"b\" c\\d"#);
    }

    #[test]
    fn probe_cache_respects_ttl_with_injected_clock() {
        let base = Instant::now();
        let offset_ms = Arc::new(AtomicU64::new(0));
        let offset = Arc::clone(&offset_ms);
        let mc = Mcporter::with_clock(
            Duration::from_secs(60),
            Arc::new(move || base + Duration::from_millis(offset.load(Ordering::SeqCst))),
        );

        // Seed the cache directly; `probe` would shell out.
        mc.probes.lock().unwrap().insert(
            "boss".to_string(),
            Probe {
                server: Some("bosszhipin".to_string()),
                checked_at: base,
            },
        );

        // Fresh: served from cache, no subprocess.
        assert_eq!(
            mc.server_for("boss", &["boss"]).as_deref(),
            Some("bosszhipin")
        );

        // Expired: falls through to a real probe, which finds nothing in this
        // environment (mcporter absent) and overwrites the entry.
        offset_ms.store(61_000, Ordering::SeqCst);
        if !mc.installed() {
            assert_eq!(mc.server_for("boss", &["boss"]), None);
        }
    }

    #[test]
    fn missing_mcporter_is_not_an_error_for_probes() {
        let mc = Mcporter::new();
        if !mc.installed() {
            assert!(!mc.has_server("wechat-mp", &["wechat"]));
        }
    }
}
