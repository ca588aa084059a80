//! Twitter/X — `bird` CLI (cookie-based) with Exa `site:x.com` as the
//! search fallback and the generic reader for plain tweet URLs.

use crate::chain::{run_read_chain, run_search_chain, ReadStep, SearchStep};
use crate::exa::ExaClient;
use crate::jina::{self, JinaReader};
use crate::shellout;
use crate::youtube::host_matches;
use async_trait::async_trait;
use reachpipe_core::{
    Adapter, Config, Error, HealthStatus, ReadResult, Result, SearchResult, Tier,
};
use std::time::Duration;

const BIRD_TIMEOUT: Duration = Duration::from_secs(30);
const WHOAMI_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_BIRD_CHARS: usize = 200_000;

/// `bird` and `birdx` share a command surface; prefer whichever is on PATH.
fn bird_cli() -> Option<&'static str> {
    ["bird", "birdx"].into_iter().find(|b| shellout::has(b))
}

/// `https://x.com/alice/status/123` → `@alice`.
fn handle_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let seg = parsed.path_segments()?.next()?.trim().to_string();
    match seg.as_str() {
        "" | "search" | "home" | "explore" | "i" | "hashtag" => None,
        _ => Some(format!("@{seg}")),
    }
}

fn parse_bird_json(raw: &str) -> Option<Vec<serde_json::Value>> {
    let v: serde_json::Value = serde_json::from_str(raw).ok()?;
    match v {
        serde_json::Value::Array(items) => Some(items),
        serde_json::Value::Object(mut map) => {
            for key in ["tweets", "results"] {
                if let Some(serde_json::Value::Array(items)) = map.remove(key) {
                    return Some(items);
                }
            }
            None
        }
        _ => None,
    }
}

/// Parse the plain-text fallback format: blank-line-separated blocks of
/// `@author`, body lines, and a trailing tweet URL.
fn parse_bird_text(text: &str) -> Vec<SearchResult> {
    let mut results = Vec::new();
    let mut author: Option<String> = None;
    let mut url = String::new();
    let mut body = String::new();

    let mut flush = |author: &mut Option<String>, url: &mut String, body: &mut String| {
        if !url.is_empty() || !body.trim().is_empty() {
            let mut hit = SearchResult::new(body.trim().to_string(), std::mem::take(url));
            hit.author = author.take();
            results.push(hit);
        }
        body.clear();
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut author, &mut url, &mut body);
            continue;
        }
        if let Some(first) = line.split_whitespace().next() {
            if first.starts_with('@') {
                author = Some(first.to_string());
                continue;
            }
        }
        if line.starts_with("http") {
            url = line.to_string();
            continue;
        }
        if !body.is_empty() {
            body.push(' ');
        }
        body.push_str(line);
    }
    flush(&mut author, &mut url, &mut body);
    results
}

pub struct TwitterAdapter {
    exa: ExaClient,
    reader: JinaReader,
}

impl TwitterAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            exa: ExaClient::new(client.clone()),
            reader: JinaReader::new(client),
        }
    }

    async fn read_via_bird(&self, url: &str) -> Result<ReadResult> {
        let bin = bird_cli().ok_or_else(|| Error::Tool("bird CLI not installed".to_string()))?;
        let url_owned = url.to_string();
        let text = tokio::task::spawn_blocking(move || {
            shellout::run_text(bin, &["read", &url_owned], BIRD_TIMEOUT, MAX_BIRD_CHARS)
        })
        .await
        .map_err(|e| Error::Tool(format!("bird join failed: {e}")))?
        .map_err(|code| Error::Tool(format!("bird read failed: {code}")))?;

        let handle = handle_from_url(url);
        let title = match &handle {
            Some(h) => format!("Tweet by {h}"),
            None => "Tweet".to_string(),
        };
        let mut out = ReadResult::new("twitter", url, title, text);
        out.author = handle;
        Ok(out)
    }

    async fn read_via_jina(&self, url: &str) -> Result<ReadResult> {
        let page = self.reader.read(url, jina::DEFAULT_TIMEOUT).await?;
        Ok(ReadResult::new(
            "twitter",
            url,
            page.title.unwrap_or_else(|| url.to_string()),
            page.markdown,
        ))
    }

    async fn search_via_bird(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let bin = bird_cli().ok_or_else(|| Error::Tool("bird CLI not installed".to_string()))?;
        let n = limit.clamp(1, 50).to_string();
        let query_json = query.to_string();
        let n_json = n.clone();
        let raw = tokio::task::spawn_blocking(move || {
            shellout::run_text(
                bin,
                &["search", &query_json, "-n", &n_json, "--json"],
                BIRD_TIMEOUT,
                MAX_BIRD_CHARS,
            )
        })
        .await
        .map_err(|e| Error::Search(format!("bird join failed: {e}")))?;

        let hits = match raw.ok().and_then(|s| parse_bird_json(&s)) {
            Some(items) => items
                .into_iter()
                .filter_map(|item| {
                    let url = item
                        .get("url")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    let text = item
                        .get("text")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    if url.is_empty() && text.is_empty() {
                        return None;
                    }
                    let mut hit = SearchResult::new(text, url);
                    hit.author = item
                        .get("author")
                        .and_then(|v| v.as_str())
                        .map(String::from);
                    hit.date = item.get("date").and_then(|v| v.as_str()).map(String::from);
                    Some(hit)
                })
                .take(limit)
                .collect(),
            None => {
                // Older builds have no --json; reparse the plain listing.
                let query_text = query.to_string();
                let text = tokio::task::spawn_blocking(move || {
                    shellout::run_text(
                        bin,
                        &["search", &query_text, "-n", &n],
                        BIRD_TIMEOUT,
                        MAX_BIRD_CHARS,
                    )
                })
                .await
                .map_err(|e| Error::Search(format!("bird join failed: {e}")))?
                .map_err(|code| Error::Search(format!("bird search failed: {code}")))?;
                parse_bird_text(&text).into_iter().take(limit).collect()
            }
        };
        Ok(hits)
    }
}

#[async_trait]
impl Adapter for TwitterAdapter {
    fn name(&self) -> &'static str {
        "twitter"
    }
    fn description(&self) -> &'static str {
        "Twitter/X posts"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["bird CLI", "Exa API", "Jina Reader"]
    }
    fn tier(&self) -> Tier {
        Tier::FreeCredential
    }

    fn can_handle(&self, url: &str) -> bool {
        host_matches(url, &["x.com", "twitter.com"])
    }

    async fn read(&self, url: &str, _config: &Config) -> Result<ReadResult> {
        let steps = vec![
            ReadStep::new("bird", Box::pin(self.read_via_bird(url))),
            ReadStep::new("jina", Box::pin(self.read_via_jina(url))),
        ];
        Ok(run_read_chain(
            "twitter",
            url,
            steps,
            "Install the bird CLI for authenticated reads: npm install -g @steipete/bird",
        )
        .await)
    }

    async fn search(
        &self,
        query: &str,
        config: &Config,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let site_query = format!("site:x.com {query}");
        let steps = vec![
            SearchStep::new("bird", Box::pin(self.search_via_bird(query, limit))),
            SearchStep::new("exa", Box::pin(self.exa.search(&site_query, config, limit))),
        ];
        run_search_chain("twitter", steps).await
    }

    async fn check(&self, _config: &Config) -> Result<(HealthStatus, String)> {
        let Some(bin) = bird_cli() else {
            return Ok((
                HealthStatus::Warn,
                "bird CLI not installed. Search still works via Exa. Install:\n  npm install -g @steipete/bird"
                    .to_string(),
            ));
        };
        if shellout::run_ok(bin, &["whoami"], WHOAMI_TIMEOUT) {
            Ok((
                HealthStatus::Ok,
                "fully available (read and search tweets)".to_string(),
            ))
        } else {
            Ok((
                HealthStatus::Warn,
                "bird CLI installed but cookies not configured. Run:\n  bird login \"auth_token=xxx; ct0=yyy\""
                    .to_string(),
            ))
        }
    }
}
