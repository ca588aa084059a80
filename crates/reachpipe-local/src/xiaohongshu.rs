//! XiaoHongShu (小红书) — via `mcporter` + the xiaohongshu MCP server.
//!
//! Note details need an `xsec_token`; we take it from the URL when present,
//! otherwise look the note up in the logged-in feed listing. No generic
//! reader fallback: the site serves nothing useful without a session.

use crate::chain;
use crate::mcporter::{self, Mcporter};
use crate::youtube::host_matches;
use async_trait::async_trait;
use reachpipe_core::{
    Adapter, Config, Error, HealthStatus, ReadResult, Result, SearchResult, Tier,
};
use std::sync::Arc;
use std::time::Duration;

const SERVER_KEY: &str = "xiaohongshu";
const SERVER_ALIASES: &[&str] = &["xiaohongshu", "xhs"];
const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);
const DETAIL_TIMEOUT: Duration = Duration::from_secs(15);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

const SETUP_STEPS: &str = "1. npm install -g mcporter\n\
     2. docker run -d --name xiaohongshu-mcp -p 18060:18060 xpzouying/xiaohongshu-mcp\n\
     3. mcporter config add xiaohongshu http://localhost:18060/mcp";

/// Last path segment is the note id: `…/explore/<note_id>`.
fn note_id_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let id = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?.to_string();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

fn token_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "xsec_token")
        .map(|(_, v)| v.to_string())
}

fn first_line(text: &str) -> Option<String> {
    text.lines().map(str::trim).find(|l| !l.is_empty()).map(String::from)
}

pub struct XiaohongshuAdapter {
    mcporter: Arc<Mcporter>,
}

impl XiaohongshuAdapter {
    pub fn new(mcporter: Arc<Mcporter>) -> Self {
        Self { mcporter }
    }

    async fn call(&self, expr: String, timeout: Duration) -> Result<String> {
        let mc = Arc::clone(&self.mcporter);
        tokio::task::spawn_blocking(move || mc.call(&expr, timeout))
            .await
            .map_err(|e| Error::Tool(format!("mcporter join failed: {e}")))?
    }

    fn server_available(&self) -> bool {
        self.mcporter.has_server(SERVER_KEY, SERVER_ALIASES)
    }

    /// Scan the feed listing for the note's `xsecToken`.
    async fn find_token(&self, note_id: &str) -> Option<String> {
        let out = self
            .call("xiaohongshu.list_feeds()".to_string(), DETAIL_TIMEOUT)
            .await
            .ok()?;
        let data: serde_json::Value = serde_json::from_str(&out).ok()?;
        for feed in data.get("feeds")?.as_array()? {
            if feed.get("id").and_then(|v| v.as_str()) == Some(note_id) {
                return feed
                    .get("xsecToken")
                    .and_then(|v| v.as_str())
                    .map(String::from);
            }
        }
        None
    }
}

#[async_trait]
impl Adapter for XiaohongshuAdapter {
    fn name(&self) -> &'static str {
        "xiaohongshu"
    }
    fn description(&self) -> &'static str {
        "XiaoHongShu notes"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["xiaohongshu-mcp"]
    }
    fn tier(&self) -> Tier {
        Tier::ManualSetup
    }

    fn can_handle(&self, url: &str) -> bool {
        host_matches(url, &["xiaohongshu.com", "xhslink.com"])
    }

    async fn read(&self, url: &str, _config: &Config) -> Result<ReadResult> {
        if !self.server_available() {
            return Ok(ReadResult::degraded(
                "xiaohongshu",
                url,
                "XiaoHongShu",
                format!(
                    "XiaoHongShu needs mcporter + xiaohongshu-mcp. Setup:\n  {SETUP_STEPS}\n  See https://github.com/xpzouying/xiaohongshu-mcp"
                ),
            ));
        }
        let Some(note_id) = note_id_from_url(url) else {
            return Ok(ReadResult::degraded(
                "xiaohongshu",
                url,
                "XiaoHongShu",
                format!("cannot extract a note id from URL: {url}"),
            ));
        };

        let xsec_token = match token_from_url(url) {
            Some(t) => Some(t),
            None => self.find_token(&note_id).await,
        };
        let Some(xsec_token) = xsec_token else {
            return Ok(ReadResult::degraded(
                "xiaohongshu",
                url,
                "XiaoHongShu",
                format!(
                    "no access token found for note {note_id}. Note details need an xsec_token; locate the note through search first."
                ),
            ));
        };

        let expr = format!(
            "xiaohongshu.get_feed_detail(feed_id: \"{}\", xsec_token: \"{}\")",
            mcporter::quote_arg(&note_id),
            mcporter::quote_arg(&xsec_token),
        );
        let out = self.call(expr, DETAIL_TIMEOUT).await?;
        if chain::unusable_reason(&out).is_some() {
            return Ok(ReadResult::degraded(
                "xiaohongshu",
                url,
                format!("XHS {note_id}"),
                "the MCP server returned no usable note content; the session may have expired"
                    .to_string(),
            ));
        }
        let title = first_line(&out).unwrap_or_else(|| format!("XHS {note_id}"));
        Ok(ReadResult::new("xiaohongshu", url, title, out.trim().to_string())
            .with_extra("backend", serde_json::json!("xiaohongshu-mcp")))
    }

    async fn search(
        &self,
        query: &str,
        _config: &Config,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        if !self.server_available() {
            return Err(Error::NotConfigured(format!(
                "XiaoHongShu search needs mcporter + xiaohongshu-mcp. Setup:\n  {SETUP_STEPS}"
            )));
        }
        let expr = format!(
            "xiaohongshu.search_feeds(keyword: \"{}\")",
            mcporter::quote_arg(query)
        );
        let out = self.call(expr, SEARCH_TIMEOUT).await?;
        let data: serde_json::Value =
            serde_json::from_str(&out).map_err(|e| Error::Search(format!("bad feeds json: {e}")))?;

        let mut hits = Vec::new();
        if let Some(feeds) = data.get("feeds").and_then(|v| v.as_array()) {
            for item in feeds.iter().take(limit) {
                let id = item.get("id").and_then(|v| v.as_str()).unwrap_or_default();
                if id.is_empty() {
                    continue;
                }
                let card = item.get("noteCard").cloned().unwrap_or_default();
                let nickname = card
                    .pointer("/user/nickname")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                let likes = card
                    .pointer("/interactInfo/likedCount")
                    .and_then(|v| v.as_str())
                    .unwrap_or("0");
                let mut hit = SearchResult::new(
                    card.get("displayTitle")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    format!("https://www.xiaohongshu.com/explore/{id}"),
                );
                hit.snippet = format!("👤 {nickname} · ❤ {likes}");
                if !nickname.is_empty() {
                    hit.author = Some(nickname.to_string());
                }
                hits.push(hit);
            }
        }
        Ok(hits)
    }

    async fn check(&self, _config: &Config) -> Result<(HealthStatus, String)> {
        if !self.mcporter.installed() {
            return Ok((
                HealthStatus::Off,
                format!("mcporter not installed. Setup:\n  {SETUP_STEPS}\n  See https://github.com/xpzouying/xiaohongshu-mcp"),
            ));
        }
        if !self.server_available() {
            return Ok((
                HealthStatus::Off,
                "mcporter installed but the xiaohongshu MCP server is not configured. Run:\n  docker run -d --name xiaohongshu-mcp -p 18060:18060 xpzouying/xiaohongshu-mcp\n  mcporter config add xiaohongshu http://localhost:18060/mcp"
                    .to_string(),
            ));
        }
        match self
            .call("xiaohongshu.check_login_status()".to_string(), LOGIN_TIMEOUT)
            .await
        {
            Ok(out) => {
                if out.contains("已登录") || out.to_lowercase().contains("logged") {
                    Ok((
                        HealthStatus::Ok,
                        "fully available (read, search, post, comment, like)".to_string(),
                    ))
                } else {
                    Ok((
                        HealthStatus::Warn,
                        "MCP connected but not logged in, scan the QR code to log in".to_string(),
                    ))
                }
            }
            Err(_) => Ok((
                HealthStatus::Warn,
                "MCP call failed, check that xiaohongshu-mcp is running".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_xhs_hosts() {
        let a = XiaohongshuAdapter::new(Arc::new(Mcporter::new()));
        assert!(a.can_handle("https://www.xiaohongshu.com/explore/6123abc"));
        assert!(a.can_handle("https://xhslink.com/abcdef"));
        assert!(!a.can_handle("https://example.com/xiaohongshu"));
    }

    #[test]
    fn note_id_is_last_path_segment() {
        assert_eq!(
            note_id_from_url("https://www.xiaohongshu.com/explore/6123abc").as_deref(),
            Some("6123abc")
        );
        assert_eq!(
            note_id_from_url("https://www.xiaohongshu.com/explore/6123abc/").as_deref(),
            Some("6123abc")
        );
        assert_eq!(note_id_from_url("https://www.xiaohongshu.com/"), None);
    }

    #[test]
    fn token_read_from_query_string() {
        assert_eq!(
            token_from_url("https://www.xiaohongshu.com/explore/61?xsec_token=tok123").as_deref(),
            Some("tok123")
        );
        assert_eq!(
            token_from_url("https://www.xiaohongshu.com/explore/61"),
            None
        );
    }
}
