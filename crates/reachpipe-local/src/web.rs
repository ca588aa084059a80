//! Any web page — the universal fallback adapter.
//!
//! Primary backend is the generic reader; if that is unreachable we fetch
//! the page ourselves and strip it to text with html2text. This adapter is
//! the last resort of every routing decision, so its own chain must always
//! produce an envelope.

use crate::chain::{run_read_chain, ReadStep};
use crate::jina::{self, JinaReader};
use async_trait::async_trait;
use reachpipe_core::{Adapter, Config, Error, HealthStatus, ReadResult, Result, Tier};
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_HTML_BYTES: usize = 4_000_000;

pub struct WebAdapter {
    client: reqwest::Client,
    reader: JinaReader,
}

impl WebAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        let reader = JinaReader::new(client.clone());
        Self { client, reader }
    }

    async fn read_via_jina(&self, url: &str) -> Result<ReadResult> {
        let page = self.reader.read(url, jina::DEFAULT_TIMEOUT).await?;
        Ok(ReadResult::new(
            "web",
            url,
            page.title.unwrap_or_else(|| url.to_string()),
            page.markdown,
        ))
    }

    async fn read_via_direct_fetch(&self, url: &str) -> Result<ReadResult> {
        let resp = self
            .client
            .get(url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("HTTP {status}")));
        }
        let mut body = resp.text().await.map_err(|e| Error::Fetch(e.to_string()))?;
        if body.len() > MAX_HTML_BYTES {
            let mut end = MAX_HTML_BYTES;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        let text = html2text::from_read(body.as_bytes(), 100)
            .map_err(|e| Error::Fetch(format!("html extraction failed: {e}")))?;
        let title = jina::title_from_markdown(&text).unwrap_or_else(|| url.to_string());
        Ok(ReadResult::new("web", url, title, text))
    }
}

#[async_trait]
impl Adapter for WebAdapter {
    fn name(&self) -> &'static str {
        "web"
    }
    fn description(&self) -> &'static str {
        "Any web page"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["Jina Reader", "direct fetch"]
    }
    fn tier(&self) -> Tier {
        Tier::ZeroConfig
    }

    fn can_handle(&self, _url: &str) -> bool {
        // Fallback of last resort; the router consults this only after every
        // specific adapter has declined.
        true
    }

    async fn read(&self, url: &str, _config: &Config) -> Result<ReadResult> {
        let steps = vec![
            ReadStep::new("jina", Box::pin(self.read_via_jina(url))),
            ReadStep::new("direct", Box::pin(self.read_via_direct_fetch(url))),
        ];
        Ok(run_read_chain(
            "web",
            url,
            steps,
            "The page may be behind a login wall or rate limit.",
        )
        .await)
    }

    async fn check(&self, _config: &Config) -> Result<(HealthStatus, String)> {
        Ok((
            HealthStatus::Ok,
            "can read any public web page via Jina Reader (curl https://r.jina.ai/URL)".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use std::net::SocketAddr;

    #[test]
    fn claims_every_url() {
        let a = WebAdapter::new(reqwest::Client::new());
        assert!(a.can_handle("https://totally-unknown-host.example"));
        assert!(a.can_handle("not even a url"));
    }

    #[tokio::test]
    async fn check_is_idempotent() {
        let a = WebAdapter::new(reqwest::Client::new());
        let first = a.check(&Config::new()).await.unwrap();
        let second = a.check(&Config::new()).await.unwrap();
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[tokio::test]
    async fn read_falls_back_to_direct_fetch_when_reader_is_down() {
        let app = Router::new().route(
            "/page",
            get(|| async {
                "<html><head><title>Direct</title></head><body><p>A body paragraph long enough to pass the unusable-output heuristic in the chain.</p></body></html>"
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Point the reader at a dead endpoint so the jina step fails fast.
        let _lock = crate::test_env::lock();
        std::env::set_var("REACHPIPE_JINA_ENDPOINT", "http://127.0.0.1:1");
        let a = WebAdapter::new(reqwest::Client::new());
        let r = a
            .read(&format!("http://{addr}/page"), &Config::new())
            .await
            .unwrap();
        std::env::remove_var("REACHPIPE_JINA_ENDPOINT");

        assert!(!r.is_degraded(), "content: {}", r.content);
        assert_eq!(r.platform, "web");
        assert_eq!(
            r.extra.as_ref().unwrap().get("backend").unwrap(),
            "direct"
        );
        assert!(r.content.contains("body paragraph"));
    }
}
