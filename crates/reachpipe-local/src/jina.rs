//! Generic URL-to-markdown reader (Jina Reader, `https://r.jina.ai/<url>`).
//!
//! This is the universal fallback backend: free, no credential, works for
//! any public page. Output is treated as opaque markdown.

use reachpipe_core::{Error, Result};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

fn endpoint() -> String {
    // Override for tests / self-hosted readers.
    crate::shellout::env("REACHPIPE_JINA_ENDPOINT")
        .unwrap_or_else(|| "https://r.jina.ai".to_string())
}

#[derive(Debug, Clone)]
pub struct JinaPage {
    pub title: Option<String>,
    pub markdown: String,
}

#[derive(Debug, Clone)]
pub struct JinaReader {
    client: reqwest::Client,
}

impl JinaReader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn read(&self, url: &str, timeout: Duration) -> Result<JinaPage> {
        let base = endpoint();
        let target = format!("{}/{url}", base.trim_end_matches('/'));
        let mut rb = self
            .client
            .get(&target)
            .header(reqwest::header::ACCEPT, "text/markdown")
            .timeout(timeout);
        // Optional key raises the free-tier rate limit; never required.
        if let Some(key) = crate::shellout::env("JINA_API_KEY") {
            rb = rb.bearer_auth(key);
        }
        let resp = rb.send().await.map_err(|e| Error::Fetch(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("jina reader HTTP {status}")));
        }
        let markdown = resp.text().await.map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(JinaPage {
            title: title_from_markdown(&markdown),
            markdown,
        })
    }
}

/// Extract a title from reader output: first `Title:` header or first
/// `# ` markdown heading.
pub fn title_from_markdown(text: &str) -> Option<String> {
    for line in text.lines().take(50) {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Title:") {
            let t = rest.trim();
            if !t.is_empty() {
                return Some(t.to_string());
            }
        }
        if let Some(rest) = line.strip_prefix("# ") {
            let t = rest.trim();
            if !t.is_empty() {
                return Some(t.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use std::net::SocketAddr;

    #[test]
    fn title_prefers_reader_header() {
        let md = "Title: Example Domain\n\nURL Source: https://example.com\n\n# Heading";
        assert_eq!(title_from_markdown(md).as_deref(), Some("Example Domain"));
        assert_eq!(title_from_markdown("# Only Heading\nbody").as_deref(), Some("Only Heading"));
        assert_eq!(title_from_markdown("no headings here"), None);
    }

    #[tokio::test]
    async fn reader_fetches_markdown_from_endpoint_override() {
        let app = Router::new().route(
            "/*rest",
            get(|| async { "Title: Fixture Page\n\nbody text" }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let _lock = crate::test_env::lock();
        std::env::set_var("REACHPIPE_JINA_ENDPOINT", format!("http://{addr}"));
        let reader = JinaReader::new(reqwest::Client::new());
        let page = reader
            .read("https://example.com/post", Duration::from_secs(2))
            .await
            .unwrap();
        std::env::remove_var("REACHPIPE_JINA_ENDPOINT");

        assert_eq!(page.title.as_deref(), Some("Fixture Page"));
        assert!(page.markdown.contains("body text"));
    }
}
