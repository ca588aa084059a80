//! Exa semantic web search (free key, 1000 searches/month).
//!
//! Exposed two ways: as the `exa` adapter (search-only; it claims no URLs)
//! and as [`ExaClient`], the shared search fallback other adapters reach for
//! with a `site:` filter when their native backend is unavailable.

use crate::chain::{run_read_chain, ReadStep};
use crate::jina::{self, JinaReader};
use async_trait::async_trait;
use reachpipe_core::{
    Adapter, Config, Error, HealthStatus, ReadResult, Result, SearchResult, Tier,
};
use serde::Deserialize;
use std::time::Duration;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RESULTS: usize = 10;

fn endpoint() -> String {
    crate::shellout::env("REACHPIPE_EXA_ENDPOINT")
        .unwrap_or_else(|| "https://api.exa.ai/search".to_string())
}

#[derive(Debug, Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaHit>,
}

#[derive(Debug, Deserialize)]
struct ExaHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "publishedDate")]
    published_date: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ExaClient {
    client: reqwest::Client,
}

impl ExaClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn api_key(config: &Config) -> Result<String> {
        config.get("exa_api_key").ok_or_else(|| {
            Error::NotConfigured(
                "Exa API key not configured. Get a free key at https://exa.ai, then set exa_api_key (or EXA_API_KEY)".to_string(),
            )
        })
    }

    pub async fn search(
        &self,
        query: &str,
        config: &Config,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let api_key = Self::api_key(config)?;
        let resp = self
            .client
            .post(endpoint())
            .header("x-api-key", api_key)
            .json(&serde_json::json!({
                "query": query,
                "numResults": limit.clamp(1, MAX_RESULTS),
                "type": "auto",
                "contents": { "text": { "maxCharacters": 500 } },
            }))
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("exa search HTTP {status}")));
        }
        let parsed: ExaResponse = resp.json().await.map_err(|e| Error::Search(e.to_string()))?;

        let mut hits = Vec::new();
        for r in parsed.results.into_iter() {
            if r.url.trim().is_empty() {
                continue;
            }
            let mut hit = SearchResult::new(r.title.unwrap_or_default(), r.url);
            hit.snippet = r.text.unwrap_or_default();
            hit.author = r.author;
            hit.date = r.published_date;
            hit.score = r.score.unwrap_or(0.0);
            hits.push(hit);
            if hits.len() >= limit {
                break;
            }
        }
        Ok(hits)
    }
}

pub struct ExaAdapter {
    exa: ExaClient,
    reader: JinaReader,
}

impl ExaAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            exa: ExaClient::new(client.clone()),
            reader: JinaReader::new(client),
        }
    }

    async fn read_via_jina(&self, url: &str) -> Result<ReadResult> {
        let page = self.reader.read(url, jina::DEFAULT_TIMEOUT).await?;
        Ok(ReadResult::new(
            "exa",
            url,
            page.title.unwrap_or_else(|| url.to_string()),
            page.markdown,
        ))
    }
}

#[async_trait]
impl Adapter for ExaAdapter {
    fn name(&self) -> &'static str {
        "exa"
    }
    fn description(&self) -> &'static str {
        "Semantic web search (Exa)"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["Exa API"]
    }
    fn tier(&self) -> Tier {
        Tier::FreeCredential
    }

    fn can_handle(&self, _url: &str) -> bool {
        // Search-only: claims no URLs, never shadows a content adapter.
        false
    }

    async fn read(&self, url: &str, _config: &Config) -> Result<ReadResult> {
        let steps = vec![ReadStep::new("jina", Box::pin(self.read_via_jina(url)))];
        Ok(run_read_chain("exa", url, steps, "").await)
    }

    async fn search(
        &self,
        query: &str,
        config: &Config,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.exa.search(query, config, limit).await
    }

    async fn check(&self, config: &Config) -> Result<(HealthStatus, String)> {
        if config.get("exa_api_key").is_some() {
            Ok((
                HealthStatus::Ok,
                "semantic search configured (1000 free searches/month)".to_string(),
            ))
        } else {
            Ok((
                HealthStatus::Warn,
                "Exa key not configured. Get a free key at https://exa.ai and set EXA_API_KEY"
                    .to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use std::net::SocketAddr;

    #[test]
    fn claims_no_urls() {
        let a = ExaAdapter::new(reqwest::Client::new());
        assert!(!a.can_handle("https://example.com"));
    }

    #[tokio::test]
    async fn search_without_key_is_not_configured() {
        let a = ExaAdapter::new(reqwest::Client::new());
        // Only meaningful when the environment carries no real key.
        if std::env::var("EXA_API_KEY").is_err() {
            let err = a.search("x", &Config::new(), 5).await.unwrap_err();
            assert!(matches!(err, Error::NotConfigured(_)));
        }
    }

    #[tokio::test]
    async fn search_parses_exa_payload() {
        let app = Router::new().route(
            "/search",
            post(|| async {
                Json(serde_json::json!({
                    "results": [
                        {
                            "title": "Rust async book",
                            "url": "https://rust-lang.github.io/async-book/",
                            "text": "Asynchronous programming in Rust",
                            "publishedDate": "2025-03-01",
                            "score": 0.92
                        },
                        { "title": "dropped", "url": "" }
                    ]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let _lock = crate::test_env::lock();
        std::env::set_var("REACHPIPE_EXA_ENDPOINT", format!("http://{addr}/search"));
        let mut config = Config::new();
        config.set("exa_api_key", "test-key");
        let client = ExaClient::new(reqwest::Client::new());
        let hits = client.search("rust async", &config, 5).await.unwrap();
        std::env::remove_var("REACHPIPE_EXA_ENDPOINT");

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Rust async book");
        assert!(hits[0].score > 0.9);
    }
}
