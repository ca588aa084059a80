//! Reddit — public JSON API first (optionally through a proxy, since server
//! IPs are commonly blocked), generic reader as fallback. Search goes
//! through Exa with a `site:reddit.com` filter; a leading `r/<name>` token
//! in the query narrows it to that subreddit.

use crate::chain::{run_read_chain, ReadStep};
use crate::exa::ExaClient;
use crate::jina::{self, JinaReader};
use crate::youtube::host_matches;
use async_trait::async_trait;
use reachpipe_core::{
    Adapter, Config, Error, HealthStatus, ReadResult, Result, SearchResult, Tier,
};
use std::time::Duration;

const JSON_TIMEOUT: Duration = Duration::from_secs(15);

/// Pull an `r/<name>` token out of the query; the rest stays the query.
fn split_subreddit(query: &str) -> (Option<&str>, String) {
    let mut sub = None;
    let mut rest = Vec::new();
    for tok in query.split_whitespace() {
        match tok.strip_prefix("r/") {
            Some(name)
                if sub.is_none()
                    && !name.is_empty()
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                sub = Some(name)
            }
            _ => rest.push(tok),
        }
    }
    (sub, rest.join(" "))
}

pub struct RedditAdapter {
    client: reqwest::Client,
    exa: ExaClient,
    reader: JinaReader,
}

impl RedditAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        let exa = ExaClient::new(client.clone());
        let reader = JinaReader::new(client.clone());
        Self { client, exa, reader }
    }

    fn json_url(url: &str) -> String {
        let trimmed = url.trim_end_matches('/');
        if trimmed.ends_with(".json") {
            trimmed.to_string()
        } else {
            format!("{trimmed}.json")
        }
    }

    async fn read_via_json_api(&self, url: &str, config: &Config) -> Result<ReadResult> {
        // A configured proxy needs its own client; the shared one stays
        // proxy-free for every other adapter.
        let client = match config.get("reddit_proxy") {
            Some(proxy) => reqwest::Client::builder()
                .proxy(reqwest::Proxy::all(&proxy).map_err(|e| Error::Fetch(e.to_string()))?)
                .build()
                .map_err(|e| Error::Fetch(e.to_string()))?,
            None => self.client.clone(),
        };

        let resp = client
            .get(Self::json_url(url))
            .timeout(JSON_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("reddit JSON API HTTP {status}")));
        }
        let v: serde_json::Value = resp.json().await.map_err(|e| Error::Fetch(e.to_string()))?;

        // Post pages come back as [listing-of-post, listing-of-comments].
        let post = v
            .get(0)
            .and_then(|l| l.pointer("/data/children/0/data"))
            .ok_or_else(|| Error::Fetch("unexpected reddit payload shape".to_string()))?;

        let title = post.get("title").and_then(|x| x.as_str()).unwrap_or(url);
        let selftext = post.get("selftext").and_then(|x| x.as_str()).unwrap_or("");
        let score = post.get("score").and_then(|x| x.as_i64()).unwrap_or(0);
        let num_comments = post
            .get("num_comments")
            .and_then(|x| x.as_i64())
            .unwrap_or(0);

        let mut content = selftext.to_string();
        if content.trim().is_empty() {
            if let Some(link) = post.get("url").and_then(|x| x.as_str()) {
                content = format!("Link post: {link}");
            }
        }
        content.push_str(&format!("\n\n▲ {score} · 💬 {num_comments} comments"));

        let mut result = ReadResult::new("reddit", url, title, content)
            .with_extra("score", serde_json::json!(score))
            .with_extra("num_comments", serde_json::json!(num_comments));
        result.author = post
            .get("author")
            .and_then(|x| x.as_str())
            .map(|a| format!("u/{a}"));
        Ok(result)
    }

    async fn read_via_jina(&self, url: &str) -> Result<ReadResult> {
        let page = self.reader.read(url, jina::DEFAULT_TIMEOUT).await?;
        Ok(ReadResult::new(
            "reddit",
            url,
            page.title.unwrap_or_else(|| url.to_string()),
            page.markdown,
        ))
    }
}

#[async_trait]
impl Adapter for RedditAdapter {
    fn name(&self) -> &'static str {
        "reddit"
    }
    fn description(&self) -> &'static str {
        "Reddit posts and comments"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["JSON API", "Exa API", "Jina Reader"]
    }
    fn tier(&self) -> Tier {
        Tier::FreeCredential
    }

    fn can_handle(&self, url: &str) -> bool {
        host_matches(url, &["reddit.com", "redd.it"])
    }

    async fn read(&self, url: &str, config: &Config) -> Result<ReadResult> {
        let steps = vec![
            ReadStep::new("json-api", Box::pin(self.read_via_json_api(url, config))),
            ReadStep::new("jina", Box::pin(self.read_via_jina(url))),
        ];
        Ok(run_read_chain(
            "reddit",
            url,
            steps,
            "Reddit may be blocking this IP. Configure a proxy via reddit_proxy (or REDDIT_PROXY).",
        )
        .await)
    }

    async fn search(
        &self,
        query: &str,
        config: &Config,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let (subreddit, rest) = split_subreddit(query);
        let site = match subreddit {
            Some(s) => format!("site:reddit.com/r/{s}"),
            None => "site:reddit.com".to_string(),
        };
        let q = if rest.is_empty() {
            site
        } else {
            format!("{site} {rest}")
        };
        self.exa.search(&q, config, limit).await
    }

    async fn check(&self, config: &Config) -> Result<(HealthStatus, String)> {
        if config.get("reddit_proxy").is_some() {
            Ok((
                HealthStatus::Ok,
                "proxy configured, can read posts".to_string(),
            ))
        } else {
            Ok((
                HealthStatus::Warn,
                "no proxy. A server IP may be blocked by Reddit.\nConfigure: set reddit_proxy (or REDDIT_PROXY) to http://user:pass@ip:port".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_reddit_hosts_only() {
        let a = RedditAdapter::new(reqwest::Client::new());
        assert!(a.can_handle("https://www.reddit.com/r/rust/comments/abc/post"));
        assert!(a.can_handle("https://redd.it/abc"));
        assert!(!a.can_handle("https://example.com/r/rust"));
    }

    #[test]
    fn json_url_appends_suffix_once() {
        assert_eq!(
            RedditAdapter::json_url("https://reddit.com/r/rust/comments/abc/"),
            "https://reddit.com/r/rust/comments/abc.json"
        );
        assert_eq!(
            RedditAdapter::json_url("https://reddit.com/r/rust/comments/abc.json"),
            "https://reddit.com/r/rust/comments/abc.json"
        );
    }

    #[test]
    fn subreddit_token_is_lifted_out_of_the_query() {
        assert_eq!(split_subreddit("async traits"), (None, "async traits".to_string()));
        assert_eq!(
            split_subreddit("r/rust async traits"),
            (Some("rust"), "async traits".to_string())
        );
        assert_eq!(
            split_subreddit("borrow checker r/learnrust"),
            (Some("learnrust"), "borrow checker".to_string())
        );
        // Malformed tokens stay part of the query text.
        assert_eq!(
            split_subreddit("r/not-valid q"),
            (None, "r/not-valid q".to_string())
        );
    }

    #[tokio::test]
    async fn search_scopes_the_query_to_reddit() {
        use axum::{routing::post, Json, Router};
        use std::net::SocketAddr;

        // Fixture echoes the query it received as the hit title.
        let app = Router::new().route(
            "/search",
            post(|Json(body): Json<serde_json::Value>| async move {
                Json(serde_json::json!({
                    "results": [{
                        "title": body["query"],
                        "url": "https://www.reddit.com/r/rust/comments/abc/post"
                    }]
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
        let a = RedditAdapter::new(reqwest::Client::new());
        let scoped = a.search("r/rust async traits", &config, 5).await.unwrap();
        let unscoped = a.search("async traits", &config, 5).await.unwrap();
        std::env::remove_var("REACHPIPE_EXA_ENDPOINT");

        assert_eq!(scoped[0].title, "site:reddit.com/r/rust async traits");
        assert_eq!(unscoped[0].title, "site:reddit.com async traits");
    }

    #[tokio::test]
    async fn check_reflects_proxy_configuration() {
        let a = RedditAdapter::new(reqwest::Client::new());
        let mut config = Config::new();
        let (status, _) = a.check(&config).await.unwrap();
        assert_eq!(status, HealthStatus::Warn);

        config.set("reddit_proxy", "http://proxy.local:8080");
        let (status, msg) = a.check(&config).await.unwrap();
        assert_eq!(status, HealthStatus::Ok);
        assert!(msg.contains("proxy configured"));
    }
}
