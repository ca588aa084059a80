//! GitHub — repos and code via the `gh` CLI, generic reader as fallback,
//! repository search via the public API (no key required, token optional).

use crate::chain::{run_read_chain, ReadStep};
use crate::jina::{self, JinaReader};
use crate::shellout;
use async_trait::async_trait;
use reachpipe_core::{
    Adapter, Config, Error, HealthStatus, ReadResult, Result, SearchResult, Tier,
};
use std::time::Duration;

const GH_TIMEOUT: Duration = Duration::from_secs(15);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_GH_CHARS: usize = 400_000;

fn api_endpoint() -> String {
    shellout::env("REACHPIPE_GITHUB_API").unwrap_or_else(|| "https://api.github.com".to_string())
}

/// `https://github.com/<owner>/<repo>[...]` → `owner/repo`.
fn repo_slug(url: &str) -> Option<String> {
    let u = url::Url::parse(url).ok()?;
    if !u.host_str()?.to_ascii_lowercase().contains("github.com") {
        return None;
    }
    let mut segs = u.path_segments()?.filter(|s| !s.is_empty());
    let owner = segs.next()?;
    let repo = segs.next()?;
    // Deeper paths (issues, blobs, PRs) are not plain repo pages.
    if segs.next().is_some() {
        return None;
    }
    Some(format!("{owner}/{repo}"))
}

pub struct GithubAdapter {
    client: reqwest::Client,
    reader: JinaReader,
}

impl GithubAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        let reader = JinaReader::new(client.clone());
        Self { client, reader }
    }

    async fn read_via_gh(&self, url: &str) -> Result<ReadResult> {
        let Some(slug) = repo_slug(url) else {
            return Err(Error::NotSupported("not a plain repo URL".to_string()));
        };
        if !shellout::has("gh") {
            return Err(Error::Tool("gh CLI not installed".to_string()));
        }
        let api_path = format!("repos/{slug}");
        let out = tokio::task::spawn_blocking(move || {
            shellout::run_text("gh", &["api", &api_path], GH_TIMEOUT, MAX_GH_CHARS)
        })
        .await
        .map_err(|e| Error::Tool(format!("gh join failed: {e}")))?
        .map_err(|code| Error::Tool(format!("gh api failed: {code}")))?;

        let v: serde_json::Value =
            serde_json::from_str(&out).map_err(|e| Error::Tool(format!("gh bad json: {e}")))?;
        let name = v.get("full_name").and_then(|x| x.as_str()).unwrap_or(&slug);
        let description = v.get("description").and_then(|x| x.as_str()).unwrap_or("");
        let stars = v.get("stargazers_count").and_then(|x| x.as_u64()).unwrap_or(0);
        let language = v.get("language").and_then(|x| x.as_str()).unwrap_or("");
        let content = format!(
            "{description}\n\n⭐ {stars} stars · {language}\n\nREADME and code: use `gh repo view {slug}` locally."
        );

        let mut result = ReadResult::new("github", url, name, content)
            .with_extra("stars", serde_json::json!(stars));
        result.author = v
            .get("owner")
            .and_then(|o| o.get("login"))
            .and_then(|x| x.as_str())
            .map(|s| s.to_string());
        result.date = v
            .get("updated_at")
            .and_then(|x| x.as_str())
            .map(|s| s.to_string());
        Ok(result)
    }

    async fn read_via_jina(&self, url: &str) -> Result<ReadResult> {
        let page = self.reader.read(url, jina::DEFAULT_TIMEOUT).await?;
        Ok(ReadResult::new(
            "github",
            url,
            page.title.unwrap_or_else(|| url.to_string()),
            page.markdown,
        ))
    }

    async fn search_api(
        &self,
        query: &str,
        config: &Config,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let per_page = limit.clamp(1, 30).to_string();
        let mut rb = self
            .client
            .get(format!("{}/search/repositories", api_endpoint()))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .query(&[("q", query), ("sort", "stars"), ("per_page", per_page.as_str())])
            .timeout(SEARCH_TIMEOUT);
        if let Some(token) = config.get("github_token") {
            rb = rb.bearer_auth(token);
        }
        let resp = rb.send().await.map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("github search HTTP {status}")));
        }
        let v: serde_json::Value = resp.json().await.map_err(|e| Error::Search(e.to_string()))?;

        let mut hits = Vec::new();
        for repo in v.get("items").and_then(|x| x.as_array()).into_iter().flatten() {
            let url = repo.get("html_url").and_then(|x| x.as_str()).unwrap_or("");
            if url.is_empty() {
                continue;
            }
            let stars = repo
                .get("stargazers_count")
                .and_then(|x| x.as_u64())
                .unwrap_or(0);
            let mut hit = SearchResult::new(
                repo.get("full_name").and_then(|x| x.as_str()).unwrap_or(""),
                url,
            );
            hit.snippet = repo
                .get("description")
                .and_then(|x| x.as_str())
                .unwrap_or("")
                .to_string();
            hit.score = stars as f64;
            hit.date = repo
                .get("updated_at")
                .and_then(|x| x.as_str())
                .map(|s| s.to_string());
            hits.push(hit);
            if hits.len() >= limit {
                break;
            }
        }
        Ok(hits)
    }
}

#[async_trait]
impl Adapter for GithubAdapter {
    fn name(&self) -> &'static str {
        "github"
    }
    fn description(&self) -> &'static str {
        "GitHub repos and code"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["gh CLI", "Jina Reader"]
    }
    fn tier(&self) -> Tier {
        Tier::ZeroConfig
    }

    fn can_handle(&self, url: &str) -> bool {
        crate::youtube::host_matches(url, &["github.com"])
    }

    async fn read(&self, url: &str, _config: &Config) -> Result<ReadResult> {
        let steps = vec![
            ReadStep::new("gh", Box::pin(self.read_via_gh(url))),
            ReadStep::new("jina", Box::pin(self.read_via_jina(url))),
        ];
        Ok(run_read_chain(
            "github",
            url,
            steps,
            "Install the gh CLI for richer results: https://cli.github.com",
        )
        .await)
    }

    async fn search(
        &self,
        query: &str,
        config: &Config,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.search_api(query, config, limit).await
    }

    async fn check(&self, _config: &Config) -> Result<(HealthStatus, String)> {
        if !shellout::has("gh") {
            return Ok((
                HealthStatus::Warn,
                "gh CLI not installed. Install: https://cli.github.com".to_string(),
            ));
        }
        let authed = tokio::task::spawn_blocking(|| {
            shellout::run_ok("gh", &["auth", "status"], Duration::from_secs(5))
        })
        .await
        .unwrap_or(false);
        if authed {
            Ok((
                HealthStatus::Ok,
                "fully available (read, search, fork, issues, PRs)".to_string(),
            ))
        } else {
            Ok((
                HealthStatus::Ok,
                "gh CLI installed but not authenticated. Run `gh auth login` to unlock everything"
                    .to_string(),
            ))
        }
    }
}
