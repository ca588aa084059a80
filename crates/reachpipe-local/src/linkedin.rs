//! LinkedIn — `mcporter` + linkedin-scraper-mcp, generic reader fallback.
//!
//! Profile, company, and job URLs each map to a dedicated MCP function;
//! anything else (or any MCP failure) goes through the public reader, which
//! LinkedIn often answers with a login wall — the chain executor downgrades
//! that to a degraded envelope.

use crate::chain::{run_read_chain, run_search_chain, ReadStep, SearchStep};
use crate::exa::ExaClient;
use crate::jina::{self, JinaReader};
use crate::mcporter::{self, Mcporter};
use crate::youtube::host_matches;
use async_trait::async_trait;
use reachpipe_core::{
    Adapter, Config, Error, HealthStatus, ReadResult, Result, SearchResult, Tier,
};
use std::sync::Arc;
use std::time::Duration;

const SERVER_KEY: &str = "linkedin";
const SERVER_ALIASES: &[&str] = &["linkedin"];
const PROFILE_TIMEOUT: Duration = Duration::from_secs(60);
const JOB_TIMEOUT: Duration = Duration::from_secs(30);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, PartialEq)]
enum Target {
    Profile(String),
    Company(String),
    Job(String),
    Other,
}

fn classify(url: &str) -> Target {
    let Ok(parsed) = url::Url::parse(url) else {
        return Target::Other;
    };
    let segs: Vec<String> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).map(String::from).collect())
        .unwrap_or_default();
    match segs.as_slice() {
        [first, name, ..] if first == "in" => Target::Profile(name.clone()),
        [first, name, ..] if first == "company" => Target::Company(name.clone()),
        [a, b, id, ..] if a == "jobs" && b == "view" && id.chars().all(|c| c.is_ascii_digit()) => {
            Target::Job(id.clone())
        }
        _ => Target::Other,
    }
}

pub struct LinkedinAdapter {
    mcporter: Arc<Mcporter>,
    exa: ExaClient,
    reader: JinaReader,
}

impl LinkedinAdapter {
    pub fn new(client: reqwest::Client, mcporter: Arc<Mcporter>) -> Self {
        Self {
            mcporter,
            exa: ExaClient::new(client.clone()),
            reader: JinaReader::new(client),
        }
    }

    async fn call(&self, expr: String, timeout: Duration) -> Result<String> {
        let mc = Arc::clone(&self.mcporter);
        tokio::task::spawn_blocking(move || mc.call(&expr, timeout))
            .await
            .map_err(|e| Error::Tool(format!("mcporter join failed: {e}")))?
    }

    async fn read_via_mcp(&self, url: &str) -> Result<ReadResult> {
        if !self.mcporter.has_server(SERVER_KEY, SERVER_ALIASES) {
            return Err(Error::Tool("linkedin MCP server not configured".to_string()));
        }
        let (expr, timeout, fallback_title) = match classify(url) {
            Target::Profile(name) => (
                format!(
                    "linkedin.get_person_profile(linkedin_username: \"{}\")",
                    mcporter::quote_arg(&name)
                ),
                PROFILE_TIMEOUT,
                format!("LinkedIn Profile - {name}"),
            ),
            Target::Company(name) => (
                format!(
                    "linkedin.get_company_profile(company_name: \"{}\")",
                    mcporter::quote_arg(&name)
                ),
                PROFILE_TIMEOUT,
                "LinkedIn Company".to_string(),
            ),
            Target::Job(id) => (
                format!("linkedin.get_job_details(job_id: \"{id}\")"),
                JOB_TIMEOUT,
                format!("LinkedIn Job {id}"),
            ),
            Target::Other => {
                return Err(Error::Tool("no MCP function for this URL shape".to_string()))
            }
        };
        let out = self.call(expr, timeout).await?;
        let title = out
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(String::from)
            .unwrap_or(fallback_title);
        Ok(ReadResult::new("linkedin", url, title, out.trim().to_string()))
    }

    async fn read_via_jina(&self, url: &str) -> Result<ReadResult> {
        let page = self.reader.read(url, jina::DEFAULT_TIMEOUT).await?;
        Ok(ReadResult::new(
            "linkedin",
            url,
            page.title.unwrap_or_else(|| url.to_string()),
            page.markdown,
        ))
    }

    fn parse_search_output(text: &str, limit: usize) -> Vec<SearchResult> {
        let Ok(data) = serde_json::from_str::<serde_json::Value>(text) else {
            return Vec::new();
        };
        let items = match &data {
            serde_json::Value::Array(items) => items.clone(),
            serde_json::Value::Object(map) => ["results", "jobs", "people"]
                .iter()
                .find_map(|k| map.get(*k).and_then(|v| v.as_array()).cloned())
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let mut hits = Vec::new();
        for item in items {
            let get = |keys: &[&str]| {
                keys.iter()
                    .find_map(|k| item.get(*k).and_then(|v| v.as_str()))
                    .unwrap_or_default()
                    .to_string()
            };
            let url = get(&["url", "link"]);
            if url.is_empty() {
                continue;
            }
            let mut hit = SearchResult::new(get(&["title", "name", "headline"]), url);
            hit.snippet = get(&["description", "company"]).chars().take(200).collect();
            hits.push(hit);
            if hits.len() >= limit {
                break;
            }
        }
        hits
    }

    async fn search_via_mcp(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if !self.mcporter.has_server(SERVER_KEY, SERVER_ALIASES) {
            return Err(Error::Search("linkedin MCP server not configured".to_string()));
        }
        // Jobs first (the common case), then people.
        for func in ["search_jobs", "search_people"] {
            let expr = format!(
                "linkedin.{func}(keywords: \"{}\")",
                mcporter::quote_arg(query)
            );
            if let Ok(out) = self.call(expr, SEARCH_TIMEOUT).await {
                let hits = Self::parse_search_output(&out, limit);
                if !hits.is_empty() {
                    return Ok(hits);
                }
            }
        }
        Err(Error::Search("linkedin MCP search returned nothing".to_string()))
    }
}

#[async_trait]
impl Adapter for LinkedinAdapter {
    fn name(&self) -> &'static str {
        "linkedin"
    }
    fn description(&self) -> &'static str {
        "LinkedIn profiles, companies, and jobs"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["linkedin-scraper-mcp", "Jina Reader"]
    }
    fn tier(&self) -> Tier {
        Tier::ManualSetup
    }

    fn can_handle(&self, url: &str) -> bool {
        host_matches(url, &["linkedin.com"])
    }

    async fn read(&self, url: &str, _config: &Config) -> Result<ReadResult> {
        let steps = vec![
            ReadStep::new("linkedin-mcp", Box::pin(self.read_via_mcp(url))),
            ReadStep::new("jina", Box::pin(self.read_via_jina(url))),
        ];
        Ok(run_read_chain(
            "linkedin",
            url,
            steps,
            "LinkedIn pages need a login for full content. Install linkedin-scraper-mcp:\n  pip install linkedin-scraper-mcp\n  linkedin-scraper-mcp --login\n  mcporter config add linkedin http://localhost:8001/mcp",
        )
        .await)
    }

    async fn search(
        &self,
        query: &str,
        config: &Config,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let site_query = format!("site:linkedin.com {query}");
        let steps = vec![
            SearchStep::new("linkedin-mcp", Box::pin(self.search_via_mcp(query, limit))),
            SearchStep::new("exa", Box::pin(self.exa.search(&site_query, config, limit))),
        ];
        run_search_chain("linkedin", steps).await
    }

    async fn check(&self, _config: &Config) -> Result<(HealthStatus, String)> {
        if self.mcporter.has_server(SERVER_KEY, SERVER_ALIASES) {
            return Ok((
                HealthStatus::Ok,
                "fully available (profiles, companies, job search)".to_string(),
            ));
        }
        if crate::shellout::has("linkedin-scraper-mcp") {
            return Ok((
                HealthStatus::Warn,
                "linkedin-scraper-mcp installed but not wired into mcporter. Run:\n  1. linkedin-scraper-mcp --login\n  2. linkedin-scraper-mcp --transport streamable-http --port 8001\n  3. mcporter config add linkedin http://localhost:8001/mcp"
                    .to_string(),
            ));
        }
        Ok((
            HealthStatus::Off,
            "partial reads work through Jina Reader. Full access needs install:\n  1. pip install linkedin-scraper-mcp\n  2. linkedin-scraper-mcp --login\n  3. linkedin-scraper-mcp --transport streamable-http --port 8001\n  4. mcporter config add linkedin http://localhost:8001/mcp\n  See https://github.com/stickerdaniel/linkedin-mcp-server"
                .to_string(),
        ))
    }
}
