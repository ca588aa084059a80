//! Boss直聘 (BOSS Zhipin) — job pages through the public reader; job search
//! via `mcporter` + mcp-bosszp with Exa `site:zhipin.com` as the fallback.
//!
//! mcp-bosszp has no keyword search, only `get_recommend_jobs_tool` with
//! filters, so recognized salary/experience/job-type phrases in the query
//! become filter parameters.

use crate::chain::{run_read_chain, run_search_chain, ReadStep, SearchStep};
use crate::exa::ExaClient;
use crate::jina::{self, JinaReader};
use crate::mcporter::Mcporter;
use crate::youtube::host_matches;
use async_trait::async_trait;
use reachpipe_core::{
    Adapter, Config, Error, HealthStatus, ReadResult, Result, SearchResult, Tier,
};
use std::sync::Arc;
use std::time::Duration;

const SERVER_KEY: &str = "bosszhipin";
const SERVER_ALIASES: &[&str] = &["bosszhipin", "boss-zp", "bosszp", "boss", "zhipin"];
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

const EXPERIENCE_MAP: &[(&str, &str)] = &[
    ("应届", "应届生"),
    ("在校", "在校生"),
    ("实习", "在校生"),
    ("1-3年", "一到三年"),
    ("一到三年", "一到三年"),
    ("3-5年", "三到五年"),
    ("三到五年", "三到五年"),
    ("5-10年", "五到十年"),
    ("五到十年", "五到十年"),
    ("10年", "十年以上"),
    ("十年以上", "十年以上"),
    ("1年", "一年以内"),
    ("一年", "一年以内"),
];

const SALARY_MAP: &[(&str, &str)] = &[
    ("3k以下", "3k以下"),
    ("3-5k", "3-5k"),
    ("5-10k", "5-10k"),
    ("10-20k", "10-20k"),
    ("20-50k", "20-50k"),
    ("50k", "50以上"),
];

/// Build the `get_recommend_jobs_tool` parameter list from filter phrases
/// recognized in the query.
fn filter_params(query: &str) -> String {
    let q = query.to_lowercase();
    let mut params = vec!["page: 1".to_string()];
    if let Some((_, val)) = EXPERIENCE_MAP.iter().find(|(k, _)| q.contains(k)) {
        params.push(format!("experience: \"{val}\""));
    }
    if let Some((_, val)) = SALARY_MAP.iter().find(|(k, _)| q.contains(k)) {
        params.push(format!("salary: \"{val}\""));
    }
    if q.contains("兼职") {
        params.push("job_type: \"兼职\"".to_string());
    } else if q.contains("全职") {
        params.push("job_type: \"全职\"".to_string());
    }
    params.join(", ")
}

fn parse_jobs(text: &str, limit: usize) -> Vec<SearchResult> {
    let Ok(data) = serde_json::from_str::<serde_json::Value>(text) else {
        return Vec::new();
    };
    let jobs = match &data {
        serde_json::Value::Array(items) => items.clone(),
        serde_json::Value::Object(map) => ["jobs", "results"]
            .iter()
            .find_map(|k| map.get(*k).and_then(|v| v.as_array()).cloned())
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    let mut hits = Vec::new();
    for job in jobs {
        let get = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| job.get(*k).and_then(|v| v.as_str()))
                .unwrap_or_default()
                .to_string()
        };
        let url = get(&["url"]);
        if url.is_empty() {
            continue;
        }
        let company = get(&["company", "brandName"]);
        let salary = get(&["salary", "salaryDesc"]);
        let mut snippet = String::new();
        if !company.is_empty() {
            snippet = format!("🏢 {company}");
        }
        if !salary.is_empty() {
            if !snippet.is_empty() {
                snippet.push_str(" · ");
            }
            snippet.push_str(&format!("💰 {salary}"));
        }
        let mut hit = SearchResult::new(get(&["title", "jobName"]), url);
        hit.snippet = snippet;
        hits.push(hit);
        if hits.len() >= limit {
            break;
        }
    }
    hits
}

pub struct BosszhipinAdapter {
    mcporter: Arc<Mcporter>,
    exa: ExaClient,
    reader: JinaReader,
}

impl BosszhipinAdapter {
    pub fn new(client: reqwest::Client, mcporter: Arc<Mcporter>) -> Self {
        Self {
            mcporter,
            exa: ExaClient::new(client.clone()),
            reader: JinaReader::new(client),
        }
    }

    async fn read_via_jina(&self, url: &str) -> Result<ReadResult> {
        let page = self.reader.read(url, jina::DEFAULT_TIMEOUT).await?;
        Ok(ReadResult::new(
            "bosszhipin",
            url,
            page.title.unwrap_or_else(|| url.to_string()),
            page.markdown,
        ))
    }

    async fn search_via_mcp(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let Some(server) = self.mcporter.server_for(SERVER_KEY, SERVER_ALIASES) else {
            return Err(Error::Search("bosszhipin MCP server not configured".to_string()));
        };
        let expr = format!("{server}.get_recommend_jobs_tool({})", filter_params(query));
        let mc = Arc::clone(&self.mcporter);
        let out = tokio::task::spawn_blocking(move || mc.call(&expr, SEARCH_TIMEOUT))
            .await
            .map_err(|e| Error::Search(format!("mcporter join failed: {e}")))??;
        let hits = parse_jobs(&out, limit);
        if hits.is_empty() {
            return Err(Error::Search("no jobs in MCP output".to_string()));
        }
        Ok(hits)
    }
}

#[async_trait]
impl Adapter for BosszhipinAdapter {
    fn name(&self) -> &'static str {
        "bosszhipin"
    }
    fn description(&self) -> &'static str {
        "BOSS Zhipin job listings"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["mcp-bosszp", "Exa API", "Jina Reader"]
    }
    fn tier(&self) -> Tier {
        Tier::ManualSetup
    }

    fn can_handle(&self, url: &str) -> bool {
        host_matches(url, &["zhipin.com", "boss.com"])
    }

    async fn read(&self, url: &str, _config: &Config) -> Result<ReadResult> {
        let steps = vec![ReadStep::new("jina", Box::pin(self.read_via_jina(url)))];
        Ok(run_read_chain(
            "bosszhipin",
            url,
            steps,
            "Some BOSS Zhipin pages need a login. Install mcp-bosszp for full access: https://github.com/mucsbr/mcp-bosszp",
        )
        .await)
    }

    async fn search(
        &self,
        query: &str,
        config: &Config,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let site_query = format!("site:zhipin.com {query}");
        let steps = vec![
            SearchStep::new("bosszhipin-mcp", Box::pin(self.search_via_mcp(query, limit))),
            SearchStep::new("exa", Box::pin(self.exa.search(&site_query, config, limit))),
        ];
        run_search_chain("bosszhipin", steps).await
    }

    async fn check(&self, _config: &Config) -> Result<(HealthStatus, String)> {
        if self.mcporter.has_server(SERVER_KEY, SERVER_ALIASES) {
            return Ok((
                HealthStatus::Ok,
                "can search jobs and greet recruiters".to_string(),
            ));
        }
        Ok((
            HealthStatus::Off,
            "job pages readable through Jina Reader. Full access needs install:\n  1. git clone https://github.com/mucsbr/mcp-bosszp.git\n  2. cd mcp-bosszp && pip install -r requirements.txt && playwright install chromium\n  3. python boss_zhipin_fastmcp_v2.py (scan the QR code after it starts)\n  4. mcporter config add bosszhipin http://localhost:8000/mcp"
                .to_string(),
        ))
    }
}
