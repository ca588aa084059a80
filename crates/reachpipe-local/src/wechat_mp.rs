//! WeChat Official Accounts (微信公众号) — articles read through the public
//! reader; `mcporter` + wechat-official-account-mcp covers the authenticated
//! account surface, which the health check probes.

use crate::chain::{run_read_chain, ReadStep};
use crate::jina::{self, JinaReader};
use crate::mcporter::Mcporter;
use crate::youtube::host_matches;
use async_trait::async_trait;
use reachpipe_core::{Adapter, Config, Error, HealthStatus, ReadResult, Result, Tier};
use std::sync::Arc;
use std::time::Duration;

const SERVER_KEY: &str = "wechat-mp";
const SERVER_ALIASES: &[&str] = &["wechat"];
const AUTH_TIMEOUT: Duration = Duration::from_secs(15);

pub struct WechatMpAdapter {
    mcporter: Arc<Mcporter>,
    reader: JinaReader,
}

impl WechatMpAdapter {
    pub fn new(client: reqwest::Client, mcporter: Arc<Mcporter>) -> Self {
        Self {
            mcporter,
            reader: JinaReader::new(client),
        }
    }

    async fn read_via_jina(&self, url: &str) -> Result<ReadResult> {
        let page = self.reader.read(url, jina::DEFAULT_TIMEOUT).await?;
        Ok(ReadResult::new(
            "wechat-mp",
            url,
            page.title.unwrap_or_else(|| url.to_string()),
            page.markdown,
        ))
    }
}

#[async_trait]
impl Adapter for WechatMpAdapter {
    fn name(&self) -> &'static str {
        "wechat-mp"
    }
    fn description(&self) -> &'static str {
        "WeChat Official Account articles"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["wechat-official-account-mcp", "Jina Reader"]
    }
    fn tier(&self) -> Tier {
        Tier::ManualSetup
    }

    fn can_handle(&self, url: &str) -> bool {
        host_matches(url, &["mp.weixin.qq.com"])
    }

    async fn read(&self, url: &str, _config: &Config) -> Result<ReadResult> {
        // Article pages are public; no MCP round-trip needed for reading.
        let steps = vec![ReadStep::new("jina", Box::pin(self.read_via_jina(url)))];
        Ok(run_read_chain(
            "wechat-mp",
            url,
            steps,
            "The article may be deleted or the reader rate-limited; try again later.",
        )
        .await)
    }

    async fn check(&self, _config: &Config) -> Result<(HealthStatus, String)> {
        if !self.mcporter.installed() {
            return Ok((
                HealthStatus::Off,
                "needs mcporter + wechat-official-account-mcp. Setup:\n  1. npm install -g mcporter\n  2. npm install -g wechat-official-account-mcp\n  3. mcporter config add wechat-mp --stdio \"wechat-mcp mcp -a <APP_ID> -s <APP_SECRET>\"\n  See https://github.com/xwang152-jack/wechat-official-account-mcp"
                    .to_string(),
            ));
        }
        if !self.mcporter.has_server(SERVER_KEY, SERVER_ALIASES) {
            return Ok((
                HealthStatus::Off,
                "mcporter installed but the WeChat MCP server is not configured. Run:\n  npm install -g wechat-official-account-mcp\n  mcporter config add wechat-mp --stdio \"wechat-mcp mcp -a <APP_ID> -s <APP_SECRET>\"\n  Needs the AppID and AppSecret from the account console"
                    .to_string(),
            ));
        }
        let mc = Arc::clone(&self.mcporter);
        let auth = tokio::task::spawn_blocking(move || {
            mc.call("wechat-mp.wechat_auth(action: \"get_config\")", AUTH_TIMEOUT)
        })
        .await
        .map_err(|e| Error::Tool(format!("mcporter join failed: {e}")))?;

        match auth {
            Ok(out) if !out.to_lowercase().contains("error") => Ok((
                HealthStatus::Ok,
                "fully available (drafts, publishing, media, users, stats, messages)".to_string(),
            )),
            Ok(_) => Ok((
                HealthStatus::Warn,
                "MCP connected but auth failed, verify the AppID/AppSecret".to_string(),
            )),
            Err(_) => Ok((
                HealthStatus::Warn,
                "MCP call failed, check that wechat-mcp is running".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_official_account_host_only() {
        let a = WechatMpAdapter::new(reqwest::Client::new(), Arc::new(Mcporter::new()));
        assert!(a.can_handle("https://mp.weixin.qq.com/s/AbCdEf"));
        assert!(!a.can_handle("https://weixin.qq.com/"));
        assert!(!a.can_handle("https://example.com/mp.weixin.qq.com"));
    }

    #[tokio::test]
    async fn read_degrades_when_the_reader_is_unreachable() {
        let _lock = crate::test_env::lock();
        std::env::set_var("REACHPIPE_JINA_ENDPOINT", "http://127.0.0.1:1");
        let a = WechatMpAdapter::new(reqwest::Client::new(), Arc::new(Mcporter::new()));
        let r = a
            .read("https://mp.weixin.qq.com/s/AbCdEf", &Config::new())
            .await
            .unwrap();
        std::env::remove_var("REACHPIPE_JINA_ENDPOINT");

        assert!(r.is_degraded(), "content: {}", r.content);
        assert_eq!(r.platform, "wechat-mp");
        assert!(r.content.contains("jina:"));
    }
}
