//! Bilibili — same `yt-dlp` backend as YouTube, with an optional proxy
//! (`bilibili_proxy`) for geo-restricted content.

use crate::chain::{run_read_chain, ReadStep};
use crate::jina::{self, JinaReader};
use crate::youtube::host_matches;
use crate::{shellout, ytdlp};
use async_trait::async_trait;
use reachpipe_core::{Adapter, Config, Error, HealthStatus, ReadResult, Result, Tier};

pub struct BilibiliAdapter {
    reader: JinaReader,
}

impl BilibiliAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            reader: JinaReader::new(client),
        }
    }

    async fn read_via_ytdlp(&self, url: &str, config: &Config) -> Result<ReadResult> {
        if !shellout::has("yt-dlp") {
            return Err(Error::Tool("yt-dlp not installed".to_string()));
        }
        let proxy = config.get("bilibili_proxy");
        let url_s = url.to_string();
        let info = tokio::task::spawn_blocking(move || {
            ytdlp::fetch_metadata(&url_s, proxy.as_deref())
        })
        .await
        .map_err(|e| Error::Tool(format!("yt-dlp join failed: {e}")))??;

        let mut out = ReadResult::new("bilibili", url, info.title, info.description);
        out.author = info.uploader;
        out.date = info.upload_date;
        Ok(out)
    }

    async fn read_via_jina(&self, url: &str) -> Result<ReadResult> {
        let page = self.reader.read(url, jina::DEFAULT_TIMEOUT).await?;
        Ok(ReadResult::new(
            "bilibili",
            url,
            page.title.unwrap_or_else(|| url.to_string()),
            page.markdown,
        ))
    }
}

#[async_trait]
impl Adapter for BilibiliAdapter {
    fn name(&self) -> &'static str {
        "bilibili"
    }
    fn description(&self) -> &'static str {
        "Bilibili videos and subtitles"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["yt-dlp", "Jina Reader"]
    }
    fn tier(&self) -> Tier {
        Tier::FreeCredential
    }

    fn can_handle(&self, url: &str) -> bool {
        host_matches(url, &["bilibili.com", "b23.tv"])
    }

    async fn read(&self, url: &str, config: &Config) -> Result<ReadResult> {
        let steps = vec![
            ReadStep::new("yt-dlp", Box::pin(self.read_via_ytdlp(url, config))),
            ReadStep::new("jina", Box::pin(self.read_via_jina(url))),
        ];
        Ok(run_read_chain(
            "bilibili",
            url,
            steps,
            "Install yt-dlp: pip install yt-dlp. A server IP may also need a proxy (bilibili_proxy).",
        )
        .await)
    }

    async fn check(&self, config: &Config) -> Result<(HealthStatus, String)> {
        if !shellout::has("yt-dlp") {
            return Ok((
                HealthStatus::Off,
                "yt-dlp not installed. Install: pip install yt-dlp".to_string(),
            ));
        }
        if config.get("bilibili_proxy").is_some() {
            Ok((
                HealthStatus::Ok,
                "can extract video info and subtitles (proxy configured)".to_string(),
            ))
        } else {
            Ok((
                HealthStatus::Ok,
                "can extract video info and subtitles (local network). A server IP may need a proxy"
                    .to_string(),
            ))
        }
    }
}
