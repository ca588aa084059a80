//! YouTube — videos and captions via `yt-dlp`, generic reader as fallback.

use crate::chain::{run_read_chain, ReadStep};
use crate::jina::{self, JinaReader};
use crate::{shellout, ytdlp};
use async_trait::async_trait;
use reachpipe_core::{Adapter, Config, Error, HealthStatus, ReadResult, Result, Tier};

pub fn host_matches(url: &str, needles: &[&str]) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|h| needles.iter().any(|n| h.contains(n)))
        .unwrap_or(false)
}

pub struct YoutubeAdapter {
    reader: JinaReader,
}

impl YoutubeAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            reader: JinaReader::new(client),
        }
    }

    async fn read_via_ytdlp(&self, url: &str) -> Result<ReadResult> {
        if !shellout::has("yt-dlp") {
            return Err(Error::Tool("yt-dlp not installed".to_string()));
        }
        let url_meta = url.to_string();
        let info = tokio::task::spawn_blocking(move || ytdlp::fetch_metadata(&url_meta, None))
            .await
            .map_err(|e| Error::Tool(format!("yt-dlp join failed: {e}")))??;

        // Captions are best-effort; a video without them still reads fine.
        let url_subs = url.to_string();
        let transcript = tokio::task::spawn_blocking(move || {
            ytdlp::fetch_transcript(&url_subs, None, ytdlp::CAPTIONS_TIMEOUT)
        })
        .await
        .map_err(|e| Error::Tool(format!("yt-dlp join failed: {e}")))?;

        let mut content = info.description.clone();
        if let Ok(t) = transcript {
            if !t.is_empty() {
                content.push_str("\n\n## Transcript\n\n");
                content.push_str(&t);
            }
        }
        let mut out = ReadResult::new("youtube", url, info.title, content);
        out.author = info.uploader;
        out.date = info.upload_date;
        Ok(out)
    }

    async fn read_via_jina(&self, url: &str) -> Result<ReadResult> {
        let page = self.reader.read(url, jina::DEFAULT_TIMEOUT).await?;
        Ok(ReadResult::new(
            "youtube",
            url,
            page.title.unwrap_or_else(|| url.to_string()),
            page.markdown,
        ))
    }
}

#[async_trait]
impl Adapter for YoutubeAdapter {
    fn name(&self) -> &'static str {
        "youtube"
    }
    fn description(&self) -> &'static str {
        "YouTube videos and captions"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["yt-dlp", "Jina Reader"]
    }
    fn tier(&self) -> Tier {
        Tier::ZeroConfig
    }

    fn can_handle(&self, url: &str) -> bool {
        host_matches(url, &["youtube.com", "youtu.be"])
    }

    async fn read(&self, url: &str, _config: &Config) -> Result<ReadResult> {
        let steps = vec![
            ReadStep::new("yt-dlp", Box::pin(self.read_via_ytdlp(url))),
            ReadStep::new("jina", Box::pin(self.read_via_jina(url))),
        ];
        Ok(run_read_chain(
            "youtube",
            url,
            steps,
            "Install yt-dlp for video metadata and captions: pip install yt-dlp",
        )
        .await)
    }

    async fn check(&self, _config: &Config) -> Result<(HealthStatus, String)> {
        if shellout::has("yt-dlp") {
            Ok((
                HealthStatus::Ok,
                "can extract video info and captions".to_string(),
            ))
        } else {
            Ok((
                HealthStatus::Off,
                "yt-dlp not installed. Install: pip install yt-dlp".to_string(),
            ))
        }
    }
}
