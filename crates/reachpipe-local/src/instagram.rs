//! Instagram — `instaloader` CLI for posts, generic reader for everything
//! else. Instagram's anti-bot measures are aggressive; even valid cookies
//! can hit 401s, so every path falls back to the public reader.

use crate::chain::{run_read_chain, ReadStep};
use crate::exa::ExaClient;
use crate::jina::{self, JinaReader};
use crate::shellout;
use crate::youtube::host_matches;
use async_trait::async_trait;
use reachpipe_core::{
    Adapter, Config, Error, HealthStatus, ReadResult, Result, SearchResult, Tier,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const POST_TIMEOUT: Duration = Duration::from_secs(15);

pub fn cookie_file_path() -> Option<PathBuf> {
    let home = shellout::env("HOME")?;
    Some(PathBuf::from(home).join(".reachpipe").join("instagram-cookies.txt"))
}

/// `sessionid=xxx; csrftoken=yyy` → map.
fn parse_cookie_header(raw: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for part in raw.split(';') {
        if let Some((k, v)) = part.split_once('=') {
            out.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    out
}

fn session_file_ok(path: &Path) -> bool {
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let cookies = parse_cookie_header(raw.trim());
            cookies.contains_key("sessionid") && cookies.contains_key("csrftoken")
        }
        Err(_) => false,
    }
}

/// `https://instagram.com/p/DEADBEEF/` → `DEADBEEF`.
fn shortcode_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let mut segs = parsed.path_segments()?;
    while let Some(seg) = segs.next() {
        if seg == "p" || seg == "reel" {
            let code = segs.next()?;
            if !code.is_empty()
                && code
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Some(code.to_string());
            }
            return None;
        }
    }
    None
}

pub struct InstagramAdapter {
    exa: ExaClient,
    reader: JinaReader,
}

impl InstagramAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            exa: ExaClient::new(client.clone()),
            reader: JinaReader::new(client),
        }
    }

    /// Download post metadata (caption text, no media) into a scratch dir
    /// and read the caption file instaloader writes.
    fn read_post_blocking(url: &str, shortcode: &str) -> Result<ReadResult> {
        let tmpdir =
            tempfile::tempdir().map_err(|e| Error::Tool(format!("tempdir failed: {e}")))?;
        let mut cmd = Command::new("instaloader");
        cmd.current_dir(tmpdir.path())
            .arg("--dirname-pattern=.")
            .arg("--no-pictures")
            .arg("--no-videos")
            .arg("--no-video-thumbnails")
            .arg("--no-metadata-json")
            .arg("--quiet")
            .arg("--")
            .arg(format!("-{shortcode}"));
        shellout::run_stdout_bounded(cmd, POST_TIMEOUT, 64 * 1024)
            .map_err(|code| Error::Tool(format!("instaloader failed: {code}")))?;

        let mut caption = String::new();
        if let Ok(rd) = std::fs::read_dir(tmpdir.path()) {
            for ent in rd.flatten() {
                let p = ent.path();
                if p.extension().and_then(|s| s.to_str()) == Some("txt") {
                    caption = std::fs::read_to_string(&p).unwrap_or_default();
                    break;
                }
            }
        }
        if caption.trim().is_empty() {
            return Err(Error::Tool("instaloader returned no caption".to_string()));
        }

        let first_line = caption.lines().next().unwrap_or("").chars().take(80).collect::<String>();
        Ok(ReadResult::new(
            "instagram",
            url,
            format!("Instagram post: {first_line}"),
            caption,
        ))
    }

    async fn read_via_instaloader(&self, url: &str) -> Result<ReadResult> {
        if !shellout::has("instaloader") {
            return Err(Error::Tool("instaloader not installed".to_string()));
        }
        // Profiles need a logged-in scrape session; only posts go this way.
        let shortcode = shortcode_from_url(url)
            .ok_or_else(|| Error::Tool("not a post URL".to_string()))?;
        let url_owned = url.to_string();
        tokio::task::spawn_blocking(move || Self::read_post_blocking(&url_owned, &shortcode))
            .await
            .map_err(|e| Error::Tool(format!("instaloader join failed: {e}")))?
    }

    async fn read_via_jina(&self, url: &str) -> Result<ReadResult> {
        let page = self.reader.read(url, jina::DEFAULT_TIMEOUT).await?;
        Ok(ReadResult::new(
            "instagram",
            url,
            page.title.unwrap_or_else(|| url.to_string()),
            page.markdown,
        ))
    }
}

#[async_trait]
impl Adapter for InstagramAdapter {
    fn name(&self) -> &'static str {
        "instagram"
    }
    fn description(&self) -> &'static str {
        "Instagram posts and profiles"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["instaloader", "Jina Reader"]
    }
    fn tier(&self) -> Tier {
        Tier::ManualSetup
    }

    fn can_handle(&self, url: &str) -> bool {
        host_matches(url, &["instagram.com", "instagr.am"])
    }

    async fn read(&self, url: &str, _config: &Config) -> Result<ReadResult> {
        let steps = vec![
            ReadStep::new("instaloader", Box::pin(self.read_via_instaloader(url))),
            ReadStep::new("jina", Box::pin(self.read_via_jina(url))),
        ];
        Ok(run_read_chain(
            "instagram",
            url,
            steps,
            "Install instaloader (pip install instaloader) and configure cookies in ~/.reachpipe/instagram-cookies.txt (sessionid=...; csrftoken=...)",
        )
        .await)
    }

    async fn search(
        &self,
        query: &str,
        config: &Config,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.exa
            .search(&format!("site:instagram.com {query}"), config, limit)
            .await
    }

    async fn check(&self, _config: &Config) -> Result<(HealthStatus, String)> {
        if !shellout::has("instaloader") {
            return Ok((
                HealthStatus::Off,
                "instaloader not installed. Install: pip install instaloader\n  Then configure cookies in ~/.reachpipe/instagram-cookies.txt"
                    .to_string(),
            ));
        }
        let Some(cookie_file) = cookie_file_path() else {
            return Ok((
                HealthStatus::Warn,
                "cannot locate home directory for the cookie file".to_string(),
            ));
        };
        if cookie_file.exists() {
            if session_file_ok(&cookie_file) {
                Ok((
                    HealthStatus::Ok,
                    "cookies configured, can read posts and profiles".to_string(),
                ))
            } else {
                Ok((
                    HealthStatus::Warn,
                    "cookie file exists but is missing sessionid or csrftoken. Rewrite ~/.reachpipe/instagram-cookies.txt as \"sessionid=xxx; csrftoken=yyy\""
                        .to_string(),
                ))
            }
        } else {
            Ok((
                HealthStatus::Ok,
                "can read public posts and profiles. Configure cookies in ~/.reachpipe/instagram-cookies.txt for logged-in access"
                    .to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_instagram_hosts() {
        let a = InstagramAdapter::new(reqwest::Client::new());
        assert!(a.can_handle("https://www.instagram.com/p/DEADbeef_1-/"));
        assert!(a.can_handle("https://instagr.am/rustlang"));
        assert!(!a.can_handle("https://example.com/instagram"));
    }

    #[test]
    fn extracts_shortcodes_from_post_and_reel_urls() {
        assert_eq!(
            shortcode_from_url("https://instagram.com/p/Abc_12-xyz/").as_deref(),
            Some("Abc_12-xyz")
        );
        assert_eq!(
            shortcode_from_url("https://instagram.com/reel/XYZ/").as_deref(),
            Some("XYZ")
        );
        assert_eq!(shortcode_from_url("https://instagram.com/rustlang/"), None);
        assert_eq!(shortcode_from_url("https://instagram.com/p//"), None);
    }

    #[test]
    fn cookie_header_parsing_and_validation() {
        let cookies = parse_cookie_header("sessionid=abc; csrftoken=def; other=1");
        assert_eq!(cookies.get("sessionid").map(String::as_str), Some("abc"));
        assert_eq!(cookies.len(), 3);

        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        std::fs::write(&good, "sessionid=abc; csrftoken=def").unwrap();
        assert!(session_file_ok(&good));

        let bad = dir.path().join("bad.txt");
        std::fs::write(&bad, "csrftoken=def").unwrap();
        assert!(!session_file_ok(&bad));
        assert!(!session_file_ok(&dir.path().join("missing.txt")));
    }
}
