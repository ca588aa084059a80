//! Local adapter implementations: HTTP clients, CLI shellouts, and MCP
//! bridges behind the [`reachpipe_core::Adapter`] trait, plus [`Reach`],
//! the unified entry point that wires the built-in set together.

use futures_util::future::join_all;
use reachpipe_core::{
    Adapter, Config, ReadResult, Registry, Result, SearchResult,
};
use std::sync::Arc;
use std::time::Duration;

pub mod bilibili;
pub mod bosszhipin;
pub mod chain;
pub mod doctor;
pub mod exa;
pub mod github;
pub mod instagram;
pub mod jina;
pub mod linkedin;
pub mod mcporter;
pub mod reddit;
pub mod rss;
pub mod shellout;
pub mod twitter;
pub mod web;
pub mod wechat_mp;
pub mod xiaohongshu;
pub mod youtube;
pub mod ytdlp;

/// Shared HTTP client with hang-forever protection; per-request timeouts
/// still override the total.
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("reachpipe/0.1")
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}

/// The built-in adapter set. Registration order encodes specificity; `web`
/// is the universal fallback and goes last.
pub fn builtin_registry(client: reqwest::Client, mc: Arc<mcporter::Mcporter>) -> Registry {
    let mut registry = Registry::new(Arc::new(web::WebAdapter::new(client.clone())));
    let specific: Vec<Arc<dyn Adapter>> = vec![
        Arc::new(github::GithubAdapter::new(client.clone())),
        Arc::new(reddit::RedditAdapter::new(client.clone())),
        Arc::new(twitter::TwitterAdapter::new(client.clone())),
        Arc::new(youtube::YoutubeAdapter::new(client.clone())),
        Arc::new(bilibili::BilibiliAdapter::new(client.clone())),
        Arc::new(instagram::InstagramAdapter::new(client.clone())),
        Arc::new(xiaohongshu::XiaohongshuAdapter::new(Arc::clone(&mc))),
        Arc::new(linkedin::LinkedinAdapter::new(client.clone(), Arc::clone(&mc))),
        Arc::new(wechat_mp::WechatMpAdapter::new(client.clone(), Arc::clone(&mc))),
        Arc::new(bosszhipin::BosszhipinAdapter::new(client.clone(), mc)),
        Arc::new(rss::RssAdapter::new(client.clone())),
        Arc::new(exa::ExaAdapter::new(client)),
    ];
    for adapter in specific {
        // Names in the built-in set are unique by construction.
        let _ = registry.register(adapter);
    }
    registry
}

/// The unified entry point: route a URL to its platform adapter, read it
/// with fallbacks, search, and report environment health.
pub struct Reach {
    config: Config,
    registry: Registry,
}

impl Default for Reach {
    fn default() -> Self {
        Self::new()
    }
}

impl Reach {
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    pub fn with_config(config: Config) -> Self {
        let registry = builtin_registry(default_client(), Arc::new(mcporter::Mcporter::new()));
        Self { config, registry }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Read any URL. Routing never fails; the result is at worst a degraded
    /// envelope explaining what was tried.
    pub async fn read(&self, url: &str) -> Result<ReadResult> {
        let adapter = self.registry.route(url);
        tracing::debug!(url, adapter = adapter.name(), "routing read");
        adapter.read(url, &self.config).await
    }

    /// Read several URLs concurrently; output order matches input order.
    pub async fn read_batch(&self, urls: &[&str]) -> Vec<Result<ReadResult>> {
        join_all(urls.iter().map(|url| self.read(url))).await
    }

    /// Which adapter a URL routes to, without reading it.
    pub fn detect_platform(&self, url: &str) -> &'static str {
        self.registry.route(url).name()
    }

    /// Semantic web search (Exa).
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.search_platform("exa", query, limit).await
    }

    /// Search within one platform by adapter name.
    pub async fn search_platform(
        &self,
        platform: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let adapter = self.registry.lookup(platform).ok_or_else(|| {
            reachpipe_core::Error::Registry(format!("no adapter named {platform}"))
        })?;
        adapter.search(query, &self.config, limit).await
    }

    /// Check every adapter's environment, concurrently and isolated.
    pub async fn doctor(&self) -> std::collections::BTreeMap<String, doctor::AdapterHealth> {
        doctor::check_all(&self.registry, &self.config).await
    }

    /// Human-readable health report grouped by setup tier.
    pub async fn doctor_report(&self) -> String {
        doctor::format_report(&self.doctor().await)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn reach() -> Reach {
        Reach::new()
    }

    #[test]
    fn every_sample_url_routes_to_its_platform() {
        let r = reach();
        let cases = [
            ("https://github.com/rust-lang/rust", "github"),
            ("https://www.reddit.com/r/rust/comments/abc/", "reddit"),
            ("https://x.com/rustlang/status/17", "twitter"),
            ("https://twitter.com/rustlang", "twitter"),
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "youtube"),
            ("https://youtu.be/dQw4w9WgXcQ", "youtube"),
            ("https://www.bilibili.com/video/BV1xx411c7mD", "bilibili"),
            ("https://b23.tv/abc", "bilibili"),
            ("https://www.instagram.com/p/Abc123/", "instagram"),
            ("https://www.xiaohongshu.com/explore/61deadbeef", "xiaohongshu"),
            ("https://xhslink.com/abc", "xiaohongshu"),
            ("https://www.linkedin.com/in/someone", "linkedin"),
            ("https://mp.weixin.qq.com/s/AbCdEf", "wechat-mp"),
            ("https://www.zhipin.com/job_detail/abc.html", "bosszhipin"),
            ("https://example.com/feed.xml", "rss"),
            ("https://example.com/blog/rss", "rss"),
            ("https://example.com/some/article", "web"),
        ];
        for (url, want) in cases {
            assert_eq!(r.detect_platform(url), want, "url: {url}");
        }
    }

    #[test]
    fn unroutable_input_falls_back_to_web() {
        let r = reach();
        assert_eq!(r.detect_platform(""), "web");
        assert_eq!(r.detect_platform("   "), "web");
        assert_eq!(r.detect_platform("definitely not a url"), "web");
    }

    #[test]
    fn each_sample_url_matches_exactly_one_specific_adapter() {
        // Host predicates must not overlap; otherwise routing would silently
        // depend on registration order.
        let r = reach();
        let samples = [
            "https://github.com/rust-lang/rust",
            "https://www.reddit.com/r/rust/",
            "https://x.com/rustlang",
            "https://www.youtube.com/watch?v=abc",
            "https://www.bilibili.com/video/BV1",
            "https://www.instagram.com/p/Abc/",
            "https://www.xiaohongshu.com/explore/61",
            "https://www.linkedin.com/in/someone",
            "https://mp.weixin.qq.com/s/Ab",
            "https://www.zhipin.com/job_detail/a.html",
        ];
        for url in samples {
            let matching: Vec<&str> = r
                .registry
                .iter()
                .filter(|a| a.name() != "web" && a.can_handle(url))
                .map(|a| a.name())
                .collect();
            assert_eq!(matching.len(), 1, "url {url} matched {matching:?}");
        }
    }

    #[test]
    fn registry_has_the_full_builtin_set() {
        let r = reach();
        for name in [
            "github",
            "reddit",
            "twitter",
            "youtube",
            "bilibili",
            "instagram",
            "xiaohongshu",
            "linkedin",
            "wechat-mp",
            "bosszhipin",
            "rss",
            "exa",
            "web",
        ] {
            assert!(r.registry.lookup(name).is_some(), "missing adapter: {name}");
        }
        assert_eq!(r.registry.len(), 13);
    }

    #[tokio::test]
    async fn search_on_a_readonly_platform_is_not_supported() {
        let r = reach();
        let err = r
            .search_platform("wechat-mp", "anything", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, reachpipe_core::Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn search_on_an_unknown_platform_is_a_registry_error() {
        let r = reach();
        let err = r.search_platform("telegram", "anything", 5).await.unwrap_err();
        assert!(matches!(err, reachpipe_core::Error::Registry(_)));
    }
}
