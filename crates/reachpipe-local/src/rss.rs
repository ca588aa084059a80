//! RSS/Atom feeds — built-in `quick-xml` parsing, generic reader fallback.

use crate::chain::{run_read_chain, ReadStep};
use crate::jina::{self, JinaReader};
use async_trait::async_trait;
use reachpipe_core::{Adapter, Config, Error, HealthStatus, ReadResult, Result, Tier};
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_ITEMS: usize = 20;

#[derive(Debug, Default, Clone)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub date: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct Feed {
    pub title: String,
    pub items: Vec<FeedItem>,
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse RSS 2.0 (`<item>`, `<link>text</link>`) and Atom (`<entry>`,
/// `<link href=…/>`) with one pass. Namespace prefixes vary in the wild, so
/// tags are matched by suffix, same as the upstream feeds tolerate.
pub fn parse_feed(body: &str) -> Option<Feed> {
    let mut reader = quick_xml::Reader::from_str(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut feed = Feed::default();
    let mut cur = FeedItem::default();
    let mut in_item = false;
    let mut in_author = false;
    let mut cur_text = String::new();
    let mut saw_feed_root = false;

    let link_href = |e: &quick_xml::events::BytesStart<'_>| -> Option<String> {
        let mut rel: Option<String> = None;
        let mut href: Option<String> = None;
        for a in e.attributes().flatten() {
            let k = String::from_utf8_lossy(a.key.as_ref()).to_string();
            let v = a.unescape_value().map(|v| v.to_string()).unwrap_or_default();
            match k.as_str() {
                "rel" => rel = Some(v),
                "href" => href = Some(v),
                _ => {}
            }
        }
        match rel.as_deref() {
            None | Some("alternate") => href,
            _ => None,
        }
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Eof) => break,
            Ok(quick_xml::events::Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name.ends_with("rss") || name.ends_with("feed") || name.ends_with("channel") {
                    saw_feed_root = true;
                }
                if name.ends_with("item") || name.ends_with("entry") {
                    cur = FeedItem::default();
                    in_item = true;
                }
                if in_item && name.ends_with("author") {
                    in_author = true;
                }
                if in_item && cur.link.is_empty() && name.ends_with("link") {
                    if let Some(href) = link_href(&e) {
                        cur.link = href;
                    }
                }
                cur_text.clear();
            }
            Ok(quick_xml::events::Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if in_item && cur.link.is_empty() && name.ends_with("link") {
                    if let Some(href) = link_href(&e) {
                        cur.link = href;
                    }
                }
            }
            Ok(quick_xml::events::Event::Text(t)) => {
                let txt = t.unescape().map(|t| t.to_string()).unwrap_or_default();
                cur_text.push_str(&txt);
            }
            Ok(quick_xml::events::Event::CData(t)) => {
                cur_text.push_str(&String::from_utf8_lossy(t.as_ref()));
            }
            Ok(quick_xml::events::Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let txt = normalize_ws(&cur_text);
                if in_item {
                    if name.ends_with("item") || name.ends_with("entry") {
                        in_item = false;
                        feed.items.push(std::mem::take(&mut cur));
                    } else if in_author && name.ends_with("author") {
                        in_author = false;
                    } else if in_author && name.ends_with("name") {
                        cur.author = Some(txt);
                    } else if name.ends_with("title") {
                        cur.title = txt;
                    } else if name.ends_with("link") && cur.link.is_empty() {
                        cur.link = txt;
                    } else if name.ends_with("description")
                        || name.ends_with("summary")
                        || name.ends_with("content")
                        || name.ends_with("encoded")
                    {
                        if cur.summary.is_empty() {
                            cur.summary = txt;
                        }
                    } else if name.ends_with("pubDate")
                        || name.ends_with("published")
                        || name.ends_with("updated")
                    {
                        if cur.date.is_none() {
                            cur.date = Some(txt);
                        }
                    } else if name.ends_with("creator") {
                        cur.author = Some(txt);
                    }
                } else if name.ends_with("title") && feed.title.is_empty() {
                    feed.title = txt;
                }
                cur_text.clear();
            }
            Ok(_) => {}
            Err(_) => return None,
        }
        buf.clear();
    }

    if saw_feed_root && !feed.items.is_empty() {
        Some(feed)
    } else {
        None
    }
}

pub fn render_markdown(feed: &Feed) -> String {
    let mut out = String::new();
    for item in feed.items.iter().take(MAX_ITEMS) {
        out.push_str(&format!("## {}\n", item.title));
        if let Some(date) = &item.date {
            out.push_str(&format!("*{date}*"));
            if let Some(author) = &item.author {
                out.push_str(&format!(" — {author}"));
            }
            out.push('\n');
        } else if let Some(author) = &item.author {
            out.push_str(&format!("*{author}*\n"));
        }
        if !item.link.is_empty() {
            out.push_str(&format!("{}\n", item.link));
        }
        if !item.summary.is_empty() {
            out.push('\n');
            out.push_str(&item.summary);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

pub struct RssAdapter {
    client: reqwest::Client,
    reader: JinaReader,
}

impl RssAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            reader: JinaReader::new(client.clone()),
            client,
        }
    }

    async fn read_via_parser(&self, url: &str) -> Result<ReadResult> {
        let resp = self
            .client
            .get(url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("feed fetch HTTP {status}")));
        }
        let body = resp.text().await.map_err(|e| Error::Fetch(e.to_string()))?;
        let feed =
            parse_feed(&body).ok_or_else(|| Error::Fetch("not a parseable feed".to_string()))?;

        let title = if feed.title.is_empty() {
            url.to_string()
        } else {
            feed.title.clone()
        };
        let mut out = ReadResult::new("rss", url, title, render_markdown(&feed));
        out.date = feed.items.first().and_then(|i| i.date.clone());
        Ok(out)
    }

    async fn read_via_jina(&self, url: &str) -> Result<ReadResult> {
        let page = self.reader.read(url, jina::DEFAULT_TIMEOUT).await?;
        Ok(ReadResult::new(
            "rss",
            url,
            page.title.unwrap_or_else(|| url.to_string()),
            page.markdown,
        ))
    }
}

#[async_trait]
impl Adapter for RssAdapter {
    fn name(&self) -> &'static str {
        "rss"
    }
    fn description(&self) -> &'static str {
        "RSS/Atom feeds"
    }
    fn backends(&self) -> &'static [&'static str] {
        &["built-in parser", "Jina Reader"]
    }
    fn tier(&self) -> Tier {
        Tier::ZeroConfig
    }

    fn can_handle(&self, url: &str) -> bool {
        let lower = url.to_ascii_lowercase();
        ["/feed", "/rss", ".xml", "atom"]
            .iter()
            .any(|m| lower.contains(m))
    }

    async fn read(&self, url: &str, _config: &Config) -> Result<ReadResult> {
        let steps = vec![
            ReadStep::new("parser", Box::pin(self.read_via_parser(url))),
            ReadStep::new("jina", Box::pin(self.read_via_jina(url))),
        ];
        Ok(run_read_chain(
            "rss",
            url,
            steps,
            "The URL did not serve a parseable RSS or Atom document.",
        )
        .await)
    }

    async fn check(&self, _config: &Config) -> Result<(HealthStatus, String)> {
        Ok((
            HealthStatus::Ok,
            "can read RSS and Atom feeds (built-in)".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use std::net::SocketAddr;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Example Blog</title>
  <item>
    <title>First post</title>
    <link>https://example.com/first</link>
    <description>Hello &amp; welcome</description>
    <pubDate>Mon, 03 Mar 2025 10:00:00 GMT</pubDate>
  </item>
  <item>
    <title>Second post</title>
    <link>https://example.com/second</link>
    <description><![CDATA[Some <b>rich</b> text]]></description>
  </item>
</channel></rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Release Notes</title>
  <entry>
    <title>v1.2.0</title>
    <link rel="alternate" href="https://example.com/releases/1.2.0"/>
    <summary>Bug fixes</summary>
    <updated>2025-04-01T12:00:00Z</updated>
    <author><name>maintainers</name></author>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_two_point_zero() {
        let feed = parse_feed(RSS_SAMPLE).unwrap();
        assert_eq!(feed.title, "Example Blog");
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].link, "https://example.com/first");
        assert_eq!(feed.items[0].summary, "Hello & welcome");
        assert!(feed.items[0].date.as_deref().unwrap().contains("2025"));
        assert!(feed.items[1].summary.contains("rich"));
    }

    #[test]
    fn parses_atom() {
        let feed = parse_feed(ATOM_SAMPLE).unwrap();
        assert_eq!(feed.title, "Release Notes");
        assert_eq!(feed.items.len(), 1);
        let item = &feed.items[0];
        assert_eq!(item.link, "https://example.com/releases/1.2.0");
        assert_eq!(item.author.as_deref(), Some("maintainers"));
        assert_eq!(item.date.as_deref(), Some("2025-04-01T12:00:00Z"));
    }

    #[test]
    fn rejects_non_feed_documents() {
        assert!(parse_feed("<html><body>nope</body></html>").is_none());
        assert!(parse_feed("plain text").is_none());
    }

    #[test]
    fn url_heuristic_matches_feed_shapes() {
        let a = RssAdapter::new(reqwest::Client::new());
        assert!(a.can_handle("https://example.com/feed"));
        assert!(a.can_handle("https://example.com/blog/rss"));
        assert!(a.can_handle("https://example.com/feed.XML"));
        assert!(a.can_handle("https://example.com/atom"));
        assert!(!a.can_handle("https://example.com/about"));
    }

    #[tokio::test]
    async fn reads_a_served_feed() {
        let app = Router::new().route("/feed.xml", get(|| async { RSS_SAMPLE }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let a = RssAdapter::new(reqwest::Client::new());
        let out = a
            .read(&format!("http://{addr}/feed.xml"), &Config::new())
            .await
            .unwrap();
        assert_eq!(out.title, "Example Blog");
        assert!(out.content.contains("## First post"));
        assert!(!out.is_degraded());
    }
}
