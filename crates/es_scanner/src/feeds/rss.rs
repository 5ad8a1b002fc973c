use std::time::Duration;
use async_trait::async_trait;
use es_core::{Error, FeedEntry, FeedTransport, Result};
use tracing::debug;
use crate::config::ScannerConfig;
use super::plain_text;

/// RSS/Atom transport over HTTP.
pub struct RssTransport {
    client: reqwest::Client,
}

impl RssTransport {
    pub fn new(config: &ScannerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedTransport for RssTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        let entries = parse_feed(&bytes)?;
        debug!(feed_url = url, entries = entries.len(), "feed parsed");
        Ok(entries)
    }
}

/// Parse an RSS, Atom or JSON feed body into entries, preserving order.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>> {
    let feed = feed_rs::parser::parse(bytes)
        .map_err(|e| Error::Feed(format!("Failed to parse feed: {}", e)))?;

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.trim().to_string())
                .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))
                .unwrap_or_default();

            let summary = entry
                .summary
                .map(|t| t.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .map(|s| plain_text(&s))
                .unwrap_or_default();

            FeedEntry {
                link,
                title: entry.title.map(|t| plain_text(&t.content)).unwrap_or_default(),
                summary,
                published_at: entry.published,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Sức khỏe</title>
    <link>https://vnexpress.net/suc-khoe</link>
    <description>Tin sức khỏe</description>
    <item>
      <title>Hà Nội ghi nhận 15 ca mắc sởi</title>
      <link>https://vnexpress.net/ha-noi-15-ca-soi-1.html</link>
      <description><![CDATA[<a href="https://vnexpress.net/ha-noi-15-ca-soi-1.html"><img src="a.jpg"/></a></br>Số ca mắc sởi tăng nhanh.]]></description>
      <pubDate>Mon, 10 Jun 2024 08:30:00 +0700</pubDate>
    </item>
    <item>
      <title>Mẹo ngủ ngon</title>
      <link>https://vnexpress.net/meo-ngu-ngon-2.html</link>
      <description>Không có ngày đăng</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss_entries() {
        let entries = parse_feed(SAMPLE_RSS.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.title, "Hà Nội ghi nhận 15 ca mắc sởi");
        assert_eq!(first.link, "https://vnexpress.net/ha-noi-15-ca-soi-1.html");
        assert_eq!(first.summary, "Số ca mắc sởi tăng nhanh.");
        assert_eq!(first.published_at, Some(Utc.with_ymd_and_hms(2024, 6, 10, 1, 30, 0).unwrap()));

        assert_eq!(entries[1].published_at, None);
        assert_eq!(entries[1].summary, "Không có ngày đăng");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_feed(b"<html>not a feed</html>"), Err(Error::Feed(_))));
    }
}
