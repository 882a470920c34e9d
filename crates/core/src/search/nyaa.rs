//! Nyaa RSS feed source.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::NyaaConfig;

use super::size::{parse_count, parse_size};
use super::{CandidateTorrent, SearchSource, SourceError};

/// Trackers appended to magnets synthesized from a feed info hash.
const MAGNET_TRACKERS: &[&str] = &[
    "http://nyaa.tracker.wf:7777/announce",
    "udp://open.stealth.si:80/announce",
    "udp://tracker.opentrackr.org:1337/announce",
    "udp://exodus.desync.com:6969/announce",
    "udp://tracker.torrent.eu.org:451/announce",
];

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Default, Deserialize)]
struct Channel {
    #[serde(default, rename = "item")]
    items: Vec<Item>,
}

/// One feed item. The indexer-specific elements are namespaced.
#[derive(Debug, Default, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    guid: String,
    #[serde(default, rename = "nyaa:seeders", alias = "seeders")]
    seeders: String,
    #[serde(default, rename = "nyaa:leechers", alias = "leechers")]
    leechers: String,
    #[serde(default, rename = "nyaa:infoHash", alias = "infoHash")]
    info_hash: String,
    #[serde(default, rename = "nyaa:size", alias = "size")]
    size: String,
}

impl Item {
    fn into_candidate(self, id: usize, source: &str) -> CandidateTorrent {
        let magnet_uri = if self.info_hash.is_empty() {
            None
        } else {
            Some(synthesize_magnet(&self.info_hash, &self.title))
        };

        CandidateTorrent {
            id,
            title: self.title,
            link: self.link.clone(),
            torrent_url: Some(self.guid).filter(|g| !g.is_empty()),
            magnet_uri,
            seeders: parse_count(&self.seeders),
            leechers: parse_count(&self.leechers),
            total_size: parse_size(&self.size),
            source: source.to_string(),
        }
    }
}

/// Build a magnet URI from an info hash plus the standard tracker set.
fn synthesize_magnet(info_hash: &str, title: &str) -> String {
    let mut magnet = format!(
        "magnet:?xt=urn:btih:{}&dn={}",
        info_hash,
        urlencoding::encode(title)
    );
    for tracker in MAGNET_TRACKERS {
        magnet.push_str("&tr=");
        magnet.push_str(&urlencoding::encode(tracker));
    }
    magnet
}

/// Decode a feed document into candidates. Items without a title are
/// skipped rather than failing the whole feed.
fn parse_feed(xml: &str, source: &str) -> Result<Vec<CandidateTorrent>, SourceError> {
    let rss: Rss = quick_xml::de::from_str(xml).map_err(|e| SourceError::Decode(e.to_string()))?;

    Ok(rss
        .channel
        .items
        .into_iter()
        .filter(|item| !item.title.is_empty())
        .enumerate()
        .map(|(i, item)| item.into_candidate(i, source))
        .collect())
}

/// Nyaa search source (RSS over HTTP).
pub struct NyaaSource {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl NyaaSource {
    pub const NAME: &'static str = "nyaa";

    /// Create a source from configuration.
    pub fn new(config: &NyaaConfig, timeout: Duration) -> Self {
        Self::with_base_url(config.url.clone(), config.user_agent.clone(), timeout)
    }

    /// Create a source against an explicit base URL (useful for tests).
    pub fn with_base_url(
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            user_agent: user_agent.into(),
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/?page=rss&q={}&c=1_2&f=0",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(query)
        )
    }
}

#[async_trait]
impl SearchSource for NyaaSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<CandidateTorrent>, SourceError> {
        let url = self.search_url(query);
        debug!(url = %url, "Searching Nyaa");

        let response = self
            .client
            .get(&url)
            // The feed blocks unknown agents.
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Http(format!("HTTP {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let candidates = parse_feed(&body, Self::NAME)?;
        debug!(results = candidates.len(), "Nyaa search complete");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:nyaa="https://nyaa.si/xmlns/nyaa">
  <channel>
    <title>Feed</title>
    <item>
      <title>Example Show - 01 [1080p]</title>
      <link>https://nyaa.example/view/1</link>
      <guid>https://nyaa.example/download/1.torrent</guid>
      <nyaa:seeders>250</nyaa:seeders>
      <nyaa:leechers>12</nyaa:leechers>
      <nyaa:infoHash>abcdef0123456789abcdef0123456789abcdef01</nyaa:infoHash>
      <nyaa:size>1.5 GiB</nyaa:size>
    </item>
    <item>
      <title></title>
      <link>https://nyaa.example/view/2</link>
    </item>
    <item>
      <title>Example Show - 02 [720p]</title>
      <link>https://nyaa.example/view/3</link>
      <guid>https://nyaa.example/download/3.torrent</guid>
      <nyaa:seeders>not-a-number</nyaa:seeders>
      <nyaa:size>bogus</nyaa:size>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_maps_items() {
        let candidates = parse_feed(FEED, "nyaa").unwrap();

        // The empty-title item is skipped and ids stay dense.
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, 0);
        assert_eq!(candidates[1].id, 1);

        let first = &candidates[0];
        assert_eq!(first.title, "Example Show - 01 [1080p]");
        assert_eq!(first.seeders, 250);
        assert_eq!(first.leechers, 12);
        assert_eq!(first.total_size, (1.5 * 1024.0 * 1024.0 * 1024.0) as u64);
        assert_eq!(
            first.torrent_url.as_deref(),
            Some("https://nyaa.example/download/1.torrent")
        );
        let magnet = first.magnet_uri.as_deref().unwrap();
        assert!(magnet.starts_with(
            "magnet:?xt=urn:btih:abcdef0123456789abcdef0123456789abcdef01&dn="
        ));
        assert!(magnet.contains("tracker.opentrackr.org"));

        let second = &candidates[1];
        assert_eq!(second.seeders, 0);
        assert_eq!(second.total_size, 0);
        assert!(second.magnet_uri.is_none());
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        assert!(matches!(
            parse_feed("<html>definitely not rss</html>", "nyaa"),
            Err(SourceError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_search_sends_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/?page=rss&q=example&c=1_2&f=0")
            .match_header("user-agent", "Mozilla/5.0 (test)")
            .with_status(200)
            .with_body(FEED)
            .create_async()
            .await;

        let source = NyaaSource::with_base_url(
            server.url(),
            "Mozilla/5.0 (test)",
            Duration::from_secs(5),
        );
        let results = source.search("example").await.unwrap();
        mock.assert_async().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source, "nyaa");
    }

    #[tokio::test]
    async fn test_search_http_error_is_source_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let source = NyaaSource::with_base_url(
            server.url(),
            "Mozilla/5.0 (test)",
            Duration::from_secs(5),
        );
        assert!(matches!(
            source.search("x").await,
            Err(SourceError::Http(_))
        ));
    }
}
