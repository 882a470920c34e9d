//! AnimeTosho JSON feed source.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::ToshoConfig;

use super::size::count_from_json;
use super::{CandidateTorrent, SearchSource, SourceError};

/// One release as the feed reports it. Counts arrive as numbers,
/// strings or null depending on the mirror, so they stay raw here.
#[derive(Debug, Deserialize)]
struct ToshoRelease {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    website_url: Option<String>,
    #[serde(default)]
    torrent_url: Option<String>,
    #[serde(default)]
    magnet_uri: Option<String>,
    #[serde(default)]
    info_hash: Option<String>,
    #[serde(default)]
    seeders: Value,
    #[serde(default)]
    leechers: Value,
    #[serde(default)]
    total_size: Option<u64>,
}

impl ToshoRelease {
    fn into_candidate(self, id: usize, source: &str) -> CandidateTorrent {
        let link = self
            .website_url
            .or(self.link)
            .unwrap_or_default();

        // Synthesize a magnet when the feed only carries the hash.
        let magnet_uri = self.magnet_uri.or_else(|| {
            self.info_hash
                .filter(|h| !h.is_empty())
                .map(|h| format!("magnet:?xt=urn:btih:{}", h))
        });

        CandidateTorrent {
            id,
            title: self.title.unwrap_or_default(),
            link,
            torrent_url: self.torrent_url,
            magnet_uri,
            seeders: count_from_json(&self.seeders),
            leechers: count_from_json(&self.leechers),
            total_size: self.total_size.unwrap_or(0),
            source: source.to_string(),
        }
    }
}

/// AnimeTosho search source (JSON array over HTTP).
pub struct AnimeToshoSource {
    client: Client,
    base_url: String,
}

impl AnimeToshoSource {
    pub const NAME: &'static str = "animetosho";

    /// Create a source from configuration.
    pub fn new(config: &ToshoConfig, timeout: Duration) -> Self {
        Self::with_base_url(config.url.clone(), timeout)
    }

    /// Create a source against an explicit base URL (useful for tests).
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/json?qx=1&q={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(query)
        )
    }
}

#[async_trait]
impl SearchSource for AnimeToshoSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<CandidateTorrent>, SourceError> {
        let url = self.search_url(query);
        debug!(url = %url, "Searching AnimeTosho");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Http(format!("HTTP {}", response.status())));
        }

        let releases: Vec<ToshoRelease> = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        debug!(results = releases.len(), "AnimeTosho search complete");

        Ok(releases
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.into_candidate(i, Self::NAME))
            .collect())
    }
}
