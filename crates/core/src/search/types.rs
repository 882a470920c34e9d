//! Types for the multi-indexer search system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A normalized search result, source-agnostic.
///
/// `id` is only stable within one response: the aggregator re-assigns
/// dense ids (0..n-1) after merging so list indexing downstream stays
/// contiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateTorrent {
    /// Dense per-response id.
    pub id: usize,
    /// Release title.
    pub title: String,
    /// Web page for the release.
    pub link: String,
    /// Direct .torrent link / GUID, when the source provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_url: Option<String>,
    /// Magnet URI, provided or synthesized from the source's info hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnet_uri: Option<String>,
    /// Seeder count (0 when unknown).
    pub seeders: u32,
    /// Leecher count (0 when unknown).
    pub leechers: u32,
    /// Size in bytes, whatever unit the source reported in.
    pub total_size: u64,
    /// Which indexer produced this result.
    pub source: String,
}

impl CandidateTorrent {
    /// The identifier a play request should use, preferring magnets.
    pub fn resolvable_id(&self) -> Option<&str> {
        self.magnet_uri
            .as_deref()
            .filter(|m| !m.is_empty())
            .or(self.torrent_url.as_deref().filter(|u| !u.is_empty()))
    }
}

/// Errors from a single indexer source.
///
/// Always absorbed by the aggregator: a failed source contributes an
/// empty result, never an aborted search.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Source timed out")]
    Timeout,
}

/// A single indexer.
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Source tag stamped on every candidate.
    fn name(&self) -> &str;

    /// Fetch and normalize results for a free-text query.
    async fn search(&self, query: &str) -> Result<Vec<CandidateTorrent>, SourceError>;
}
