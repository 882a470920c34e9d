//! Multi-indexer swarm search.
//!
//! One concurrent fetch per configured source, each normalized into
//! `CandidateTorrent` and merged in source order. A source failing or
//! timing out degrades to an empty contribution; the aggregate search
//! itself never fails.

mod nyaa;
mod size;
mod tosho;
mod types;

pub use nyaa::NyaaSource;
pub use size::{count_from_json, parse_count, parse_size};
pub use tosho::AnimeToshoSource;
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::SearchConfig;

/// Scatter/gather front over the configured indexer sources.
pub struct SearchAggregator {
    sources: Vec<Arc<dyn SearchSource>>,
    timeout: Duration,
}

impl SearchAggregator {
    /// Assemble from explicit sources. Order here is merge order.
    pub fn new(sources: Vec<Arc<dyn SearchSource>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    /// Assemble the configured production sources.
    pub fn from_config(config: &SearchConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs as u64);
        let mut sources: Vec<Arc<dyn SearchSource>> = Vec::new();
        if config.tosho.enabled {
            sources.push(Arc::new(AnimeToshoSource::new(&config.tosho, timeout)));
        }
        if config.nyaa.enabled {
            sources.push(Arc::new(NyaaSource::new(&config.nyaa, timeout)));
        }
        Self::new(sources, timeout)
    }

    /// Names of the configured sources, in merge order.
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Query every source concurrently and merge.
    ///
    /// Results are concatenated in configured source order and re-indexed
    /// with dense ids starting at 0. No cross-source deduplication is
    /// performed.
    pub async fn search(&self, query: &str) -> Vec<CandidateTorrent> {
        debug!(query = %query, sources = self.sources.len(), "Starting aggregate search");

        let fetches = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let query = query.to_string();
            let deadline = self.timeout;
            async move {
                let result = match tokio::time::timeout(deadline, source.search(&query)).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::Timeout),
                };
                (source.name().to_string(), result)
            }
        });

        let mut combined: Vec<CandidateTorrent> = Vec::new();
        for (name, result) in join_all(fetches).await {
            match result {
                Ok(mut candidates) => {
                    debug!(source = %name, results = candidates.len(), "Source returned");
                    combined.append(&mut candidates);
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "Source search failed");
                }
            }
        }

        for (i, candidate) in combined.iter_mut().enumerate() {
            candidate.id = i;
        }

        debug!(total = combined.len(), "Aggregate search complete");
        combined
    }
}
