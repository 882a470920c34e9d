//! Mock search sources for aggregator tests.

use async_trait::async_trait;
use std::time::Duration;

use crate::search::{CandidateTorrent, SearchSource, SourceError};

/// A source that returns a fixed candidate list.
pub struct StaticSource {
    name: String,
    results: Vec<CandidateTorrent>,
}

impl StaticSource {
    pub fn new(name: &str, results: Vec<CandidateTorrent>) -> Self {
        Self {
            name: name.to_string(),
            results,
        }
    }
}

#[async_trait]
impl SearchSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &str) -> Result<Vec<CandidateTorrent>, SourceError> {
        Ok(self.results.clone())
    }
}

/// A source that always fails.
pub struct FailingSource {
    name: String,
}

impl FailingSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl SearchSource for FailingSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &str) -> Result<Vec<CandidateTorrent>, SourceError> {
        Err(SourceError::Http("mock source failure".to_string()))
    }
}

/// A source that answers after a fixed delay, for deadline tests.
pub struct SlowSource {
    name: String,
    delay: Duration,
    results: Vec<CandidateTorrent>,
}

impl SlowSource {
    pub fn new(name: &str, delay: Duration, results: Vec<CandidateTorrent>) -> Self {
        Self {
            name: name.to_string(),
            delay,
            results,
        }
    }
}

#[async_trait]
impl SearchSource for SlowSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &str) -> Result<Vec<CandidateTorrent>, SourceError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.results.clone())
    }
}
