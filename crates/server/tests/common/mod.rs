//! Shared helpers for in-process API tests.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;

use hayase_core::testing::MockEngine;
use hayase_core::{
    CandidateTorrent, Config, MetadataStore, SearchAggregator, SearchSource, SessionConfig,
    SessionManager, TransferEngine,
};
use hayase_server::{create_router, AppState};

// Not every test binary touches every helper.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub engine: Arc<MockEngine>,
    pub sessions: Arc<SessionManager>,
    pub store: Arc<MetadataStore>,
    // Keeps the cache directory alive for the test's duration.
    _cache_dir: TempDir,
}

/// Build an app over a mock engine and the given search sources.
pub fn test_app(engine: Arc<MockEngine>, sources: Vec<Arc<dyn SearchSource>>) -> TestApp {
    let cache_dir = TempDir::new().unwrap();
    let store = Arc::new(MetadataStore::open(cache_dir.path()).unwrap());

    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&engine) as Arc<dyn TransferEngine>,
        Arc::clone(&store),
        SessionConfig {
            persist: false,
            streamed: true,
            snapshot_interval: Duration::from_millis(100),
            stream_url: "http://127.0.0.1:8888/stream".to_string(),
        },
    ));

    let aggregator = Arc::new(SearchAggregator::new(sources, Duration::from_secs(1)));

    let state = Arc::new(AppState::new(
        Config::default(),
        Arc::clone(&sessions),
        aggregator,
    ));

    TestApp {
        router: create_router(state),
        engine,
        sessions,
        store,
        _cache_dir: cache_dir,
    }
}

/// One pre-baked candidate, magnet-resolvable to `hash`.
#[allow(dead_code)]
pub fn candidate_for(hash: &str, title: &str, source: &str) -> CandidateTorrent {
    CandidateTorrent {
        id: 0,
        title: title.to_string(),
        link: format!("https://{}.example/view/1", source),
        torrent_url: None,
        magnet_uri: Some(format!("magnet:?xt=urn:btih:{}&dn={}", hash, title)),
        seeders: 42,
        leechers: 3,
        total_size: 4096,
        source: source.to_string(),
    }
}
