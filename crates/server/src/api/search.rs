//! Search API handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use hayase_core::CandidateTorrent;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub candidates: Vec<CandidateTorrent>,
    pub count: usize,
    pub sources: Vec<String>,
    pub duration_ms: u64,
}

/// POST /api/v1/search
///
/// Query every configured indexer and return the merged candidate
/// list. Source failures degrade to fewer results, never an error
/// status.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Json<SearchResponse> {
    let start = Instant::now();
    let candidates = state.aggregator().search(&request.query).await;

    Json(SearchResponse {
        query: request.query,
        count: candidates.len(),
        sources: state.aggregator().source_names(),
        duration_ms: start.elapsed().as_millis() as u64,
        candidates,
    })
}
