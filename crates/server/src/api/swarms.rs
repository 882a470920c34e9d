//! Swarm session and library API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use hayase_core::{EngineError, LibraryEntry, PlayableFile, SessionStats};

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    /// Hash, magnet URI, torrent URL or .torrent path.
    pub identifier: String,
    #[serde(default)]
    pub catalog_id: i64,
    #[serde(default)]
    pub episode: u32,
    /// Return immediately instead of waiting for swarm metadata.
    #[serde(default)]
    pub detached: bool,
}

#[derive(Debug, Serialize)]
pub struct PlayResponse {
    pub files: Vec<PlayableFile>,
}

#[derive(Debug, Serialize)]
pub struct DetachedPlayResponse {
    pub detached: bool,
    pub identifier: String,
}

#[derive(Debug, Serialize)]
pub struct SwarmListResponse {
    pub swarms: Vec<SessionStats>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub entries: Vec<LibraryEntry>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct LibraryStatsResponse {
    pub entries: usize,
    pub total_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn engine_error_response(e: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        EngineError::SwarmNotFound(_) | EngineError::FileNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
        EngineError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/swarms/play
///
/// Join (or resume) a swarm and return its playable files with
/// streaming URLs. With `detached: true` the join proceeds in the
/// background and a 202 comes back immediately.
pub async fn play(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlayRequest>,
) -> impl IntoResponse {
    if request.detached {
        state.sessions().play_detached(
            request.identifier.clone(),
            request.catalog_id,
            request.episode,
        );
        return (
            StatusCode::ACCEPTED,
            Json(DetachedPlayResponse {
                detached: true,
                identifier: request.identifier,
            }),
        )
            .into_response();
    }

    match state
        .sessions()
        .play(&request.identifier, request.catalog_id, request.episode)
        .await
    {
        Ok(files) => Json(PlayResponse { files }).into_response(),
        Err(e) => engine_error_response(e).into_response(),
    }
}

/// GET /api/v1/swarms
///
/// Live statistics for every active swarm.
pub async fn list_swarms(State(state): State<Arc<AppState>>) -> Json<SwarmListResponse> {
    let swarms = state.sessions().all_stats().await;
    let count = swarms.len();
    Json(SwarmListResponse { swarms, count })
}

/// GET /api/v1/swarms/{hash}/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> impl IntoResponse {
    match state.sessions().stats(&hash).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => engine_error_response(e).into_response(),
    }
}

/// DELETE /api/v1/swarms/{hash}
///
/// Final snapshot, then release the swarm.
pub async fn close(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> impl IntoResponse {
    match state.sessions().close(&hash).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => engine_error_response(e).into_response(),
    }
}

/// GET /api/v1/library
pub async fn list_library(State(state): State<Arc<AppState>>) -> Json<LibraryResponse> {
    let entries = state.sessions().library();
    let count = entries.len();
    Json(LibraryResponse { entries, count })
}

/// GET /api/v1/library/stats
pub async fn library_stats(State(state): State<Arc<AppState>>) -> Json<LibraryStatsResponse> {
    let (entries, total_bytes) = state.sessions().cache_stats();
    Json(LibraryStatsResponse {
        entries,
        total_bytes,
    })
}

/// GET /api/v1/library/{catalog_id}
pub async fn catalog_entries(
    State(state): State<Arc<AppState>>,
    Path(catalog_id): Path<i64>,
) -> Json<LibraryResponse> {
    let entries = state.sessions().cached_episodes(catalog_id);
    let count = entries.len();
    Json(LibraryResponse { entries, count })
}

/// DELETE /api/v1/library/{catalog_id}
///
/// Drop every cached record of one catalog item. Resident swarms are
/// skipped.
pub async fn clear_catalog(
    State(state): State<Arc<AppState>>,
    Path(catalog_id): Path<i64>,
) -> Json<DeletedResponse> {
    let deleted = state.sessions().clear_catalog_cache(catalog_id).await;
    Json(DeletedResponse { deleted })
}
