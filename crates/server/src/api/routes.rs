use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, search, stream, swarms};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Search
        .route("/search", post(search::search))
        // Swarm sessions
        .route("/swarms", get(swarms::list_swarms))
        .route("/swarms/play", post(swarms::play))
        .route("/swarms/{hash}/stats", get(swarms::get_stats))
        .route("/swarms/{hash}", delete(swarms::close))
        // Library (cached swarm records)
        .route("/library", get(swarms::list_library))
        .route("/library/stats", get(swarms::library_stats))
        .route("/library/{catalog_id}", get(swarms::catalog_entries))
        .route("/library/{catalog_id}", delete(swarms::clear_catalog));

    // The streaming endpoint stays at the root: players get handed
    // plain `/stream?hash=…` URLs.
    Router::new()
        .route("/stream", get(stream::stream))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
