use std::sync::Arc;

use hayase_core::{Config, SanitizedConfig, SearchAggregator, SessionManager};

/// Shared application state
pub struct AppState {
    config: Config,
    sessions: Arc<SessionManager>,
    aggregator: Arc<SearchAggregator>,
}

impl AppState {
    pub fn new(
        config: Config,
        sessions: Arc<SessionManager>,
        aggregator: Arc<SearchAggregator>,
    ) -> Self {
        Self {
            config,
            sessions,
            aggregator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn aggregator(&self) -> &SearchAggregator {
        &self.aggregator
    }
}
