use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hayase_core::{
    load_config, validate_config, LibrqbitEngine, MetadataStore, SearchAggregator, SessionConfig,
    SessionManager, TransferEngine,
};

use hayase_server::{create_router, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("HAYASE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Cache directory: {}", config.cache.dir);
    info!("Download directory: {}", config.engine.download_path);

    // Create the transfer engine
    let engine: Arc<dyn TransferEngine> = Arc::new(
        LibrqbitEngine::new(&config.engine)
            .await
            .context("Failed to initialize transfer engine")?,
    );
    info!("Transfer engine initialized: {}", engine.name());

    // Open the metadata cache
    let store =
        Arc::new(MetadataStore::open(&config.cache.dir).context("Failed to open metadata cache")?);
    info!("Metadata cache opened");

    // Create the session manager
    let session_config = SessionConfig {
        persist: config.engine.persist,
        streamed: config.engine.streamed,
        snapshot_interval: Duration::from_secs(20),
        stream_url: config.server.stream_url(),
    };
    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&engine),
        Arc::clone(&store),
        session_config,
    ));

    // Create the search aggregator
    let aggregator = Arc::new(SearchAggregator::from_config(&config.search));
    info!("Search sources: {:?}", aggregator.source_names());

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&sessions),
        aggregator,
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Final snapshots, then release every swarm
    info!("Server shutting down...");
    sessions.close_all().await;
    info!("All swarms closed");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
