use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use index_pulse::analysis::Analyzer;
use index_pulse::api::FmpClient;
use index_pulse::broadcast::Broadcaster;
use index_pulse::config::Config;
use index_pulse::db::MarketStore;
use index_pulse::query::QueryService;
use index_pulse::server::{create_app, AppState};
use index_pulse::workers::{IntervalTicker, MarketUpdater, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "index_pulse=info,tower_http=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting index-pulse");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");

    // Initialize database
    let store = Arc::new(MarketStore::new(&config.database_url).await?);
    info!("Database initialized");

    // Initialize API client
    let fmp_client = FmpClient::new(&config.fmp_base_url, &config.fmp_api_key, config.http_timeout())?;
    info!("API client initialized");

    let broadcaster = Broadcaster::new();
    let analyzer = Analyzer::new(Arc::clone(&store), config.analysis);

    let updater = Arc::new(MarketUpdater::new(
        Arc::new(fmp_client),
        Arc::clone(&store),
        analyzer,
        broadcaster.clone(),
        config.tracked_symbols.clone(),
    ));

    let state = AppState {
        query: Arc::new(QueryService::new(Arc::clone(&store), config.tracked_symbols.clone())),
        broadcaster,
    };
    let app = create_app(state);

    // Bind before the first cycle can write anything
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;
    info!("Listening on {}", config.bind_addr());

    let scheduler = Scheduler::new(updater, IntervalTicker::new(config.fetch_interval())).start();
    info!("Scheduler started (interval: {:?})", config.fetch_interval());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    scheduler.stop().await;

    info!("Shutting down index-pulse");
    Ok(())
}

/// Wait for Ctrl-C
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
