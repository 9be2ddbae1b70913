use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use index_pulse::analysis::Analyzer;
use index_pulse::api::FmpClient;
use index_pulse::broadcast::Broadcaster;
use index_pulse::config::Config;
use index_pulse::db::MarketStore;
use index_pulse::query::QueryService;
use index_pulse::workers::{CycleOutcome, MarketUpdater};

/// Run a single update cycle and print the latest stored state
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "refresh_once=info,index_pulse=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = Arc::new(MarketStore::new(&config.database_url).await?);
    let client = FmpClient::new(&config.fmp_base_url, &config.fmp_api_key, config.http_timeout())?;

    let updater = MarketUpdater::new(
        Arc::new(client),
        Arc::clone(&store),
        Analyzer::new(Arc::clone(&store), config.analysis),
        Broadcaster::new(),
        config.tracked_symbols.clone(),
    );

    if let CycleOutcome::Completed(report) = updater.run_cycle().await {
        info!(
            "Refreshed {} symbols ({} failed)",
            report.updated.len(),
            report.failed.len()
        );
    }

    let query = QueryService::new(Arc::clone(&store), config.tracked_symbols.clone());
    let snapshots = query.all_latest().await?;
    println!("{}", serde_json::to_string_pretty(&snapshots)?);

    info!(
        "Stored totals: {} quotes, {} analyses",
        store.quote_count().await?,
        store.analysis_count().await?
    );
    Ok(())
}
