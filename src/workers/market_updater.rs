use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::analysis::Analyzer;
use crate::api::QuoteSource;
use crate::broadcast::Broadcaster;
use crate::db::MarketStore;
use crate::error::Result;
use crate::models::MarketUpdate;

/// Result of one pass over the tracked symbols
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Symbols fetched, stored, analyzed and broadcast
    pub updated: Vec<String>,

    /// Symbols whose pipeline failed at some step
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// A previous cycle was still running
    Skipped,
}

/// Runs the fetch, persist, analyze and broadcast pipeline for each tracked symbol
pub struct MarketUpdater {
    source: Arc<dyn QuoteSource>,
    store: Arc<MarketStore>,
    analyzer: Analyzer,
    broadcaster: Broadcaster,
    symbols: Vec<String>,
    running: AtomicBool,
}

/// Clears the running flag even if the cycle unwinds
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MarketUpdater {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        store: Arc<MarketStore>,
        analyzer: Analyzer,
        broadcaster: Broadcaster,
        symbols: Vec<String>,
    ) -> Self {
        Self {
            source,
            store,
            analyzer,
            broadcaster,
            symbols,
            running: AtomicBool::new(false),
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Whether a cycle is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one cycle over all tracked symbols, sequentially.
    ///
    /// A failure on one symbol is logged and the cycle moves on. If another
    /// cycle is already running this call does nothing.
    pub async fn run_cycle(&self) -> CycleOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Previous update cycle still running, skipping tick");
            return CycleOutcome::Skipped;
        }
        let _guard = RunningGuard(&self.running);

        info!("Starting update cycle for {} symbols", self.symbols.len());
        let mut report = CycleReport::default();

        for symbol in &self.symbols {
            match self.update_symbol(symbol).await {
                Ok(update) => {
                    let receivers = self.broadcaster.publish(update);
                    info!(
                        "Updated data & analysis for {} (sent to {} subscribers)",
                        symbol, receivers
                    );
                    report.updated.push(symbol.clone());
                }
                Err(e) => {
                    error!("Failed to update data for {}: {}", symbol, e);
                    report.failed.push(symbol.clone());
                }
            }
        }

        info!(
            "Update cycle complete: {} updated, {} failed",
            report.updated.len(),
            report.failed.len()
        );
        CycleOutcome::Completed(report)
    }

    async fn update_symbol(&self, symbol: &str) -> Result<MarketUpdate> {
        let quote = self.source.fetch_quote(symbol).await?;
        let quote = self.store.save_quote(&quote).await?;
        let analysis = self.analyzer.analyze(symbol).await?;

        Ok(MarketUpdate { quote, analysis })
    }
}
