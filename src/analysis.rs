use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::db::MarketStore;
use crate::error::{MarketError, Result};
use crate::models::{Analysis, Quote, Recommendation};

/// Window sizes and deviation thresholds for the recommendation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisPolicy {
    /// Quotes in the short moving average (drives the recommendation)
    pub short_window: usize,

    /// Quotes in the long moving average (informational)
    pub long_window: usize,

    /// Deviation above the short average, in percent, that signals Sell
    pub sell_threshold: f64,

    /// Deviation below the short average, in percent, that signals Buy
    pub buy_threshold: f64,
}

impl Default for AnalysisPolicy {
    fn default() -> Self {
        Self {
            short_window: 5,
            long_window: 10,
            sell_threshold: 5.0,
            buy_threshold: -5.0,
        }
    }
}

impl AnalysisPolicy {
    /// Classify a close price against its short moving average.
    ///
    /// Returns the percent deviation and the recommendation. Without a usable
    /// average the deviation is absent and the recommendation is Hold.
    pub fn classify(&self, close_price: f64, short_avg: Option<f64>) -> (Option<f64>, Recommendation) {
        let avg = match short_avg {
            Some(avg) if avg != 0.0 => avg,
            _ => return (None, Recommendation::Hold),
        };

        let percent_compare = (close_price - avg) / avg * 100.0;

        let recommendation = if percent_compare > self.sell_threshold {
            Recommendation::Sell
        } else if percent_compare < self.buy_threshold {
            Recommendation::Buy
        } else {
            Recommendation::Hold
        };

        (Some(percent_compare), recommendation)
    }
}

/// Arithmetic mean of `current` across quotes
pub fn mean_current(quotes: &[Quote]) -> Option<f64> {
    if quotes.is_empty() {
        return None;
    }

    let sum: f64 = quotes.iter().map(|q| q.current).sum();
    Some(sum / quotes.len() as f64)
}

/// Computes moving averages over stored quotes and records recommendations
pub struct Analyzer {
    store: Arc<MarketStore>,
    policy: AnalysisPolicy,
}

impl Analyzer {
    pub fn new(store: Arc<MarketStore>, policy: AnalysisPolicy) -> Self {
        Self { store, policy }
    }

    /// Mean `current` over up to `window` most recent quotes of a symbol
    pub async fn moving_average(&self, symbol: &str, window: usize) -> Result<Option<f64>> {
        let quotes = self.store.recent_quotes(symbol, window).await?;
        Ok(mean_current(&quotes))
    }

    /// Analyze the latest quote of a symbol and persist the result
    pub async fn analyze(&self, symbol: &str) -> Result<Analysis> {
        let latest = self
            .store
            .latest_quote(symbol)
            .await?
            .ok_or_else(|| MarketError::NoData(format!("no stored quote for {}", symbol)))?;

        let short_avg = self.moving_average(symbol, self.policy.short_window).await?;
        let long_avg = self.moving_average(symbol, self.policy.long_window).await?;

        let (percent_compare, recommendation) = self.policy.classify(latest.current, short_avg);

        debug!(
            "{} close {:.2} | avg{} {:?} | avg{} {:?} | {}",
            symbol,
            latest.current,
            self.policy.short_window,
            short_avg,
            self.policy.long_window,
            long_avg,
            recommendation
        );

        let analysis = Analysis {
            id: None,
            symbol: symbol.to_string(),
            date: Utc::now(),
            close_price: latest.current,
            moving_avg5: short_avg,
            moving_avg10: long_avg,
            percent_compare,
            recommendation,
        };

        self.store.save_analysis(&analysis).await
    }
}
