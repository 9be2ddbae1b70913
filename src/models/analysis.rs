use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moving-average analysis derived from the most recent quote of a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Storage identity (None until persisted)
    pub id: Option<i64>,

    /// Canonical index symbol
    pub symbol: String,

    /// When the analysis was computed
    pub date: DateTime<Utc>,

    /// `current` of the quote that triggered this analysis
    pub close_price: f64,

    /// Short-window moving average (5 quotes by default)
    pub moving_avg5: Option<f64>,

    /// Long-window moving average (10 quotes by default)
    pub moving_avg10: Option<f64>,

    /// Deviation of close price from the short average, in percent
    pub percent_compare: Option<f64>,

    pub recommendation: Recommendation,
}

/// Trading recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "Buy",
            Recommendation::Sell => "Sell",
            Recommendation::Hold => "Hold",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
