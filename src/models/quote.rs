use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time quote for a tracked index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Storage identity (None until persisted)
    pub id: Option<i64>,

    /// Display name (e.g., "Dow Jones")
    pub name: String,

    /// Canonical index symbol (e.g., "^DJI")
    pub symbol: String,

    /// Last traded price
    pub current: f64,

    /// Session open
    pub open: f64,

    /// Session high
    pub high: f64,

    /// Session low
    pub low: f64,

    /// Change since previous close, in percent
    pub percent_change: f64,

    /// When the quote was fetched
    pub observed_at: DateTime<Utc>,
}
