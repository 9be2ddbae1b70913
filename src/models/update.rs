use serde::{Deserialize, Serialize};

use super::{Analysis, Quote};

/// Freshly written quote and analysis pair, pushed to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketUpdate {
    pub quote: Quote,
    pub analysis: Analysis,
}

/// Latest stored state of one symbol; either side may not exist yet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub quote: Option<Quote>,
    pub analysis: Option<Analysis>,
}
