pub mod fmp;

pub use fmp::FmpClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Quote;

/// Anything that can produce a fresh quote for a canonical symbol
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote>;
}
