use std::sync::Arc;

use crate::db::MarketStore;
use crate::error::Result;
use crate::models::MarketSnapshot;

/// Read-only lookups of the latest stored quote and analysis
pub struct QueryService {
    store: Arc<MarketStore>,
    symbols: Vec<String>,
}

impl QueryService {
    pub fn new(store: Arc<MarketStore>, symbols: Vec<String>) -> Self {
        Self { store, symbols }
    }

    /// Latest quote and analysis for one symbol; either may be absent
    pub async fn one_latest(&self, symbol: &str) -> Result<MarketSnapshot> {
        let quote = self.store.latest_quote(symbol).await?;
        let analysis = self.store.latest_analysis(symbol).await?;

        Ok(MarketSnapshot { quote, analysis })
    }

    /// Latest state of every tracked symbol that has at least one quote
    pub async fn all_latest(&self) -> Result<Vec<MarketSnapshot>> {
        let mut result = Vec::with_capacity(self.symbols.len());

        for symbol in &self.symbols {
            let snapshot = self.one_latest(symbol).await?;
            if snapshot.quote.is_some() {
                result.push(snapshot);
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisPolicy, Analyzer};
    use crate::db::market::tests::seed_quotes;
    use crate::symbols;

    async fn service() -> (QueryService, Arc<MarketStore>) {
        let store = Arc::new(MarketStore::in_memory().await.unwrap());
        let service = QueryService::new(Arc::clone(&store), symbols::default_tracked());
        (service, store)
    }

    #[tokio::test]
    async fn test_empty_store() {
        let (service, _) = service().await;

        assert!(service.all_latest().await.unwrap().is_empty());
        assert_eq!(service.one_latest("^DJI").await.unwrap(), MarketSnapshot::default());
    }

    #[tokio::test]
    async fn test_all_latest_skips_symbols_without_quotes() {
        let (service, store) = service().await;
        seed_quotes(&store, "^DJI", &[101.0, 100.0]).await;
        seed_quotes(&store, "^IXIC", &[50.0]).await;

        let analyzer = Analyzer::new(Arc::clone(&store), AnalysisPolicy::default());
        analyzer.analyze("^DJI").await.unwrap();

        let all = service.all_latest().await.unwrap();
        let listed: Vec<&str> = all
            .iter()
            .map(|s| s.quote.as_ref().unwrap().symbol.as_str())
            .collect();
        assert_eq!(listed, vec!["^DJI", "^IXIC"]);

        assert_eq!(all[0].quote.as_ref().unwrap().current, 101.0);
        assert!(all[0].analysis.is_some());
        assert!(all[1].analysis.is_none());

        for snapshot in &all {
            let symbol = &snapshot.quote.as_ref().unwrap().symbol;
            assert_eq!(&service.one_latest(symbol).await.unwrap(), snapshot);
        }
    }

    #[tokio::test]
    async fn test_untracked_symbol_lookup() {
        let (service, store) = service().await;
        seed_quotes(&store, "AAPL", &[190.0]).await;

        // Not tracked, so not listed, but still readable by name
        assert!(service.all_latest().await.unwrap().is_empty());
        assert!(service.one_latest("AAPL").await.unwrap().quote.is_some());
    }
}
