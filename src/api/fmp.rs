use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::QuoteSource;
use crate::error::{MarketError, Result};
use crate::models::Quote;
use crate::symbols;

/// Client for the Financial Modeling Prep quote API
pub struct FmpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Quote element from FMP (`/api/v3/quote/{symbol}` returns an array)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpQuote {
    price: f64,
    open: f64,
    day_high: f64,
    day_low: f64,
    changes_percentage: f64,
}

impl FmpClient {
    /// Create a new FMP client
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Fetch the current quote for a canonical index symbol
    pub async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        let info = symbols::resolve(symbol);
        let url = format!(
            "{}/api/v3/quote/{}",
            self.base_url,
            urlencoding::encode(&info.vendor_symbol)
        );
        debug!("Fetching {} quote from: {}", symbol, url);

        let response = self
            .client
            .get(&url)
            .query(&[("apikey", &self.api_key)])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| MarketError::Network(format!("request for {} failed: {}", symbol, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!("FMP API error: {} - {}", status, text);
            return Err(MarketError::Network(format!(
                "FMP API returned {} for {}",
                status, symbol
            )));
        }

        let quotes: Vec<FmpQuote> = response.json().await.map_err(|e| {
            MarketError::Network(format!("malformed quote response for {}: {}", symbol, e))
        })?;

        let data = quotes
            .into_iter()
            .next()
            .ok_or_else(|| MarketError::NoData(format!("no data found for {}", symbol)))?;

        Ok(Quote {
            id: None,
            name: info.name_or(symbol).to_string(),
            symbol: symbol.to_string(),
            current: data.price,
            open: data.open,
            high: data.day_high,
            low: data.day_low,
            percent_change: data.changes_percentage,
            // FMP has no reliable quote timestamp
            observed_at: Utc::now(),
        })
    }
}

#[async_trait]
impl QuoteSource for FmpClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        FmpClient::fetch_quote(self, symbol).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> FmpClient {
        FmpClient::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_quote_maps_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/quote/DIA"))
            .and(query_param("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "symbol": "DIA",
                "price": 391.25,
                "open": 389.0,
                "dayHigh": 392.1,
                "dayLow": 388.4,
                "changesPercentage": 0.57
            }])))
            .mount(&server)
            .await;

        let quote = client(&server).fetch_quote("^DJI").await.unwrap();

        assert_eq!(quote.id, None);
        assert_eq!(quote.name, "Dow Jones");
        assert_eq!(quote.symbol, "^DJI");
        assert_eq!(quote.current, 391.25);
        assert_eq!(quote.open, 389.0);
        assert_eq!(quote.high, 392.1);
        assert_eq!(quote.low, 388.4);
        assert_eq!(quote.percent_change, 0.57);
    }

    #[tokio::test]
    async fn test_empty_array_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/quote/SPY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = client(&server).fetch_quote("^GSPC").await.unwrap_err();
        assert!(matches!(err, MarketError::NoData(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/quote/QQQ"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).fetch_quote("^IXIC").await.unwrap_err();
        assert!(matches!(err, MarketError::Network(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/quote/QQQ"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "Error Message": "Invalid API KEY." })),
            )
            .mount(&server)
            .await;

        let err = client(&server).fetch_quote("^IXIC").await.unwrap_err();
        assert!(matches!(err, MarketError::Network(_)));
    }

    #[tokio::test]
    async fn test_unknown_symbol_uses_itself() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/quote/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "price": 190.0,
                "open": 188.0,
                "dayHigh": 191.0,
                "dayLow": 187.5,
                "changesPercentage": -0.2
            }])))
            .mount(&server)
            .await;

        let quote = client(&server).fetch_quote("AAPL").await.unwrap();
        assert_eq!(quote.name, "AAPL");
        assert_eq!(quote.symbol, "AAPL");
    }

    #[tokio::test]
    async fn test_symbol_is_encoded_as_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/quote/X"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "price": 1.0,
                "open": 1.0,
                "dayHigh": 1.0,
                "dayLow": 1.0,
                "changesPercentage": 0.0
            }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/quote/X%23Y"))
            .and(query_param("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        // "X#Y" must not be truncated to "X" and answered with X's quote
        let err = client(&server).fetch_quote("X#Y").await.unwrap_err();
        assert!(matches!(err, MarketError::NoData(_)));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.path(), "/api/v3/quote/X%23Y");
    }
}
