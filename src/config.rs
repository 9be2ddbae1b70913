use std::env;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::analysis::AnalysisPolicy;
use crate::symbols;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Financial Modeling Prep API key
    pub fmp_api_key: String,

    /// Financial Modeling Prep base URL
    pub fmp_base_url: String,

    /// SQLite database path
    pub database_url: String,

    /// Interval in seconds between update cycles
    pub fetch_interval: u64,

    /// Timeout in seconds for upstream HTTP requests
    pub http_timeout: u64,

    /// Canonical symbols updated every cycle
    pub tracked_symbols: Vec<String>,

    /// Moving-average windows and recommendation thresholds
    pub analysis: AnalysisPolicy,

    /// Address the HTTP server binds to
    pub server_host: String,

    /// Port the HTTP server listens on
    pub server_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = AnalysisPolicy::default();

        let config = Config {
            fmp_api_key: env::var("FMP_API_KEY").context("FMP_API_KEY must be set")?,

            fmp_base_url: env::var("FMP_BASE_URL")
                .unwrap_or_else(|_| "https://financialmodelingprep.com".to_string()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/market.db".to_string()),

            fetch_interval: parse_var("FETCH_INTERVAL", 300)?,

            http_timeout: parse_var("HTTP_TIMEOUT", 10)?,

            tracked_symbols: env::var("TRACKED_SYMBOLS")
                .map(|s| parse_symbol_list(&s))
                .unwrap_or_else(|_| symbols::default_tracked()),

            analysis: AnalysisPolicy {
                short_window: parse_var("SHORT_WINDOW", defaults.short_window)?,
                long_window: parse_var("LONG_WINDOW", defaults.long_window)?,
                sell_threshold: parse_var("SELL_THRESHOLD", defaults.sell_threshold)?,
                buy_threshold: parse_var("BUY_THRESHOLD", defaults.buy_threshold)?,
            },

            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            server_port: parse_var("SERVER_PORT", 3000)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.fetch_interval > 0, "FETCH_INTERVAL must be positive");
        ensure!(self.http_timeout > 0, "HTTP_TIMEOUT must be positive");
        ensure!(!self.tracked_symbols.is_empty(), "TRACKED_SYMBOLS must not be empty");
        ensure!(
            self.analysis.short_window > 0 && self.analysis.long_window > 0,
            "SHORT_WINDOW and LONG_WINDOW must be positive"
        );
        ensure!(
            self.analysis.buy_threshold <= self.analysis.sell_threshold,
            "BUY_THRESHOLD must not exceed SELL_THRESHOLD"
        );
        Ok(())
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    /// Get bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .ok()
            .with_context(|| format!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated symbol list, dropping blanks
fn parse_symbol_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
