use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use tracing::info;

use crate::error::{MarketError, Result};
use crate::models::{Analysis, Quote, Recommendation};

/// SQLite store for quotes and analyses
pub struct MarketStore {
    pool: Pool<Sqlite>,
}

impl MarketStore {
    /// Create a new market store and initialize the database
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Create data directory if needed
        if let Some(path) = database_url.strip_prefix("sqlite:") {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .context("Failed to create database directory")?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.init_schema().await?;

        info!("Market store initialized");
        Ok(store)
    }

    /// Private in-memory database, kept alive on a single pooled connection
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quotes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                symbol TEXT NOT NULL,
                current REAL NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                percent_change REAL NOT NULL,
                observed_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create quotes table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                close_price REAL NOT NULL,
                moving_avg5 REAL,
                moving_avg10 REAL,
                percent_compare REAL,
                recommendation TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create analyses table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_quotes_symbol_observed
            ON quotes (symbol, observed_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_analyses_symbol_date
            ON analyses (symbol, date)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append a quote, returning it as stored
    pub async fn save_quote(&self, quote: &Quote) -> Result<Quote> {
        let observed_at = quote.observed_at.trunc_subsecs(6);

        let result = sqlx::query(
            r#"
            INSERT INTO quotes (
                name,
                symbol,
                current,
                open,
                high,
                low,
                percent_change,
                observed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&quote.name)
        .bind(&quote.symbol)
        .bind(quote.current)
        .bind(quote.open)
        .bind(quote.high)
        .bind(quote.low)
        .bind(quote.percent_change)
        .bind(encode_timestamp(&observed_at))
        .execute(&self.pool)
        .await?;

        Ok(Quote {
            id: Some(result.last_insert_rowid()),
            observed_at,
            ..quote.clone()
        })
    }

    /// Most recent quote for a symbol
    pub async fn latest_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let mut quotes = self.recent_quotes(symbol, 1).await?;
        Ok(quotes.pop())
    }

    /// Up to `limit` quotes for a symbol, most recent first
    pub async fn recent_quotes(&self, symbol: &str, limit: usize) -> Result<Vec<Quote>> {
        let rows = sqlx::query_as::<_, QuoteRow>(
            r#"
            SELECT * FROM quotes
            WHERE symbol = ?
            ORDER BY observed_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(symbol)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Quote::try_from).collect()
    }

    /// Append an analysis, returning it as stored
    pub async fn save_analysis(&self, analysis: &Analysis) -> Result<Analysis> {
        let date = analysis.date.trunc_subsecs(6);

        let result = sqlx::query(
            r#"
            INSERT INTO analyses (
                symbol,
                date,
                close_price,
                moving_avg5,
                moving_avg10,
                percent_compare,
                recommendation
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&analysis.symbol)
        .bind(encode_timestamp(&date))
        .bind(analysis.close_price)
        .bind(analysis.moving_avg5)
        .bind(analysis.moving_avg10)
        .bind(analysis.percent_compare)
        .bind(analysis.recommendation.as_str())
        .execute(&self.pool)
        .await?;

        Ok(Analysis {
            id: Some(result.last_insert_rowid()),
            date,
            ..analysis.clone()
        })
    }

    /// Most recent analysis for a symbol
    pub async fn latest_analysis(&self, symbol: &str) -> Result<Option<Analysis>> {
        let row = sqlx::query_as::<_, AnalysisRow>(
            r#"
            SELECT * FROM analyses
            WHERE symbol = ?
            ORDER BY date DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Analysis::try_from).transpose()
    }

    /// Get count of stored quotes
    pub async fn quote_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM quotes")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }

    /// Get count of stored analyses
    pub async fn analysis_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM analyses")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }
}

/// Fixed-width UTC form so that text ordering matches time ordering
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MarketError::Storage(sqlx::Error::Decode(Box::new(e))))
}

/// Database row representation
#[derive(sqlx::FromRow)]
struct QuoteRow {
    id: i64,
    name: String,
    symbol: String,
    current: f64,
    open: f64,
    high: f64,
    low: f64,
    percent_change: f64,
    observed_at: String,
}

impl TryFrom<QuoteRow> for Quote {
    type Error = MarketError;

    fn try_from(row: QuoteRow) -> Result<Self> {
        Ok(Quote {
            id: Some(row.id),
            name: row.name,
            symbol: row.symbol,
            current: row.current,
            open: row.open,
            high: row.high,
            low: row.low,
            percent_change: row.percent_change,
            observed_at: decode_timestamp(&row.observed_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AnalysisRow {
    id: i64,
    symbol: String,
    date: String,
    close_price: f64,
    moving_avg5: Option<f64>,
    moving_avg10: Option<f64>,
    percent_compare: Option<f64>,
    recommendation: String,
}

impl TryFrom<AnalysisRow> for Analysis {
    type Error = MarketError;

    fn try_from(row: AnalysisRow) -> Result<Self> {
        Ok(Analysis {
            id: Some(row.id),
            symbol: row.symbol,
            date: decode_timestamp(&row.date)?,
            close_price: row.close_price,
            moving_avg5: row.moving_avg5,
            moving_avg10: row.moving_avg10,
            percent_compare: row.percent_compare,
            recommendation: parse_recommendation(&row.recommendation),
        })
    }
}

fn parse_recommendation(s: &str) -> Recommendation {
    match s {
        "Buy" => Recommendation::Buy,
        "Sell" => Recommendation::Sell,
        _ => Recommendation::Hold,
    }
}
