use thiserror::Error;

/// Errors raised along the fetch / persist / analyze pipeline
#[derive(Debug, Error)]
pub enum MarketError {
    /// Upstream unreachable, non-success status or malformed body
    #[error("network error: {0}")]
    Network(String),

    /// Upstream returned no usable record, or nothing stored to analyze
    #[error("no data: {0}")]
    NoData(String),

    /// Persistence read or write failure
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MarketError>;
