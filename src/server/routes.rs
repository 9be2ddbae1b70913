use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use super::AppState;
use crate::models::MarketSnapshot;

/// Liveness probe: `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Latest data for all tracked indices: `GET /indices`
///
/// Symbols without a stored quote are left out. Read failures are logged
/// and answered with an empty list.
pub async fn list_indices(State(state): State<AppState>) -> Json<Vec<MarketSnapshot>> {
    match state.query.all_latest().await {
        Ok(snapshots) => Json(snapshots),
        Err(e) => {
            error!("Failed to read latest indices: {}", e);
            Json(Vec::new())
        }
    }
}

/// Latest data for one index: `GET /indices/{symbol}`
pub async fn get_index(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Json<MarketSnapshot> {
    match state.query.one_latest(&symbol).await {
        Ok(snapshot) => Json(snapshot),
        Err(e) => {
            error!("Failed to read latest data for {}: {}", symbol, e);
            Json(MarketSnapshot::default())
        }
    }
}
