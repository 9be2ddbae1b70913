//! HTTP and WebSocket surface.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness
//! - `GET /indices` - Latest quote and analysis for every tracked index
//! - `GET /indices/{symbol}` - Latest quote and analysis for one index
//! - `GET /ws` - WebSocket stream of `marketUpdate` events

pub mod routes;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::broadcast::Broadcaster;
use crate::query::QueryService;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub query: Arc<QueryService>,
    pub broadcaster: Broadcaster,
}

/// Create the router with all routes
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(routes::health))
        .route("/indices", get(routes::list_indices))
        .route("/indices/{symbol}", get(routes::get_index))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
