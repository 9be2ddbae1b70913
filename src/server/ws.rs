//! WebSocket push of market updates.
//!
//! After connecting, a client receives one text frame per update:
//! `{"event":"marketUpdate","data":{"quote":…,"analysis":…}}`.
//! Nothing is replayed for updates published before the connection.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use super::AppState;
use crate::models::MarketUpdate;

pub const MARKET_UPDATE_EVENT: &str = "marketUpdate";

/// Envelope for events pushed over the socket
#[derive(Debug, Serialize)]
pub struct WsEvent<'a> {
    pub event: &'static str,
    pub data: &'a MarketUpdate,
}

impl<'a> WsEvent<'a> {
    pub fn market_update(data: &'a MarketUpdate) -> Self {
        Self {
            event: MARKET_UPDATE_EVENT,
            data,
        }
    }
}

/// WebSocket upgrade handler: `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let mut subscription = state.broadcaster.subscribe();
    let id = subscription.id();
    debug!("WebSocket client {} connected", id);

    // Forward updates to the client; dropping the subscription unregisters it
    let mut send_task = tokio::spawn(async move {
        while let Some(update) = subscription.recv().await {
            match serde_json::to_string(&WsEvent::market_update(&update)) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break; // Client disconnected
                    }
                }
                Err(e) => {
                    warn!("Failed to serialize market update: {}", e);
                }
            }
        }
    });

    // Clients only listen; drain until they close
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    debug!("WebSocket client {} disconnected", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use crate::broadcast::Broadcaster;
    use crate::db::MarketStore;
    use crate::models::{Analysis, Quote, Recommendation};
    use crate::query::QueryService;
    use crate::server::create_app;
    use crate::symbols;

    fn sample_update() -> MarketUpdate {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 15, 30, 0).unwrap();
        MarketUpdate {
            quote: Quote {
                id: Some(7),
                name: "Nasdaq".to_string(),
                symbol: "^IXIC".to_string(),
                current: 440.0,
                open: 436.0,
                high: 441.0,
                low: 435.5,
                percent_change: 1.2,
                observed_at: at,
            },
            analysis: Analysis {
                id: Some(3),
                symbol: "^IXIC".to_string(),
                date: at,
                close_price: 440.0,
                moving_avg5: Some(400.0),
                moving_avg10: None,
                percent_compare: Some(10.0),
                recommendation: Recommendation::Sell,
            },
        }
    }

    async fn wait_for_subscribers(broadcaster: &Broadcaster, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while broadcaster.subscriber_count() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_event_envelope() {
        let update = sample_update();
        let value = serde_json::to_value(WsEvent::market_update(&update)).unwrap();

        assert_eq!(value["event"], "marketUpdate");
        assert_eq!(value["data"]["quote"]["name"], "Nasdaq");
        assert_eq!(value["data"]["analysis"]["closePrice"], 440.0);
        assert_eq!(value["data"]["analysis"]["movingAvg5"], 400.0);
        assert!(value["data"]["analysis"]["movingAvg10"].is_null());
        assert_eq!(value["data"]["analysis"]["recommendation"], "Sell");
    }

    #[tokio::test]
    async fn test_socket_receives_update_and_unregisters_on_close() {
        let store = Arc::new(MarketStore::in_memory().await.unwrap());
        let broadcaster = Broadcaster::new();
        let state = AppState {
            query: Arc::new(QueryService::new(store, symbols::default_tracked())),
            broadcaster: broadcaster.clone(),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_app(state)).await.unwrap();
        });

        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
            .await
            .unwrap();
        wait_for_subscribers(&broadcaster, 1).await;

        assert_eq!(broadcaster.publish(sample_update()), 1);

        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
        assert_eq!(value["event"], "marketUpdate");
        assert_eq!(value["data"]["quote"]["symbol"], "^IXIC");

        socket.close(None).await.unwrap();
        wait_for_subscribers(&broadcaster, 0).await;
    }
}
