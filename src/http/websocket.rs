//! Live-update WebSocket connections.
//!
//! Each connection registers itself with the change broadcaster and
//! forwards every push event to its client as one JSON text frame. A send
//! failure ends only the failing connection; the broadcaster and the other
//! clients are unaffected.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn live_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| live_connection(state, socket))
}

async fn live_connection(state: AppState, socket: WebSocket) {
    // Subscribe before counting in, so the first poll cannot slip between
    // the connect and the subscription.
    let mut events = state.broadcaster.subscribe();
    state.broadcaster.on_connect();
    metrics::record_live_clients(state.broadcaster.client_count());

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let frame = match serde_json::to_string(&event) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::error!(error = %e, "push event not serializable");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                // Fell behind the fan-out channel; current fingerprints
                // will be re-sent by a later poll, nothing to replay.
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "live client lagged");
                }
                Err(RecvError::Closed) => break,
            },
            inbound = stream.next() => match inbound {
                // Inbound frames carry no meaning; pings are answered by axum.
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }

    state.broadcaster.on_disconnect();
    metrics::record_live_clients(state.broadcaster.client_count());
}
