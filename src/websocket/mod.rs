//! WebSocket Module
//!
//! Streams registry events to connected clients, one JSON text frame per
//! event. Clients only listen; anything they send besides close is ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::api::AppState;
use crate::models::station_event::StationEvent;

/// Upgrade to a WebSocket that receives every station event
pub async fn events_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let events = state.registry.subscribe();
    ws.on_upgrade(move |socket| {
        let connection_id = new_connection_id();
        let span = crate::websocket_span!(connection_id);
        stream_events(socket, events).instrument(span)
    })
}

async fn stream_events(
    socket: WebSocket,
    mut events: tokio::sync::broadcast::Receiver<StationEvent>,
) {
    info!("WebSocket subscriber connected");
    let (mut sender, mut receiver) = socket.split();
    let mut sent: u64 = 0;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Some(text) = encode(&event) else { continue };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                    sent += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "WebSocket subscriber lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(other)) => debug!(?other, "ignoring client message"),
            },
        }
    }

    tracing::Span::current().record("events_sent", sent);
    info!("WebSocket subscriber disconnected");
}

fn new_connection_id() -> Uuid {
    Uuid::new_v4()
}

/// Serialize an event for the wire
pub fn encode(event: &StationEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("Could not encode event: {}", e);
            None
        }
    }
}
