// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Cache invalidation streaming for console UIs.
//!
//! The bulk coordinator reports stale views through [`CacheInvalidator`].
//! This module turns each key into a [`LiveEvent`] and pushes it to every
//! connected WebSocket client, which then refetches the named query.
//!
//! - Events are advisory; clients still read tickets over HTTP
//! - Nothing sent by a client over the socket is acted on
//! - If no client is connected the event is dropped

use axum::{
    extract::{
        State as AxumState, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{Sink, SinkExt, stream::StreamExt};
use helpdesk::{CacheInvalidator, QueryKey};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::AppState;

/// Maximum number of events to buffer in the broadcast channel.
/// If clients cannot keep up, older events will be dropped.
const EVENT_BUFFER_SIZE: usize = 256;

/// Events pushed to live clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// A cached query is stale and should be refetched.
    Invalidated {
        /// The query key, e.g. `tickets/detail/T-42`.
        key: String,
    },
    /// Connection confirmation (sent on initial connect).
    Connected {
        /// Server timestamp (ISO 8601).
        timestamp: String,
    },
}

/// Fan-out of live events to every subscribed client.
#[derive(Clone)]
pub struct LiveEventBroadcaster {
    tx: broadcast::Sender<LiveEvent>,
}

impl LiveEventBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { tx }
    }

    /// Broadcasts an event to all connected clients without waiting on them.
    pub fn broadcast(&self, event: &LiveEvent) {
        match self.tx.send(event.clone()) {
            Ok(count) => {
                debug!(?event, receivers = count, "Broadcast live event");
            }
            Err(_) => {
                debug!(?event, "No receivers for live event");
            }
        }
    }

    /// Subscribes to events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }
}

impl Default for LiveEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheInvalidator for LiveEventBroadcaster {
    fn invalidate(&self, key: &QueryKey) {
        self.broadcast(&LiveEvent::Invalidated { key: key.as_key() });
    }
}

/// Handler for GET `/api/live`.
///
/// Subscribes before upgrading so no invalidation sent during the handshake
/// is missed.
pub async fn live_events_handler(
    ws: WebSocketUpgrade,
    AxumState(app_state): AxumState<AppState>,
) -> Response {
    let rx: broadcast::Receiver<LiveEvent> = app_state.live.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, rx: broadcast::Receiver<LiveEvent>) {
    info!("Client connected to live event stream");

    let (sender, mut receiver) = socket.split();
    let drain_client = async {
        // Client frames carry nothing; only a close or an error ends the stream.
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    error!(?e, "WebSocket receive error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        () = forward_events(rx, sender) => debug!("Live event stream ended"),
        () = drain_client => debug!("Client closed live event stream"),
    }

    info!("Client disconnected from live event stream");
}

/// Writes a connection confirmation and then every broadcast event to `sink`.
///
/// Returns when the broadcaster is gone or the sink stops accepting
/// messages. A lagging receiver is sent a list invalidation in place of
/// the keys it missed.
async fn forward_events<S>(mut rx: broadcast::Receiver<LiveEvent>, mut sink: S)
where
    S: Sink<Message> + Unpin,
{
    let connected = LiveEvent::Connected {
        timestamp: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Iso8601::DEFAULT)
            .unwrap_or_else(|_| String::from("unknown")),
    };
    if !send_event(&mut sink, &connected).await {
        warn!("Failed to send connection confirmation");
        return;
    }

    loop {
        let event: LiveEvent = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Live client lagged, sending list invalidation");
                LiveEvent::Invalidated {
                    key: QueryKey::TicketList.as_key(),
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if !send_event(&mut sink, &event).await {
            break;
        }
    }
}

/// Returns false once the sink can no longer be written to.
async fn send_event<S>(sink: &mut S, event: &LiveEvent) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(event) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            error!(?e, "Failed to serialize live event");
            true
        }
    }
}
