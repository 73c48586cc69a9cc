use crate::signaling::SignalingOutput;
use axum::extract::ws::Message;
use dashmap::DashMap;
use duet_core::{ConnectionId, ServerMessage};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Live WebSocket writers keyed by connection id.
///
/// Each entry is the unbounded queue feeding one socket's send task, so a
/// delivery never waits on a slow client and frames to the same
/// destination keep their order.
#[derive(Default)]
pub struct ConnectionTable {
    peers: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, connection_id: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.peers.insert(connection_id, tx);
    }

    pub fn remove(&self, connection_id: &ConnectionId) {
        self.peers.remove(connection_id);
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.peers.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl SignalingOutput for ConnectionTable {
    fn deliver(&self, to: &ConnectionId, message: ServerMessage) -> bool {
        let Some(peer) = self.peers.get(to) else {
            debug!("Dropping {} for disconnected {}", message.kind(), to);
            return false;
        };

        match serde_json::to_string(&message) {
            Ok(json) => {
                if let Err(e) = peer.send(Message::Text(json.into())) {
                    debug!("Socket writer for {} already gone: {:?}", to, e);
                    return false;
                }
                true
            }
            Err(e) => {
                error!("Failed to serialize {}: {}", message.kind(), e);
                false
            }
        }
    }
}
