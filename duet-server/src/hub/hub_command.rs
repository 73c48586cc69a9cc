use duet_core::{ClientMessage, ConnectionId};
use serde::Serialize;
use tokio::sync::oneshot;

/// Commands the WebSocket layer feeds into the hub.
#[derive(Debug)]
pub enum HubCommand {
    /// A frame read from `from`'s socket.
    Signal {
        from: ConnectionId,
        message: ClientMessage,
    },

    /// The socket closed; forget everything about the connection.
    Disconnect { connection_id: ConnectionId },

    /// Report directory/registry sizes.
    Stats { reply: oneshot::Sender<HubStats> },
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct HubStats {
    pub identities: usize,
    pub rooms: usize,
}
