use duet_core::{ConnectionId, ServerMessage};

/// Outbound side of the relay: hands a frame to one live connection.
///
/// Implementations must not wait on the recipient. Returns `false` when the
/// destination is gone and the frame was dropped.
pub trait SignalingOutput: Send + Sync {
    fn deliver(&self, to: &ConnectionId, message: ServerMessage) -> bool;
}
