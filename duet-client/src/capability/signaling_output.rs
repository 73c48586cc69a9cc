use duet_core::ClientMessage;

/// Outbound half of the signaling channel as seen by a call session.
///
/// `send` never blocks; `false` means the channel is gone and the frame was
/// dropped.
pub trait SignalingOutput: Send + Sync {
    fn send(&self, message: ClientMessage) -> bool;
}
