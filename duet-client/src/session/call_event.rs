use crate::capability::SharedStream;
use crate::session::CallState;
use duet_core::{ConnectionId, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    LocalHangup,
    LocalReject,
    RemoteEnded,
    RemoteRejected,
    NegotiationFailed,
    Timeout,
    /// Abandoned in favor of the peer's simultaneous offer.
    Superseded,
    Shutdown,
}

/// Notifications for whoever drives the user interface.
#[derive(Debug, Clone)]
pub enum CallEvent {
    Connected {
        id: ConnectionId,
    },
    RoomUsers {
        users: Vec<ConnectionId>,
    },
    PeerJoined {
        identity: String,
        id: ConnectionId,
    },
    RoomFull {
        room: RoomId,
    },
    StateChanged {
        from: CallState,
        to: CallState,
    },
    IncomingCall {
        from: ConnectionId,
        from_identity: Option<String>,
    },
    LocalStream(SharedStream),
    RemoteStream(SharedStream),
    Chat {
        from: ConnectionId,
        from_identity: Option<String>,
        message: String,
    },
    Ended {
        reason: EndReason,
    },
}
