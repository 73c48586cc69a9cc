mod connection;
mod negotiation;
mod room;
mod signaling;

pub use connection::{ConnectionId, ParseConnectionIdError};
pub use negotiation::{IceCandidate, SdpType, SessionDescription};
pub use room::RoomId;
pub use signaling::{ClientMessage, IceServerConfig, ServerMessage, SignalEnvelope, SignalPayload};
