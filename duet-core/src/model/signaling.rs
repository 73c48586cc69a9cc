use crate::model::connection::ConnectionId;
use crate::model::negotiation::{IceCandidate, SessionDescription};
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Frames a client sends to the signaling server.
///
/// Peer-addressed variants carry only the destination; the server fills in
/// the sender itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    RoomJoin {
        identity: String,
        room: RoomId,
    },
    CallOffer {
        to: ConnectionId,
        offer: SessionDescription,
    },
    CallAnswer {
        to: ConnectionId,
        answer: SessionDescription,
    },
    CallRejected {
        to: ConnectionId,
    },
    CallEnded {
        to: ConnectionId,
    },
    IceCandidate {
        to: ConnectionId,
        candidate: IceCandidate,
    },
    ChatMessage {
        room: RoomId,
        message: String,
    },
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::RoomJoin { .. } => "room-join",
            ClientMessage::CallOffer { .. } => "call-offer",
            ClientMessage::CallAnswer { .. } => "call-answer",
            ClientMessage::CallRejected { .. } => "call-rejected",
            ClientMessage::CallEnded { .. } => "call-ended",
            ClientMessage::IceCandidate { .. } => "ice-candidate",
            ClientMessage::ChatMessage { .. } => "chat-message",
        }
    }

    /// Turns a peer-addressed message into a relay envelope stamped with the
    /// sender's connection id. Room-scoped messages are handed back unchanged.
    pub fn into_envelope(self, from: ConnectionId) -> Result<SignalEnvelope, ClientMessage> {
        let (to, payload) = match self {
            ClientMessage::CallOffer { to, offer } => (to, SignalPayload::CallOffer { offer }),
            ClientMessage::CallAnswer { to, answer } => (to, SignalPayload::CallAnswer { answer }),
            ClientMessage::CallRejected { to } => (to, SignalPayload::CallRejected),
            ClientMessage::CallEnded { to } => (to, SignalPayload::CallEnded),
            ClientMessage::IceCandidate { to, candidate } => {
                (to, SignalPayload::IceCandidate { candidate })
            }
            other => return Err(other),
        };
        Ok(SignalEnvelope { from, to, payload })
    }
}

/// Frames the signaling server sends to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    Welcome {
        id: ConnectionId,
        ice_servers: Vec<IceServerConfig>,
    },
    RoomUsers {
        users: Vec<ConnectionId>,
    },
    RoomJoined {
        identity: String,
        id: ConnectionId,
    },
    RoomFull {
        room: RoomId,
    },
    CallOffer {
        from: ConnectionId,
        #[serde(default)]
        from_identity: Option<String>,
        offer: SessionDescription,
    },
    CallAnswer {
        from: ConnectionId,
        answer: SessionDescription,
    },
    CallRejected {
        from: ConnectionId,
    },
    CallEnded {
        from: ConnectionId,
    },
    IceCandidate {
        from: ConnectionId,
        candidate: IceCandidate,
    },
    ChatMessage {
        from: ConnectionId,
        #[serde(default)]
        from_identity: Option<String>,
        message: String,
    },
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Welcome { .. } => "welcome",
            ServerMessage::RoomUsers { .. } => "room-users",
            ServerMessage::RoomJoined { .. } => "room-joined",
            ServerMessage::RoomFull { .. } => "room-full",
            ServerMessage::CallOffer { .. } => "call-offer",
            ServerMessage::CallAnswer { .. } => "call-answer",
            ServerMessage::CallRejected { .. } => "call-rejected",
            ServerMessage::CallEnded { .. } => "call-ended",
            ServerMessage::IceCandidate { .. } => "ice-candidate",
            ServerMessage::ChatMessage { .. } => "chat-message",
        }
    }

    /// The delivered form of a relayed envelope. Only offers carry the
    /// sender's identity.
    pub fn from_envelope(envelope: SignalEnvelope, from_identity: Option<String>) -> Self {
        let from = envelope.from;
        match envelope.payload {
            SignalPayload::CallOffer { offer } => ServerMessage::CallOffer {
                from,
                from_identity,
                offer,
            },
            SignalPayload::CallAnswer { answer } => ServerMessage::CallAnswer { from, answer },
            SignalPayload::CallRejected => ServerMessage::CallRejected { from },
            SignalPayload::CallEnded => ServerMessage::CallEnded { from },
            SignalPayload::IceCandidate { candidate } => {
                ServerMessage::IceCandidate { from, candidate }
            }
        }
    }
}

/// A peer-to-peer signal in transit through the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEnvelope {
    pub from: ConnectionId,
    pub to: ConnectionId,
    pub payload: SignalPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalPayload {
    CallOffer { offer: SessionDescription },
    CallAnswer { answer: SessionDescription },
    CallRejected,
    CallEnded,
    IceCandidate { candidate: IceCandidate },
}

impl SignalEnvelope {
    pub fn kind(&self) -> &'static str {
        match self.payload {
            SignalPayload::CallOffer { .. } => "call-offer",
            SignalPayload::CallAnswer { .. } => "call-answer",
            SignalPayload::CallRejected => "call-rejected",
            SignalPayload::CallEnded => "call-ended",
            SignalPayload::IceCandidate { .. } => "ice-candidate",
        }
    }
}
