use crate::signaling::SignalingOutput;
use duet_core::{ConnectionId, ServerMessage, SignalEnvelope};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Dropped,
}

impl From<bool> for Delivery {
    fn from(delivered: bool) -> Self {
        if delivered {
            Delivery::Delivered
        } else {
            Delivery::Dropped
        }
    }
}

/// Stateless router between connections.
///
/// Delivery is best effort and at most once: a frame for a connection that
/// is gone is dropped and the sender is never told.
#[derive(Clone)]
pub struct Relay {
    output: Arc<dyn SignalingOutput>,
}

impl Relay {
    pub fn new(output: Arc<dyn SignalingOutput>) -> Self {
        Self { output }
    }

    /// Forwards a peer-addressed envelope. `envelope.from` must already be
    /// the sender's authenticated connection id.
    pub fn route(&self, envelope: SignalEnvelope, from_identity: Option<String>) -> Delivery {
        let to = envelope.to;
        let kind = envelope.kind();
        let delivery = self.send(&to, ServerMessage::from_envelope(envelope, from_identity));

        if delivery == Delivery::Dropped {
            debug!("Relay dropped {} addressed to {}", kind, to);
        }
        delivery
    }

    pub fn send(&self, to: &ConnectionId, message: ServerMessage) -> Delivery {
        self.output.deliver(to, message).into()
    }

    /// Announces `joiner` to the members already in the room and hands the
    /// joiner a snapshot of those members.
    pub fn broadcast_join(
        &self,
        joiner: ConnectionId,
        identity: &str,
        existing: &[ConnectionId],
        announce: bool,
    ) {
        if announce {
            for member in existing {
                self.send(
                    member,
                    ServerMessage::RoomJoined {
                        identity: identity.to_owned(),
                        id: joiner,
                    },
                );
            }
        }

        self.send(
            &joiner,
            ServerMessage::RoomUsers {
                users: existing.to_vec(),
            },
        );
    }

    /// Fans a chat line out to `recipients`. Returns how many were reached.
    pub fn broadcast_chat(
        &self,
        from: ConnectionId,
        from_identity: Option<&str>,
        recipients: &[ConnectionId],
        message: &str,
    ) -> usize {
        recipients
            .iter()
            .filter(|member| **member != from)
            .map(|member| {
                self.send(
                    member,
                    ServerMessage::ChatMessage {
                        from,
                        from_identity: from_identity.map(str::to_owned),
                        message: message.to_owned(),
                    },
                )
            })
            .filter(|delivery| *delivery == Delivery::Delivered)
            .count()
    }
}
