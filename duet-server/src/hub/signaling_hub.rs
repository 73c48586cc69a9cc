use crate::directory::{ConnectionDirectory, RoomFull, RoomRegistry};
use crate::hub::{HubCommand, HubStats};
use crate::signaling::Relay;
use duet_core::{ClientMessage, ConnectionId, RoomId, ServerMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Single owner of the connection directory and the room registry.
///
/// Every join, removal and route lookup goes through this task's command
/// queue and runs to completion before the next one starts.
pub struct SignalingHub {
    directory: ConnectionDirectory,
    registry: RoomRegistry,
    relay: Relay,
    command_rx: mpsc::Receiver<HubCommand>,
}

impl SignalingHub {
    pub fn new(
        relay: Relay,
        max_room_members: Option<usize>,
        command_rx: mpsc::Receiver<HubCommand>,
    ) -> Self {
        Self {
            directory: ConnectionDirectory::new(),
            registry: RoomRegistry::with_capacity(max_room_members),
            relay,
            command_rx,
        }
    }

    pub async fn run(mut self) {
        info!("Signaling hub started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd);
        }

        info!("Command channel closed. Signaling hub stopped.");
    }

    fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Signal { from, message } => self.handle_signal(from, message),

            HubCommand::Disconnect { connection_id } => {
                let room = self.registry.remove(&connection_id);
                let identity = self.directory.remove(&connection_id);
                info!(
                    "Connection {} left (room: {:?}, identity: {:?})",
                    connection_id, room, identity
                );
            }

            HubCommand::Stats { reply } => {
                let _ = reply.send(HubStats {
                    identities: self.directory.len(),
                    rooms: self.registry.room_count(),
                });
            }
        }
    }

    fn handle_signal(&mut self, from: ConnectionId, message: ClientMessage) {
        let message = match message.into_envelope(from) {
            Ok(envelope) => {
                let from_identity = self.directory.identity_of(&from).map(str::to_owned);
                self.relay.route(envelope, from_identity);
                return;
            }
            Err(room_scoped) => room_scoped,
        };

        match message {
            ClientMessage::RoomJoin { identity, room } => self.handle_join(from, identity, room),
            ClientMessage::ChatMessage { room, message } => self.handle_chat(from, room, message),
            other => debug!("Unhandled {} from {}", other.kind(), from),
        }
    }

    fn handle_join(&mut self, from: ConnectionId, identity: String, room: RoomId) {
        let joined = match self.registry.join(&room, from) {
            Ok(joined) => joined,
            Err(RoomFull(room)) => {
                warn!("{} ({}) refused: room '{}' is full", from, identity, room);
                self.relay.send(&from, ServerMessage::RoomFull { room });
                return;
            }
        };

        if let Some(displaced) = self.directory.register(from, identity.clone()) {
            info!(
                "Identity '{}' moved from connection {} to {}",
                identity, displaced, from
            );
        }
        if let Some(previous) = &joined.previous_room {
            info!("{} moved from room '{}' to '{}'", from, previous, room);
        }

        info!(
            "{} ({}) joined room '{}' with {} existing member(s)",
            from,
            identity,
            room,
            joined.existing.len()
        );

        self.relay
            .broadcast_join(from, &identity, &joined.existing, joined.newly_joined);
    }

    fn handle_chat(&mut self, from: ConnectionId, room: RoomId, message: String) {
        if self.registry.room_of(&from) != Some(&room) {
            warn!("Dropping chat from {} for room '{}' it has not joined", from, room);
            return;
        }

        let identity = self.directory.identity_of(&from);
        let reached = self.relay.broadcast_chat(
            from,
            identity,
            self.registry.members(&room),
            &message,
        );
        debug!("Chat from {} in '{}' reached {} member(s)", from, room, reached);
    }
}
