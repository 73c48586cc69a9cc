use crate::config::ServerConfig;
use crate::hub::{HubCommand, HubStats, SignalingHub};
use crate::signaling::{ConnectionTable, Relay, SignalingOutput};
use axum::extract::ws::Message;
use duet_core::{ClientMessage, ConnectionId, IceServerConfig, ServerMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::error;

struct SignalingInner {
    connections: Arc<ConnectionTable>,
    ice_servers: Vec<IceServerConfig>,
}

/// Shared handle the WebSocket handlers use to reach the hub and the live
/// connection table. Cheap to clone.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    hub_tx: mpsc::Sender<HubCommand>,
}

impl SignalingService {
    /// Builds the service and the hub it talks to. The hub must be driven
    /// with [`SignalingHub::run`].
    pub fn new(config: &ServerConfig) -> (Self, SignalingHub) {
        let connections = Arc::new(ConnectionTable::new());
        let (hub_tx, hub_rx) = mpsc::channel(config.command_buffer);

        let relay = Relay::new(connections.clone() as Arc<dyn SignalingOutput>);
        let hub = SignalingHub::new(relay, config.max_room_members, hub_rx);

        let service = Self {
            inner: Arc::new(SignalingInner {
                connections,
                ice_servers: config.ice_servers.clone(),
            }),
            hub_tx,
        };

        (service, hub)
    }

    /// Builds the service and spawns its hub on the current runtime.
    pub fn spawn(config: &ServerConfig) -> Self {
        let (service, hub) = Self::new(config);
        tokio::spawn(hub.run());
        service
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn add_peer(&self, connection_id: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.connections.add(connection_id, tx);
    }

    pub fn remove_peer(&self, connection_id: &ConnectionId) {
        self.inner.connections.remove(connection_id);
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    pub fn send_signal(&self, to: &ConnectionId, message: ServerMessage) -> bool {
        self.inner.connections.deliver(to, message)
    }

    /// Queues a frame read from `from`'s socket. Fails only when the hub
    /// has stopped.
    pub async fn dispatch(
        &self,
        from: ConnectionId,
        message: ClientMessage,
    ) -> Result<(), mpsc::error::SendError<HubCommand>> {
        self.hub_tx.send(HubCommand::Signal { from, message }).await
    }

    pub async fn disconnect(&self, connection_id: ConnectionId) {
        if let Err(e) = self
            .hub_tx
            .send(HubCommand::Disconnect { connection_id })
            .await
        {
            error!("Hub gone while removing {}: {}", connection_id, e);
        }
    }

    pub async fn stats(&self) -> Option<HubStats> {
        let (reply, rx) = oneshot::channel();
        self.hub_tx.send(HubCommand::Stats { reply }).await.ok()?;
        rx.await.ok()
    }
}
