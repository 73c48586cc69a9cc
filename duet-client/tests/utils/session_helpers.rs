use crate::utils::{MemoryRelay, MockMediaDevices, MockNegotiationFactory};
use duet_client::capability::SignalingOutput;
use duet_client::{CallEvent, CallSession, CallSessionHandle, CallState, SessionConfig, SessionSnapshot};
use duet_core::{ClientMessage, ConnectionId, ServerMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const WAIT: Duration = Duration::from_secs(3);

/// A running session plus the mocks it was built with.
pub struct TestClient {
    pub id: ConnectionId,
    pub handle: CallSessionHandle,
    pub events: mpsc::UnboundedReceiver<CallEvent>,
    pub media: MockMediaDevices,
    pub factory: MockNegotiationFactory,
}

impl TestClient {
    pub async fn wait_for<F>(&self, predicate: F) -> SessionSnapshot
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        self.handle
            .wait_for(WAIT, predicate)
            .await
            .expect("session never reached the expected snapshot")
    }

    pub async fn wait_state(&self, state: CallState) -> SessionSnapshot {
        self.wait_for(|s| s.state == state).await
    }

    /// Skips events until one matches.
    pub async fn expect_event<F>(&mut self, mut matches: F) -> CallEvent
    where
        F: FnMut(&CallEvent) -> bool,
    {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let event = tokio::time::timeout_at(deadline, self.events.recv())
                .await
                .expect("expected event never arrived")
                .expect("event stream closed");
            if matches(&event) {
                return event;
            }
        }
    }
}

pub async fn spawn_client(relay: &MemoryRelay, config: SessionConfig) -> TestClient {
    spawn_client_with(relay, config, MockMediaDevices::new()).await
}

pub async fn spawn_client_with(
    relay: &MemoryRelay,
    config: SessionConfig,
    media: MockMediaDevices,
) -> TestClient {
    let (id, port, inbound) = relay.attach();
    let factory = MockNegotiationFactory::new();
    let (handle, events) = CallSession::spawn(
        config,
        port,
        inbound,
        Arc::new(media.clone()),
        Arc::new(factory.clone()),
    );

    let client = TestClient {
        id,
        handle,
        events,
        media,
        factory,
    };
    client.wait_for(|s| s.local_id == Some(id)).await;
    client
}

/// Two clients in room "R", identities a@x.com and b@x.com, with each
/// other as default target.
pub async fn paired_clients(relay: &MemoryRelay, config: SessionConfig) -> (TestClient, TestClient) {
    let c1 = spawn_client(relay, config.clone()).await;
    let c2 = spawn_client(relay, config).await;

    c1.handle.join_room("a@x.com", "R").await.unwrap();
    c1.wait_for(|s| s.room.is_some()).await;
    c2.handle.join_room("b@x.com", "R").await.unwrap();

    c1.wait_for(|s| s.default_target == Some(c2.id)).await;
    c2.wait_for(|s| s.default_target == Some(c1.id)).await;
    (c1, c2)
}

/// A session wired straight to channels, for feeding it hand-made frames.
pub struct BareClient {
    pub handle: CallSessionHandle,
    pub events: mpsc::UnboundedReceiver<CallEvent>,
    pub outbound: mpsc::UnboundedReceiver<ClientMessage>,
    pub inbound: mpsc::UnboundedSender<ServerMessage>,
    pub media: MockMediaDevices,
    pub factory: MockNegotiationFactory,
}

impl BareClient {
    pub fn spawn(config: SessionConfig, media: MockMediaDevices) -> Self {
        let (outbound_tx, outbound) = mpsc::unbounded_channel::<ClientMessage>();
        let (inbound, inbound_rx) = mpsc::unbounded_channel();
        let factory = MockNegotiationFactory::new();

        let (handle, events) = CallSession::spawn(
            config,
            Arc::new(outbound_tx) as Arc<dyn SignalingOutput>,
            inbound_rx,
            Arc::new(media.clone()),
            Arc::new(factory.clone()),
        );

        Self {
            handle,
            events,
            outbound,
            inbound,
            media,
            factory,
        }
    }

    /// Sends a welcome frame and waits for the session to adopt the id.
    pub async fn welcome(&self, id: ConnectionId) {
        self.inbound
            .send(ServerMessage::Welcome {
                id,
                ice_servers: Vec::new(),
            })
            .unwrap();
        self.wait_for(|s| s.local_id == Some(id)).await;
    }

    pub fn push(&self, message: ServerMessage) {
        self.inbound.send(message).unwrap();
    }

    pub async fn wait_for<F>(&self, predicate: F) -> SessionSnapshot
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        self.handle
            .wait_for(WAIT, predicate)
            .await
            .expect("session never reached the expected snapshot")
    }

    /// Waits for the next outbound frame.
    pub async fn next_sent(&mut self) -> ClientMessage {
        tokio::time::timeout(WAIT, self.outbound.recv())
            .await
            .expect("no frame sent in time")
            .expect("outbound channel closed")
    }

    /// Everything sent so far, without waiting.
    pub fn drain_sent(&mut self) -> Vec<ClientMessage> {
        let mut sent = Vec::new();
        while let Ok(message) = self.outbound.try_recv() {
            sent.push(message);
        }
        sent
    }
}

/// Fixed ids so tie-breaks are predictable.
pub fn fixed_id(n: u128) -> ConnectionId {
    format!("00000000-0000-0000-0000-{:012x}", n)
        .parse()
        .expect("valid uuid")
}

/// Gives background steps a moment to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
