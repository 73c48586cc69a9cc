pub mod websocket_tests;

use tokio::sync::mpsc;
use tracing::Level;

use duet_server::{HubCommand, Relay, SignalingHub, SignalingOutput};
use std::sync::Arc;

use crate::utils::{Delivered, MockSignalingOutput};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_hub(
    max_room_members: Option<usize>,
) -> (
    mpsc::Sender<HubCommand>,
    MockSignalingOutput,
    mpsc::UnboundedReceiver<Delivered>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<HubCommand>(100);
    let (signaling, delivered_rx) = MockSignalingOutput::new();
    let relay = Relay::new(Arc::new(signaling.clone()) as Arc<dyn SignalingOutput>);

    let hub = SignalingHub::new(relay, max_room_members, cmd_rx);
    tokio::spawn(async move {
        hub.run().await;
    });

    (cmd_tx, signaling, delivered_rx)
}
