use duet_core::{ClientMessage, ConnectionId, RoomId};
use duet_server::{HubCommand, HubStats};
use tokio::sync::{mpsc, oneshot};

/// Timeout for waiting on a single frame (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 5000;

pub async fn send_signal(hub_tx: &mpsc::Sender<HubCommand>, from: ConnectionId, message: ClientMessage) {
    hub_tx
        .send(HubCommand::Signal { from, message })
        .await
        .expect("hub stopped");
}

pub async fn join(
    hub_tx: &mpsc::Sender<HubCommand>,
    from: ConnectionId,
    identity: &str,
    room: &str,
) {
    send_signal(
        hub_tx,
        from,
        ClientMessage::RoomJoin {
            identity: identity.to_owned(),
            room: RoomId::from(room),
        },
    )
    .await;
}

pub async fn disconnect(hub_tx: &mpsc::Sender<HubCommand>, connection_id: ConnectionId) {
    hub_tx
        .send(HubCommand::Disconnect { connection_id })
        .await
        .expect("hub stopped");
}

/// Round-trips a stats request. Since the hub handles commands in order,
/// every command sent before this one has been processed on return.
pub async fn sync(hub_tx: &mpsc::Sender<HubCommand>) -> HubStats {
    let (reply, rx) = oneshot::channel();
    hub_tx
        .send(HubCommand::Stats { reply })
        .await
        .expect("hub stopped");
    rx.await.expect("hub dropped stats reply")
}
