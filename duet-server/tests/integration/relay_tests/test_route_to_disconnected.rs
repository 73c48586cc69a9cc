use duet_core::{ClientMessage, ConnectionId, IceCandidate, ServerMessage};
use std::time::Duration;

use crate::integration::{create_test_hub, init_tracing};
use crate::utils::{join, send_signal, sync};

#[tokio::test]
async fn test_route_to_disconnected_is_silently_dropped() {
    init_tracing();

    let (hub_tx, signaling, _rx) = create_test_hub(Some(2));
    let c1 = signaling.connect();
    let never_connected = ConnectionId::new();

    join(&hub_tx, c1, "a@x.com", "R").await;
    sync(&hub_tx).await;
    let before = signaling.messages_for(&c1).len();

    for _ in 0..50 {
        send_signal(
            &hub_tx,
            c1,
            ClientMessage::IceCandidate {
                to: never_connected,
                candidate: IceCandidate::new("candidate:1"),
            },
        )
        .await;
    }

    // The hub keeps serving and the sender is told nothing.
    let stats = tokio::time::timeout(Duration::from_secs(1), sync(&hub_tx))
        .await
        .expect("hub blocked on a dead destination");
    assert_eq!(stats.identities, 1);
    assert_eq!(signaling.messages_for(&c1).len(), before);
    assert_eq!(signaling.messages_for(&never_connected), Vec::<ServerMessage>::new());
}

#[tokio::test]
async fn test_route_after_recipient_dropped() {
    init_tracing();

    let (hub_tx, signaling, _rx) = create_test_hub(Some(2));
    let c1 = signaling.connect();
    let c2 = signaling.connect();

    signaling.disconnect(&c2);
    send_signal(&hub_tx, c1, ClientMessage::CallEnded { to: c2 }).await;
    sync(&hub_tx).await;

    assert!(signaling.messages_for(&c2).is_empty());
}
