use crate::integration::init_tracing;
use crate::utils::{BareClient, MockMediaDevices, MockStream, fixed_id, settle};
use std::sync::Arc;
use duet_client::{CallState, SessionConfig};
use duet_core::{ClientMessage, IceCandidate, ServerMessage};

#[tokio::test]
async fn test_media_arriving_after_hangup_is_stopped() {
    init_tracing();
    let mut client = BareClient::spawn(SessionConfig::default(), MockMediaDevices::gated());
    client.welcome(fixed_id(1)).await;

    client.handle.start_call(Some(fixed_id(2))).await.unwrap();
    client.wait_for(|s| s.state == CallState::Calling).await;
    settle().await;
    assert_eq!(client.media.requests(), 1);

    // The user gives up while the camera is still starting.
    client.handle.end_call().await.unwrap();
    client.wait_for(|s| s.state == CallState::Idle).await;

    client.media.open_gate();
    settle().await;

    let late = client.media.last_stream().expect("acquisition finished");
    assert!(late.all_stopped());

    let snapshot = client.handle.snapshot();
    assert!(snapshot.is_clean());
    assert_eq!(
        client.drain_sent(),
        vec![ClientMessage::CallEnded { to: fixed_id(2) }],
        "no offer after the attempt ended"
    );
}

#[tokio::test]
async fn test_remote_hangup_during_acquisition_discards_result() {
    init_tracing();
    let mut client = BareClient::spawn(SessionConfig::default(), MockMediaDevices::gated());
    client.welcome(fixed_id(1)).await;

    client.handle.start_call(Some(fixed_id(2))).await.unwrap();
    client.wait_for(|s| s.state == CallState::Calling).await;

    client.push(ServerMessage::CallRejected { from: fixed_id(2) });
    client.wait_for(|s| s.state == CallState::Idle).await;

    // A new attempt starts before the old media shows up.
    client.handle.start_call(Some(fixed_id(3))).await.unwrap();
    client.wait_for(|s| s.state == CallState::Calling).await;
    client.media.open_gate();

    let snapshot = client.wait_for(|s| s.has_local_stream).await;
    assert_eq!(snapshot.remote, Some(fixed_id(3)));
    settle().await;

    let streams = client.media.acquired();
    assert_eq!(streams.len(), 2);
    let stale = streams.iter().filter(|s| s.all_stopped()).count();
    let live = streams.iter().filter(|s| s.none_stopped()).count();
    assert_eq!((stale, live), (1, 1));

    let offers: Vec<_> = client
        .drain_sent()
        .into_iter()
        .filter_map(|m| match m {
            ClientMessage::CallOffer { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(offers, vec![fixed_id(3)]);
}

#[tokio::test]
async fn test_events_from_released_context_are_dropped() {
    init_tracing();
    let mut client = BareClient::spawn(SessionConfig::default(), MockMediaDevices::new());
    client.welcome(fixed_id(1)).await;

    client.handle.start_call(Some(fixed_id(2))).await.unwrap();
    client.wait_for(|s| s.has_local_stream).await;
    client.handle.end_call().await.unwrap();
    client.wait_for(|s| s.state == CallState::Idle).await;
    client.drain_sent();

    let old = client.factory.context(0);
    old.emit_candidate(IceCandidate::new("candidate:late"));
    old.emit_remote_stream(Arc::new(MockStream::new("late")));
    settle().await;

    assert!(client.drain_sent().is_empty());
    assert!(client.handle.snapshot().is_clean());
}
