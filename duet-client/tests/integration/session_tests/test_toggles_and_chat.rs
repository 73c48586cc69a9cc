use crate::integration::init_tracing;
use crate::utils::{MemoryRelay, paired_clients, settle};
use duet_client::capability::MediaTrack;
use duet_client::{CallEvent, CallState, SessionConfig};

#[tokio::test]
async fn test_toggles_follow_local_tracks_and_reset_on_cleanup() {
    init_tracing();
    let relay = MemoryRelay::new();
    let (c1, c2) = paired_clients(&relay, SessionConfig::default()).await;

    // Muting before the call applies to the stream once it exists.
    c1.handle.toggle_mic().await.unwrap();
    c1.wait_for(|s| !s.mic_enabled).await;

    c1.handle.start_call(Some(c2.id)).await.unwrap();
    c1.wait_for(|s| s.has_local_stream).await;
    let stream = c1.media.last_stream().unwrap();
    assert!(!stream.audio().is_enabled());
    assert!(stream.video().is_enabled());

    c1.handle.toggle_camera().await.unwrap();
    let snapshot = c1.wait_for(|s| !s.camera_enabled).await;
    assert!(!snapshot.mic_enabled);
    assert!(!stream.video().is_enabled());

    c1.handle.toggle_mic().await.unwrap();
    c1.wait_for(|s| s.mic_enabled).await;
    assert!(stream.audio().is_enabled());

    c1.handle.end_call().await.unwrap();
    let snapshot = c1.wait_state(CallState::Idle).await;
    assert!(snapshot.mic_enabled);
    assert!(snapshot.camera_enabled);
}

#[tokio::test]
async fn test_chat_reaches_the_other_member() {
    init_tracing();
    let relay = MemoryRelay::new();
    let (c1, mut c2) = paired_clients(&relay, SessionConfig::default()).await;

    c1.handle.send_chat("hello there").await.unwrap();

    let event = c2
        .expect_event(|e| matches!(e, CallEvent::Chat { .. }))
        .await;
    let CallEvent::Chat {
        from,
        from_identity,
        message,
    } = event
    else {
        unreachable!();
    };
    assert_eq!(from, c1.id);
    assert_eq!(from_identity.as_deref(), Some("a@x.com"));
    assert_eq!(message, "hello there");

    settle().await;
    assert!(
        !relay.kinds_sent_by(&c2.id).contains(&"chat-message"),
        "no echo"
    );
}
