use crate::integration::init_tracing;
use crate::utils::{MemoryRelay, paired_clients, settle};
use duet_client::{CallEvent, CallState, EndReason, SessionConfig};
use duet_core::ClientMessage;
use std::time::Duration;

#[tokio::test]
async fn test_caller_keeps_calling_when_callee_disconnects() {
    init_tracing();
    let relay = MemoryRelay::new();
    let (c1, c2) = paired_clients(&relay, SessionConfig::default()).await;

    relay.detach(&c2.id);
    c1.handle.start_call(Some(c2.id)).await.unwrap();
    c1.wait_for(|s| s.state == CallState::Calling && s.has_local_stream)
        .await;

    // Nobody tells the caller; without a timeout it waits.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let caller = c1.handle.snapshot();
    assert_eq!(caller.state, CallState::Calling);
    assert_eq!(caller.remote, Some(c2.id));
    assert!(c1.media.last_stream().unwrap().none_stopped());
}

#[tokio::test]
async fn test_caller_timeout_ends_call_and_notifies_remote() {
    init_tracing();
    let relay = MemoryRelay::new();
    let config = SessionConfig::default().with_call_timeout(Duration::from_millis(200));
    let (mut c1, c2) = paired_clients(&relay, config).await;

    relay.detach(&c2.id);
    c1.handle.start_call(Some(c2.id)).await.unwrap();
    c1.wait_state(CallState::Calling).await;

    c1.expect_event(|e| {
        matches!(
            e,
            CallEvent::Ended {
                reason: EndReason::Timeout
            }
        )
    })
    .await;

    let caller = c1.wait_state(CallState::Idle).await;
    assert!(caller.is_clean());
    assert!(c1.media.last_stream().unwrap().all_stopped());
    assert_eq!(
        relay.sent_by(&c1.id).last(),
        Some(&ClientMessage::CallEnded { to: c2.id })
    );
}

#[tokio::test]
async fn test_unanswered_invite_times_out_with_reject() {
    init_tracing();
    let relay = MemoryRelay::new();
    let (c1, _) = paired_clients(&relay, SessionConfig::default()).await;
    let mut c3 = crate::utils::spawn_client(
        &relay,
        SessionConfig::default().with_call_timeout(Duration::from_millis(200)),
    )
    .await;

    c1.handle.start_call(Some(c3.id)).await.unwrap();
    c3.wait_state(CallState::Incoming).await;

    c3.expect_event(|e| {
        matches!(
            e,
            CallEvent::Ended {
                reason: EndReason::Timeout
            }
        )
    })
    .await;

    assert!(c3.wait_state(CallState::Idle).await.is_clean());
    assert_eq!(
        relay.sent_by(&c3.id),
        vec![ClientMessage::CallRejected { to: c1.id }]
    );

    // The caller sees an ordinary rejection.
    assert!(c1.wait_state(CallState::Idle).await.is_clean());
}

#[tokio::test]
async fn test_timeout_is_disarmed_once_in_call() {
    init_tracing();
    let relay = MemoryRelay::new();
    let config = SessionConfig::default().with_call_timeout(Duration::from_millis(200));
    let (c1, c2) = paired_clients(&relay, config).await;

    c1.handle.start_call(Some(c2.id)).await.unwrap();
    c2.wait_state(CallState::Incoming).await;
    c2.handle.accept().await.unwrap();
    c1.wait_state(CallState::InCall).await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    settle().await;

    assert_eq!(c1.handle.snapshot().state, CallState::InCall);
    assert_eq!(c2.handle.snapshot().state, CallState::InCall);
}
