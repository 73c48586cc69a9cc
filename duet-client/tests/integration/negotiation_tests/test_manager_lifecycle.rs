use crate::integration::init_tracing;
use crate::utils::{MockNegotiationFactory, MockStream, settle};
use duet_client::NegotiationError;
use duet_client::capability::ContextEvent;
use duet_client::negotiation::{Generation, NegotiationManager};
use duet_core::IceCandidate;
use std::sync::Arc;
use tokio::sync::mpsc;

fn manager() -> (
    NegotiationManager,
    MockNegotiationFactory,
    mpsc::UnboundedReceiver<duet_client::negotiation::NegotiationEvent>,
) {
    let factory = MockNegotiationFactory::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let manager = NegotiationManager::new(Arc::new(factory.clone()), Vec::new(), tx);
    (manager, factory, rx)
}

#[tokio::test]
async fn test_reset_replaces_and_closes_previous_context() {
    init_tracing();
    let (mut manager, factory, mut events) = manager();
    let first = Generation::default().next();
    let second = first.next();

    manager.reset(first).await.unwrap();
    manager.reset(second).await.unwrap();
    settle().await;

    assert_eq!(factory.created(), 2);
    assert!(factory.context(0).is_closed());
    assert!(!factory.context(1).is_closed());
    assert_eq!(manager.current().map(|n| n.generation()), Some(second));

    // Callbacks of the old context still arrive, but tagged as such.
    factory.context(0).emit_candidate(IceCandidate::new("candidate:old"));
    factory.context(1).emit_candidate(IceCandidate::new("candidate:new"));

    let old = events.recv().await.unwrap();
    let new = events.recv().await.unwrap();
    assert_eq!(old.generation, first);
    assert_eq!(new.generation, second);
    assert!(matches!(new.event, ContextEvent::LocalCandidate(c) if c.candidate == "candidate:new"));
}

#[tokio::test]
async fn test_attach_local_media_skips_attached_tracks() {
    init_tracing();
    let (mut manager, factory, _events) = manager();
    manager.reset(Generation::default().next()).await.unwrap();
    let stream = MockStream::new("local");

    assert_eq!(manager.attach_local_media(&stream).await.unwrap(), 2);
    assert_eq!(manager.attach_local_media(&stream).await.unwrap(), 0);

    let offer = manager.produce_offer(&stream).await.unwrap();
    assert_eq!(offer.sdp, "offer-0");

    let record = factory.context(0).record();
    assert_eq!(record.senders, vec!["local-audio", "local-video"]);
    assert_eq!(
        record.ops,
        vec!["add_track", "add_track", "create_offer", "set_local_description"]
    );
}

#[tokio::test]
async fn test_operations_need_an_active_context() {
    init_tracing();
    let (mut manager, factory, _events) = manager();
    let stream = MockStream::new("local");

    let err = manager.produce_offer(&stream).await.unwrap_err();
    assert!(matches!(err, NegotiationError::ContextClosed));

    manager.reset(Generation::default().next()).await.unwrap();
    manager.release();
    manager.release();
    settle().await;

    assert!(!manager.is_active());
    assert!(factory.context(0).is_closed());
    assert!(matches!(
        manager.apply_remote_candidate(IceCandidate::new("candidate:x")).await,
        Err(NegotiationError::ContextClosed)
    ));
}
