use crate::capability::{MediaTrack, SharedStream};
use crate::error::NegotiationError;
use crate::negotiation::ContextEventSink;
use async_trait::async_trait;
use duet_core::{IceCandidate, IceServerConfig, SessionDescription};
use std::sync::Arc;

/// One peer-to-peer negotiation context. A context is used for a single
/// call attempt and never reused after `close`.
#[async_trait]
pub trait NegotiationContext: Send + Sync {
    /// Ids of the local tracks already attached as senders.
    async fn sender_track_ids(&self) -> Vec<String>;

    async fn add_track(
        &self,
        track: Arc<dyn MediaTrack>,
        stream_id: &str,
    ) -> Result<(), NegotiationError>;

    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), NegotiationError>;

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), NegotiationError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError>;

    async fn close(&self);
}

/// Creates negotiation contexts. Every context reports remote streams and
/// local candidates through the sink it was created with.
#[async_trait]
pub trait NegotiationFactory: Send + Sync {
    async fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: ContextEventSink,
    ) -> Result<Arc<dyn NegotiationContext>, NegotiationError>;
}

/// Events a context reports back to the session that owns it.
#[derive(Debug, Clone)]
pub enum ContextEvent {
    RemoteStream(SharedStream),
    LocalCandidate(IceCandidate),
}
