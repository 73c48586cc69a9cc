use crate::capability::{MediaStream, NegotiationFactory};
use crate::error::NegotiationError;
use crate::negotiation::{
    CandidateDisposition, ContextEventSink, Generation, Negotiation, NegotiationEvent,
};
use duet_core::{IceCandidate, IceServerConfig, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Owns the negotiation context of a session and replaces it on every call
/// attempt.
pub struct NegotiationManager {
    factory: Arc<dyn NegotiationFactory>,
    ice_servers: Vec<IceServerConfig>,
    events: mpsc::UnboundedSender<NegotiationEvent>,
    current: Option<Arc<Negotiation>>,
    candidate_feed: Option<mpsc::UnboundedSender<IceCandidate>>,
}

impl NegotiationManager {
    pub fn new(
        factory: Arc<dyn NegotiationFactory>,
        ice_servers: Vec<IceServerConfig>,
        events: mpsc::UnboundedSender<NegotiationEvent>,
    ) -> Self {
        Self {
            factory,
            ice_servers,
            events,
            current: None,
            candidate_feed: None,
        }
    }

    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.ice_servers
    }

    pub fn set_ice_servers(&mut self, ice_servers: Vec<IceServerConfig>) {
        self.ice_servers = ice_servers;
    }

    /// Releases the current context and creates a fresh one whose events
    /// are tagged with `generation`.
    pub async fn reset(
        &mut self,
        generation: Generation,
    ) -> Result<Arc<Negotiation>, NegotiationError> {
        self.release();

        let sink = ContextEventSink::new(generation, self.events.clone());
        let context = self.factory.create(&self.ice_servers, sink).await?;
        let negotiation = Arc::new(Negotiation::new(generation, context));
        self.current = Some(Arc::clone(&negotiation));
        self.candidate_feed = Some(spawn_candidate_feed(Arc::clone(&negotiation)));

        info!("Negotiation context reset for attempt {}", generation);
        Ok(negotiation)
    }

    pub fn current(&self) -> Option<Arc<Negotiation>> {
        self.current.clone()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Drops the current context and closes it in the background. Safe to
    /// call with nothing active.
    pub fn release(&mut self) {
        self.candidate_feed = None;
        let Some(negotiation) = self.current.take() else {
            return;
        };
        debug!("Releasing negotiation context of attempt {}", negotiation.generation());

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { negotiation.close().await });
            }
            Err(_) => debug!("No runtime left, context dropped without close"),
        }
    }

    fn active(&self) -> Result<&Arc<Negotiation>, NegotiationError> {
        self.current.as_ref().ok_or(NegotiationError::ContextClosed)
    }

    pub async fn attach_local_media(
        &self,
        stream: &dyn MediaStream,
    ) -> Result<usize, NegotiationError> {
        self.active()?.attach_local_media(stream).await
    }

    pub async fn produce_offer(
        &self,
        stream: &dyn MediaStream,
    ) -> Result<SessionDescription, NegotiationError> {
        self.active()?.produce_offer(stream).await
    }

    pub async fn produce_answer(
        &self,
        offer: SessionDescription,
        stream: &dyn MediaStream,
    ) -> Result<SessionDescription, NegotiationError> {
        self.active()?.produce_answer(offer, stream).await
    }

    pub async fn apply_remote_answer(
        &self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.active()?.apply_remote_answer(answer).await
    }

    pub async fn apply_remote_candidate(
        &self,
        candidate: IceCandidate,
    ) -> Result<CandidateDisposition, NegotiationError> {
        self.active()?.apply_remote_candidate(candidate).await
    }

    /// Hands a remote candidate to the current attempt without waiting.
    /// Queued candidates reach the attempt one at a time, in the order
    /// they were queued.
    pub fn queue_remote_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        let feed = self
            .candidate_feed
            .as_ref()
            .ok_or(NegotiationError::ContextClosed)?;
        feed.send(candidate)
            .map_err(|_| NegotiationError::ContextClosed)
    }
}

fn spawn_candidate_feed(negotiation: Arc<Negotiation>) -> mpsc::UnboundedSender<IceCandidate> {
    let (tx, mut rx) = mpsc::unbounded_channel::<IceCandidate>();
    tokio::spawn(async move {
        while let Some(candidate) = rx.recv().await {
            if let Err(e) = negotiation.apply_remote_candidate(candidate).await {
                warn!(
                    "Attempt {}: remote candidate rejected: {}",
                    negotiation.generation(),
                    e
                );
            }
        }
        debug!("Candidate feed of attempt {} closed", negotiation.generation());
    });
    tx
}

impl Drop for NegotiationManager {
    fn drop(&mut self) {
        self.release();
    }
}
