use crate::capability::{MediaStream, NegotiationContext};
use crate::error::NegotiationError;
use crate::negotiation::Generation;
use duet_core::{IceCandidate, SessionDescription};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// What happened to a remote candidate handed to an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateDisposition {
    Applied,
    /// Held until the remote description is applied.
    Buffered,
}

#[derive(Debug, Default)]
struct CandidateQueue {
    remote_described: bool,
    pending: Vec<IceCandidate>,
}

/// A single negotiation attempt over one context.
pub struct Negotiation {
    generation: Generation,
    context: Arc<dyn NegotiationContext>,
    candidates: Mutex<CandidateQueue>,
}

impl Negotiation {
    pub fn new(generation: Generation, context: Arc<dyn NegotiationContext>) -> Self {
        Self {
            generation,
            context,
            candidates: Mutex::new(CandidateQueue::default()),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Adds every track of `stream` that is not already a sender.
    pub async fn attach_local_media(
        &self,
        stream: &dyn MediaStream,
    ) -> Result<usize, NegotiationError> {
        let attached: HashSet<String> =
            self.context.sender_track_ids().await.into_iter().collect();

        let mut added = 0;
        for track in stream.tracks() {
            if attached.contains(track.id()) {
                continue;
            }
            self.context.add_track(track, stream.id()).await?;
            added += 1;
        }

        debug!("Attempt {}: attached {} local track(s)", self.generation, added);
        Ok(added)
    }

    pub async fn produce_offer(
        &self,
        stream: &dyn MediaStream,
    ) -> Result<SessionDescription, NegotiationError> {
        self.attach_local_media(stream).await?;

        let offer = self.context.create_offer().await?;
        self.context.set_local_description(offer.clone()).await?;
        Ok(offer)
    }

    pub async fn produce_answer(
        &self,
        offer: SessionDescription,
        stream: &dyn MediaStream,
    ) -> Result<SessionDescription, NegotiationError> {
        self.attach_local_media(stream).await?;

        self.context.set_remote_description(offer).await?;
        self.flush_candidates().await;

        let answer = self.context.create_answer().await?;
        self.context.set_local_description(answer.clone()).await?;
        Ok(answer)
    }

    pub async fn apply_remote_answer(
        &self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.context.set_remote_description(answer).await?;
        self.flush_candidates().await;
        Ok(())
    }

    pub async fn apply_remote_candidate(
        &self,
        candidate: IceCandidate,
    ) -> Result<CandidateDisposition, NegotiationError> {
        // The lock stays held while applying so a concurrent flush cannot
        // reorder candidates.
        let mut queue = self.candidates.lock().await;
        if !queue.remote_described {
            queue.pending.push(candidate);
            return Ok(CandidateDisposition::Buffered);
        }

        self.context.add_ice_candidate(candidate).await?;
        Ok(CandidateDisposition::Applied)
    }

    pub async fn close(&self) {
        self.context.close().await;
    }

    /// Marks the remote description as applied and hands over everything
    /// that queued up before it, in arrival order. Candidate errors are
    /// logged, not fatal.
    async fn flush_candidates(&self) {
        let mut queue = self.candidates.lock().await;
        queue.remote_described = true;
        let pending = std::mem::take(&mut queue.pending);

        if !pending.is_empty() {
            debug!(
                "Attempt {}: flushing {} buffered candidate(s)",
                self.generation,
                pending.len()
            );
        }
        for candidate in pending {
            if let Err(e) = self.context.add_ice_candidate(candidate).await {
                warn!("Attempt {}: buffered candidate rejected: {}", self.generation, e);
            }
        }
    }
}
