use crate::capability::{ContextEvent, SharedStream};
use crate::negotiation::Generation;
use duet_core::IceCandidate;
use tokio::sync::mpsc;
use tracing::debug;

/// A context event together with the attempt that produced it.
#[derive(Debug, Clone)]
pub struct NegotiationEvent {
    pub generation: Generation,
    pub event: ContextEvent,
}

/// Listener binding handed to a negotiation context on creation.
///
/// Each reset creates a new sink, so callbacks still firing on a released
/// context arrive tagged with an old generation.
#[derive(Debug, Clone)]
pub struct ContextEventSink {
    generation: Generation,
    tx: mpsc::UnboundedSender<NegotiationEvent>,
}

impl ContextEventSink {
    pub fn new(generation: Generation, tx: mpsc::UnboundedSender<NegotiationEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn remote_stream(&self, stream: SharedStream) {
        self.emit(ContextEvent::RemoteStream(stream));
    }

    pub fn local_candidate(&self, candidate: IceCandidate) {
        self.emit(ContextEvent::LocalCandidate(candidate));
    }

    fn emit(&self, event: ContextEvent) {
        let event = NegotiationEvent {
            generation: self.generation,
            event,
        };
        if self.tx.send(event).is_err() {
            debug!("Negotiation event for {} dropped, session gone", self.generation);
        }
    }
}
