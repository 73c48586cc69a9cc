use crate::capability::{SharedStream, stop_stream};
use crate::error::NegotiationError;
use crate::negotiation::Generation;
use duet_core::{ConnectionId, RoomId, SessionDescription};

/// User intents, sent through a `CallSessionHandle`.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    JoinRoom { identity: String, room: RoomId },
    /// `None` calls the room's default target.
    StartCall { to: Option<ConnectionId> },
    Accept,
    Reject,
    EndCall,
    ToggleMic,
    ToggleCamera,
    SendChat { message: String },
    Shutdown,
}

/// Completion of an async step spawned by the session.
#[derive(Debug)]
pub(crate) enum AttemptOutcome {
    OfferReady {
        generation: Generation,
        stream: SharedStream,
        offer: SessionDescription,
    },
    AnswerReady {
        generation: Generation,
        stream: SharedStream,
        answer: SessionDescription,
    },
    AnswerApplied {
        generation: Generation,
    },
    Failed {
        generation: Generation,
        error: NegotiationError,
        stream: Option<SharedStream>,
    },
    TimedOut {
        generation: Generation,
    },
}

impl AttemptOutcome {
    pub(crate) fn generation(&self) -> Generation {
        match self {
            AttemptOutcome::OfferReady { generation, .. }
            | AttemptOutcome::AnswerReady { generation, .. }
            | AttemptOutcome::AnswerApplied { generation }
            | AttemptOutcome::Failed { generation, .. }
            | AttemptOutcome::TimedOut { generation } => *generation,
        }
    }

    /// Releases whatever media the outcome carries. Used when nobody is
    /// going to take ownership of it.
    pub(crate) fn discard(self) {
        match self {
            AttemptOutcome::OfferReady { stream, .. }
            | AttemptOutcome::AnswerReady { stream, .. }
            | AttemptOutcome::Failed {
                stream: Some(stream),
                ..
            } => stop_stream(stream.as_ref()),
            _ => {}
        }
    }
}
