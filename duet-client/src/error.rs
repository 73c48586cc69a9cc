use thiserror::Error;

/// Failures of the media or negotiation capabilities. Any of them aborts
/// the current call attempt locally.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The user or the platform refused the local media.
    #[error("Media acquisition denied: {0}")]
    MediaDenied(String),

    /// An offer or answer was malformed or incompatible.
    #[error("Session description rejected: {0}")]
    Description(String),

    #[error("Connectivity candidate rejected: {0}")]
    Candidate(String),

    /// The context was used after it had been released.
    #[error("Negotiation context already closed")]
    ContextClosed,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The session task has stopped.
    #[error("Call session closed")]
    Closed,

    #[error("Timed out waiting for session state")]
    Timeout,
}
