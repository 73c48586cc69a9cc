use crate::negotiation::Generation;
use duet_core::{ConnectionId, IceCandidate, RoomId, SessionDescription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    /// Outgoing offer in flight, or an accepted invite still producing its
    /// answer.
    Calling,
    Incoming,
    InCall,
}

impl CallState {
    pub fn is_idle(self) -> bool {
        self == CallState::Idle
    }

    pub fn is_active(self) -> bool {
        matches!(self, CallState::Calling | CallState::InCall)
    }
}

/// An offer waiting for the user to accept or reject it.
#[derive(Debug, Clone)]
pub struct PendingInvite {
    pub from: ConnectionId,
    pub from_identity: Option<String>,
    pub offer: SessionDescription,
    /// Candidates from the caller that arrived before the user decided.
    pub candidates: Vec<IceCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteSummary {
    pub from: ConnectionId,
    pub from_identity: Option<String>,
}

impl From<&PendingInvite> for InviteSummary {
    fn from(invite: &PendingInvite) -> Self {
        Self {
            from: invite.from,
            from_identity: invite.from_identity.clone(),
        }
    }
}

/// Point-in-time view of a session, published on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub local_id: Option<ConnectionId>,
    pub room: Option<RoomId>,
    pub default_target: Option<ConnectionId>,
    pub state: CallState,
    pub remote: Option<ConnectionId>,
    pub invite: Option<InviteSummary>,
    pub has_local_stream: bool,
    pub has_remote_stream: bool,
    pub mic_enabled: bool,
    pub camera_enabled: bool,
    pub generation: Generation,
}

impl SessionSnapshot {
    pub(crate) fn idle() -> Self {
        Self {
            local_id: None,
            room: None,
            default_target: None,
            state: CallState::Idle,
            remote: None,
            invite: None,
            has_local_stream: false,
            has_remote_stream: false,
            mic_enabled: true,
            camera_enabled: true,
            generation: Generation::default(),
        }
    }

    /// True when the session holds no call resources at all.
    pub fn is_clean(&self) -> bool {
        self.state.is_idle()
            && self.remote.is_none()
            && self.invite.is_none()
            && !self.has_local_stream
            && !self.has_remote_stream
            && self.mic_enabled
            && self.camera_enabled
    }
}
