use crate::error::SessionError;
use crate::session::{SessionCommand, SessionSnapshot};
use duet_core::{ConnectionId, RoomId};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Cloneable front end of a running `CallSession`.
#[derive(Clone)]
pub struct CallSessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl CallSessionHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<SessionCommand>,
        snapshot: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self { commands, snapshot }
    }

    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub async fn join_room(
        &self,
        identity: impl Into<String>,
        room: impl Into<RoomId>,
    ) -> Result<(), SessionError> {
        self.send(SessionCommand::JoinRoom {
            identity: identity.into(),
            room: room.into(),
        })
        .await
    }

    /// Calls `to`, or the room's default target when `None`.
    pub async fn start_call(&self, to: Option<ConnectionId>) -> Result<(), SessionError> {
        self.send(SessionCommand::StartCall { to }).await
    }

    pub async fn accept(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Accept).await
    }

    pub async fn reject(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Reject).await
    }

    pub async fn end_call(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::EndCall).await
    }

    pub async fn toggle_mic(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::ToggleMic).await
    }

    pub async fn toggle_camera(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::ToggleCamera).await
    }

    pub async fn send_chat(&self, message: impl Into<String>) -> Result<(), SessionError> {
        self.send(SessionCommand::SendChat {
            message: message.into(),
        })
        .await
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Waits until the published snapshot satisfies `predicate`.
    pub async fn wait_for<F>(
        &self,
        timeout: Duration,
        predicate: F,
    ) -> Result<SessionSnapshot, SessionError>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.snapshot.clone();
        match tokio::time::timeout(timeout, rx.wait_for(predicate)).await {
            Ok(Ok(snapshot)) => Ok(snapshot.clone()),
            Ok(Err(_)) => Err(SessionError::Closed),
            Err(_) => Err(SessionError::Timeout),
        }
    }
}
