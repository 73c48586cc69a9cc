use crate::capability::{
    ContextEvent, MediaDevices, NegotiationFactory, SharedStream, SignalingOutput, TrackKind,
    set_kind_enabled, stop_stream,
};
use crate::config::SessionConfig;
use crate::negotiation::{Generation, Negotiation, NegotiationEvent, NegotiationManager};
use crate::session::{
    AttemptOutcome, CallEvent, CallSessionHandle, CallState, EndReason, InviteSummary,
    PendingInvite, SessionCommand, SessionSnapshot,
};
use duet_core::{
    ClientMessage, ConnectionId, IceCandidate, RoomId, ServerMessage, SessionDescription,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Client-side state machine for one signaling connection.
///
/// The session runs as a single task. User commands, relayed frames,
/// negotiation callbacks and the results of its own background steps are
/// all handled on that task, so state is never touched concurrently. Slow
/// work (media acquisition, description handling) runs in spawned tasks
/// that report back tagged with the generation they were started for.
pub struct CallSession {
    config: SessionConfig,
    local_id: Option<ConnectionId>,
    room: Option<RoomId>,
    default_target: Option<ConnectionId>,
    /// Room and target to fall back to if the join in flight is refused.
    pending_join: Option<(Option<RoomId>, Option<ConnectionId>)>,

    state: CallState,
    remote: Option<ConnectionId>,
    is_caller: bool,
    invite: Option<PendingInvite>,
    early_candidates: VecDeque<(ConnectionId, IceCandidate)>,
    local_stream: Option<SharedStream>,
    remote_stream: Option<SharedStream>,
    mic_enabled: bool,
    camera_enabled: bool,
    generation: Generation,

    media: Arc<dyn MediaDevices>,
    negotiation: NegotiationManager,
    signaling: Arc<dyn SignalingOutput>,

    command_rx: mpsc::Receiver<SessionCommand>,
    inbound_rx: mpsc::UnboundedReceiver<ServerMessage>,
    negotiation_rx: mpsc::UnboundedReceiver<NegotiationEvent>,
    outcome_tx: mpsc::UnboundedSender<AttemptOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<AttemptOutcome>,
    event_tx: mpsc::UnboundedSender<CallEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl CallSession {
    pub fn new(
        config: SessionConfig,
        signaling: Arc<dyn SignalingOutput>,
        inbound_rx: mpsc::UnboundedReceiver<ServerMessage>,
        media: Arc<dyn MediaDevices>,
        factory: Arc<dyn NegotiationFactory>,
    ) -> (Self, CallSessionHandle, mpsc::UnboundedReceiver<CallEvent>) {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (negotiation_tx, negotiation_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::idle());

        let negotiation =
            NegotiationManager::new(factory, config.ice_servers.clone(), negotiation_tx);

        let session = Self {
            config,
            local_id: None,
            room: None,
            default_target: None,
            pending_join: None,
            state: CallState::Idle,
            remote: None,
            is_caller: false,
            invite: None,
            early_candidates: VecDeque::new(),
            local_stream: None,
            remote_stream: None,
            mic_enabled: true,
            camera_enabled: true,
            generation: Generation::default(),
            media,
            negotiation,
            signaling,
            command_rx,
            inbound_rx,
            negotiation_rx,
            outcome_tx,
            outcome_rx,
            event_tx,
            snapshot_tx,
        };

        let handle = CallSessionHandle::new(command_tx, snapshot_rx);
        (session, handle, event_rx)
    }

    /// Starts the session on the current runtime.
    pub fn spawn(
        config: SessionConfig,
        signaling: Arc<dyn SignalingOutput>,
        inbound_rx: mpsc::UnboundedReceiver<ServerMessage>,
        media: Arc<dyn MediaDevices>,
        factory: Arc<dyn NegotiationFactory>,
    ) -> (CallSessionHandle, mpsc::UnboundedReceiver<CallEvent>) {
        let (session, handle, events) = Self::new(config, signaling, inbound_rx, media, factory);
        tokio::spawn(session.run());
        (handle, events)
    }

    pub async fn run(mut self) {
        info!("Call session started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Shutdown) | None => {
                            info!("Call session shutting down");
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                    }
                }

                msg = self.inbound_rx.recv() => {
                    match msg {
                        Some(m) => self.handle_signal(m),
                        None => {
                            warn!("Signaling channel closed");
                            break;
                        }
                    }
                }

                Some(evt) = self.negotiation_rx.recv() => self.handle_negotiation_event(evt),

                Some(outcome) = self.outcome_rx.recv() => self.handle_outcome(outcome),
            }
        }

        self.cleanup(EndReason::Shutdown);
        info!("Call session finished");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            local_id: self.local_id,
            room: self.room.clone(),
            default_target: self.default_target,
            state: self.state,
            remote: self.remote,
            invite: self.invite.as_ref().map(InviteSummary::from),
            has_local_stream: self.local_stream.is_some(),
            has_remote_stream: self.remote_stream.is_some(),
            mic_enabled: self.mic_enabled,
            camera_enabled: self.camera_enabled,
            generation: self.generation,
        }
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::JoinRoom { identity, room } => {
                info!("Joining room {} as {}", room, identity);
                let previous = self.room.replace(room.clone());
                let target = self.default_target.take();
                // Keep the oldest fallback while joins are in flight.
                if self.pending_join.is_none() {
                    self.pending_join = Some((previous, target));
                }
                self.send(ClientMessage::RoomJoin { identity, room });
                self.publish();
            }

            SessionCommand::StartCall { to } => self.start_call(to).await,

            SessionCommand::Accept => self.accept().await,

            SessionCommand::Reject => {
                let to = match (&self.invite, self.state) {
                    (Some(invite), CallState::Incoming) => invite.from,
                    _ => {
                        debug!("Reject ignored, no pending invite");
                        return;
                    }
                };
                self.send(ClientMessage::CallRejected { to });
                self.cleanup(EndReason::LocalReject);
            }

            SessionCommand::EndCall => {
                if !self.state.is_active() {
                    debug!("End call ignored in state {:?}", self.state);
                    return;
                }
                if let Some(to) = self.remote {
                    self.send(ClientMessage::CallEnded { to });
                }
                self.cleanup(EndReason::LocalHangup);
            }

            SessionCommand::ToggleMic => {
                self.mic_enabled = !self.mic_enabled;
                self.apply_track_flags();
                self.publish();
            }

            SessionCommand::ToggleCamera => {
                self.camera_enabled = !self.camera_enabled;
                self.apply_track_flags();
                self.publish();
            }

            SessionCommand::SendChat { message } => {
                let Some(room) = self.room.clone() else {
                    debug!("Chat ignored, not in a room");
                    return;
                };
                self.send(ClientMessage::ChatMessage { room, message });
            }

            // Handled by the run loop.
            SessionCommand::Shutdown => {}
        }
    }

    async fn start_call(&mut self, to: Option<ConnectionId>) {
        if !self.state.is_idle() {
            debug!("Start call ignored in state {:?}", self.state);
            return;
        }
        let Some(target) = to.or(self.default_target) else {
            debug!("Start call ignored, no target known");
            return;
        };

        self.generation = self.generation.next();
        self.remote = Some(target);
        self.is_caller = true;
        self.transition(CallState::Calling);
        info!("Calling {} (attempt {})", target, self.generation);

        let Some(negotiation) = self.reset_negotiation().await else {
            return;
        };
        self.arm_timeout();

        let media = Arc::clone(&self.media);
        let constraints = self.config.media;
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let generation = negotiation.generation();
            let outcome = match media.acquire(constraints).await {
                Err(error) => AttemptOutcome::Failed {
                    generation,
                    error,
                    stream: None,
                },
                Ok(stream) => match negotiation.produce_offer(stream.as_ref()).await {
                    Ok(offer) => AttemptOutcome::OfferReady {
                        generation,
                        stream,
                        offer,
                    },
                    Err(error) => AttemptOutcome::Failed {
                        generation,
                        error,
                        stream: Some(stream),
                    },
                },
            };
            report(&outcome_tx, outcome);
        });
    }

    async fn accept(&mut self) {
        if self.state != CallState::Incoming {
            debug!("Accept ignored in state {:?}", self.state);
            return;
        }
        let Some(invite) = self.invite.take() else {
            debug!("Accept ignored, no pending invite");
            return;
        };

        self.generation = self.generation.next();
        self.remote = Some(invite.from);
        self.is_caller = false;
        self.transition(CallState::Calling);
        info!("Accepting call from {} (attempt {})", invite.from, self.generation);

        let Some(negotiation) = self.reset_negotiation().await else {
            return;
        };
        for candidate in invite.candidates {
            if let Err(e) = self.negotiation.queue_remote_candidate(candidate) {
                warn!("Early candidate dropped: {}", e);
            }
        }

        let media = Arc::clone(&self.media);
        let constraints = self.config.media;
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let generation = negotiation.generation();
            let outcome = match media.acquire(constraints).await {
                Err(error) => AttemptOutcome::Failed {
                    generation,
                    error,
                    stream: None,
                },
                Ok(stream) => match negotiation.produce_answer(invite.offer, stream.as_ref()).await
                {
                    Ok(answer) => AttemptOutcome::AnswerReady {
                        generation,
                        stream,
                        answer,
                    },
                    Err(error) => AttemptOutcome::Failed {
                        generation,
                        error,
                        stream: Some(stream),
                    },
                },
            };
            report(&outcome_tx, outcome);
        });
    }

    /// Replaces the negotiation context for the current generation. A
    /// failure aborts the attempt.
    async fn reset_negotiation(&mut self) -> Option<Arc<Negotiation>> {
        match self.negotiation.reset(self.generation).await {
            Ok(negotiation) => Some(negotiation),
            Err(e) => {
                warn!("Failed to create negotiation context: {}", e);
                self.cleanup(EndReason::NegotiationFailed);
                None
            }
        }
    }

    fn handle_signal(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Welcome { id, ice_servers } => {
                info!("Connected to signaling server as {}", id);
                self.local_id = Some(id);
                if self.config.ice_servers.is_empty() {
                    self.negotiation.set_ice_servers(ice_servers);
                }
                self.emit(CallEvent::Connected { id });
                self.publish();
            }

            ServerMessage::RoomUsers { users } => {
                self.pending_join = None;
                self.default_target = users.first().copied();
                self.emit(CallEvent::RoomUsers { users });
                self.publish();
            }

            ServerMessage::RoomJoined { identity, id } => {
                info!("{} joined the room as {}", identity, id);
                // Departures are never announced; follow the newest member.
                if self.state.is_idle() || self.default_target.is_none() {
                    self.default_target = Some(id);
                }
                self.emit(CallEvent::PeerJoined { identity, id });
                self.publish();
            }

            ServerMessage::RoomFull { room } => {
                warn!("Room {} is full", room);
                if self.room.as_ref() == Some(&room) {
                    let (previous, target) = self.pending_join.take().unwrap_or_default();
                    self.room = previous;
                    self.default_target = target;
                }
                self.emit(CallEvent::RoomFull { room });
                self.publish();
            }

            ServerMessage::CallOffer {
                from,
                from_identity,
                offer,
            } => self.receive_offer(from, from_identity, offer),

            ServerMessage::CallAnswer { from, answer } => self.receive_answer(from, answer),

            ServerMessage::CallRejected { from } => {
                self.forget_early_candidates(&from);
                if self.is_current_remote(&from) {
                    info!("Call rejected by {}", from);
                    self.cleanup(EndReason::RemoteRejected);
                } else {
                    debug!("Stale call-rejected from {}", from);
                }
            }

            ServerMessage::CallEnded { from } => {
                self.forget_early_candidates(&from);
                if self.is_current_remote(&from) {
                    info!("Call ended by {}", from);
                    self.cleanup(EndReason::RemoteEnded);
                } else {
                    debug!("Stale call-ended from {}", from);
                }
            }

            ServerMessage::IceCandidate { from, candidate } => {
                self.receive_candidate(from, candidate)
            }

            ServerMessage::ChatMessage {
                from,
                from_identity,
                message,
            } => self.emit(CallEvent::Chat {
                from,
                from_identity,
                message,
            }),
        }
    }

    fn receive_offer(
        &mut self,
        from: ConnectionId,
        from_identity: Option<String>,
        offer: SessionDescription,
    ) {
        match self.state {
            CallState::Idle => {}

            CallState::Calling if self.is_caller && self.remote == Some(from) => {
                // Both sides called each other. The greater id gives way.
                if !self.local_id.is_some_and(|me| me > from) {
                    debug!("Simultaneous offer from {} ignored, ours wins", from);
                    return;
                }
                info!("Simultaneous offer from {}, abandoning own attempt", from);
                self.cleanup(EndReason::Superseded);
            }

            _ if self.remote == Some(from) => {
                debug!("Repeated offer from {} ignored in state {:?}", from, self.state);
                return;
            }

            _ => {
                info!("Busy, rejecting offer from {}", from);
                self.send(ClientMessage::CallRejected { to: from });
                return;
            }
        }

        let candidates = self.take_early_candidates(&from);
        self.generation = self.generation.next();
        self.remote = Some(from);
        self.is_caller = false;
        self.invite = Some(PendingInvite {
            from,
            from_identity: from_identity.clone(),
            offer,
            candidates,
        });
        info!("Incoming call from {} ({:?})", from, from_identity);

        self.transition(CallState::Incoming);
        self.arm_timeout();
        self.emit(CallEvent::IncomingCall {
            from,
            from_identity,
        });
    }

    fn receive_answer(&mut self, from: ConnectionId, answer: SessionDescription) {
        if self.state != CallState::Calling || !self.is_caller || self.remote != Some(from) {
            debug!("Stale call-answer from {}", from);
            return;
        }
        let Some(negotiation) = self.negotiation.current() else {
            debug!("Call-answer from {} with no active negotiation", from);
            return;
        };

        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let generation = negotiation.generation();
            let outcome = match negotiation.apply_remote_answer(answer).await {
                Ok(()) => AttemptOutcome::AnswerApplied { generation },
                Err(error) => AttemptOutcome::Failed {
                    generation,
                    error,
                    stream: None,
                },
            };
            report(&outcome_tx, outcome);
        });
    }

    fn receive_candidate(&mut self, from: ConnectionId, candidate: IceCandidate) {
        if self.remote != Some(from) {
            if self.state.is_idle() {
                self.hold_early_candidate(from, candidate);
            } else {
                debug!("Candidate from unrelated connection {} dropped", from);
            }
            return;
        }

        if let Some(invite) = self.invite.as_mut() {
            invite.candidates.push(candidate);
            return;
        }

        if let Err(e) = self.negotiation.queue_remote_candidate(candidate) {
            debug!("Candidate from {} with no active negotiation: {}", from, e);
        }
    }

    fn hold_early_candidate(&mut self, from: ConnectionId, candidate: IceCandidate) {
        if self.early_candidates.len() >= self.config.early_candidate_limit {
            self.early_candidates.pop_front();
        }
        debug!("Holding early candidate from {}", from);
        self.early_candidates.push_back((from, candidate));
    }

    fn take_early_candidates(&mut self, from: &ConnectionId) -> Vec<IceCandidate> {
        let (taken, kept) = std::mem::take(&mut self.early_candidates)
            .into_iter()
            .partition::<VecDeque<_>, _>(|(sender, _)| sender == from);
        self.early_candidates = kept;
        taken.into_iter().map(|(_, candidate)| candidate).collect()
    }

    fn forget_early_candidates(&mut self, from: &ConnectionId) {
        self.early_candidates.retain(|(sender, _)| sender != from);
    }

    fn handle_negotiation_event(&mut self, evt: NegotiationEvent) {
        if evt.generation != self.generation {
            debug!(
                "Discarding negotiation event from attempt {} (current {})",
                evt.generation, self.generation
            );
            return;
        }

        match evt.event {
            ContextEvent::LocalCandidate(candidate) => {
                let Some(to) = self.remote else {
                    return;
                };
                self.send(ClientMessage::IceCandidate { to, candidate });
            }

            ContextEvent::RemoteStream(stream) => {
                if !self.state.is_active() {
                    debug!("Remote stream ignored in state {:?}", self.state);
                    return;
                }
                info!("Remote stream {} available", stream.id());
                self.remote_stream = Some(Arc::clone(&stream));
                self.emit(CallEvent::RemoteStream(stream));
                self.publish();
            }
        }
    }

    fn handle_outcome(&mut self, outcome: AttemptOutcome) {
        if outcome.generation() != self.generation {
            debug!(
                "Discarding result of attempt {} (current {})",
                outcome.generation(),
                self.generation
            );
            outcome.discard();
            return;
        }

        match outcome {
            AttemptOutcome::OfferReady { stream, offer, .. } => {
                let Some(to) = self.remote else {
                    stop_stream(stream.as_ref());
                    return;
                };
                self.adopt_local_stream(stream);
                self.send(ClientMessage::CallOffer { to, offer });
                info!("Offer sent to {}", to);
                self.publish();
            }

            AttemptOutcome::AnswerReady { stream, answer, .. } => {
                let Some(to) = self.remote else {
                    stop_stream(stream.as_ref());
                    return;
                };
                self.adopt_local_stream(stream);
                self.send(ClientMessage::CallAnswer { to, answer });
                info!("Answer sent to {}", to);
                self.transition(CallState::InCall);
            }

            AttemptOutcome::AnswerApplied { .. } => {
                info!("Answer applied, call established");
                self.transition(CallState::InCall);
            }

            AttemptOutcome::Failed { error, stream, .. } => {
                warn!("Call attempt {} failed: {}", self.generation, error);
                if let Some(stream) = stream {
                    stop_stream(stream.as_ref());
                }
                self.cleanup(EndReason::NegotiationFailed);
            }

            AttemptOutcome::TimedOut { .. } => self.time_out(),
        }
    }

    fn time_out(&mut self) {
        match (self.state, self.remote) {
            (CallState::Calling, Some(to)) if self.is_caller => {
                info!("No answer from {}, giving up", to);
                self.send(ClientMessage::CallEnded { to });
            }
            (CallState::Incoming, Some(to)) => {
                info!("Invite from {} not answered, rejecting", to);
                self.send(ClientMessage::CallRejected { to });
            }
            _ => return,
        }
        self.cleanup(EndReason::Timeout);
    }

    fn arm_timeout(&self) {
        let Some(timeout) = self.config.call_timeout else {
            return;
        };
        let generation = self.generation;
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = outcome_tx.send(AttemptOutcome::TimedOut { generation });
        });
    }

    fn adopt_local_stream(&mut self, stream: SharedStream) {
        if let Some(previous) = self.local_stream.replace(Arc::clone(&stream)) {
            stop_stream(previous.as_ref());
        }
        self.apply_track_flags();
        self.emit(CallEvent::LocalStream(stream));
    }

    fn apply_track_flags(&self) {
        let Some(stream) = self.local_stream.as_ref() else {
            return;
        };
        set_kind_enabled(stream.as_ref(), TrackKind::Audio, self.mic_enabled);
        set_kind_enabled(stream.as_ref(), TrackKind::Video, self.camera_enabled);
    }

    /// Returns the session to a clean idle state. Running it again changes
    /// nothing.
    fn cleanup(&mut self, reason: EndReason) {
        let was = self.state;
        let held_anything = !was.is_idle()
            || self.local_stream.is_some()
            || self.remote_stream.is_some()
            || self.invite.is_some()
            || self.remote.is_some()
            || self.negotiation.is_active();

        if let Some(stream) = self.local_stream.take() {
            stop_stream(stream.as_ref());
        }
        self.negotiation.release();
        // Not ours to stop.
        self.remote_stream = None;
        self.invite = None;
        self.remote = None;
        self.is_caller = false;
        self.mic_enabled = true;
        self.camera_enabled = true;

        if !held_anything {
            return;
        }

        self.generation = self.generation.next();
        self.transition(CallState::Idle);
        if !was.is_idle() {
            info!("Call ended ({:?})", reason);
            self.emit(CallEvent::Ended { reason });
        }
    }

    fn is_current_remote(&self, from: &ConnectionId) -> bool {
        !self.state.is_idle() && self.remote.as_ref() == Some(from)
    }

    fn transition(&mut self, to: CallState) {
        let from = self.state;
        self.state = to;
        if from != to {
            debug!("Call state {:?} -> {:?}", from, to);
            self.emit(CallEvent::StateChanged { from, to });
        }
        self.publish();
    }

    fn send(&self, message: ClientMessage) {
        let kind = message.kind();
        if !self.signaling.send(message) {
            warn!("Signaling channel closed, {} dropped", kind);
        }
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.event_tx.send(event);
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.cleanup(EndReason::Shutdown);
    }
}

fn report(outcome_tx: &mpsc::UnboundedSender<AttemptOutcome>, outcome: AttemptOutcome) {
    if let Err(mpsc::error::SendError(outcome)) = outcome_tx.send(outcome) {
        outcome.discard();
    }
}
