use crate::capability::{MediaTrack, NegotiationContext, NegotiationFactory, TrackKind};
use crate::error::NegotiationError;
use crate::negotiation::ContextEventSink;
use crate::rtc::{RemoteStream, RemoteTrack};
use async_trait::async_trait;
use duet_core::{IceCandidate, IceServerConfig, SdpType, SessionDescription};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Creates negotiation contexts backed by native `webrtc` peer connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtcNegotiationFactory;

#[async_trait]
impl NegotiationFactory for RtcNegotiationFactory {
    async fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: ContextEventSink,
    ) -> Result<Arc<dyn NegotiationContext>, NegotiationError> {
        let context = RtcNegotiationContext::new(ice_servers, events).await?;
        Ok(Arc::new(context) as Arc<dyn NegotiationContext>)
    }
}

/// One native peer connection. Local tracks are sample-fed: whoever
/// captures media writes into the track returned by `local_track`.
pub struct RtcNegotiationContext {
    peer_connection: Arc<RTCPeerConnection>,
    local_tracks: Mutex<HashMap<String, Arc<TrackLocalStaticSample>>>,
    closed: AtomicBool,
}

impl RtcNegotiationContext {
    pub async fn new(
        ice_servers: &[IceServerConfig],
        events: ContextEventSink,
    ) -> Result<Self, NegotiationError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs().map_err(backend)?;
        let registry =
            register_default_interceptors(Registry::new(), &mut media_engine).map_err(backend)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection =
            Arc::new(api.new_peer_connection(rtc_config).await.map_err(backend)?);
        let generation = events.generation();

        peer_connection.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                Box::pin(async move {
                    info!("Peer connection of attempt {} is {:?}", generation, state);
                })
            },
        ));

        let candidate_events = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let events = candidate_events.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                match candidate.to_json() {
                    Ok(init) => events.local_candidate(from_rtc_candidate(init)),
                    Err(e) => warn!("Failed to serialize local candidate: {}", e),
                }
            })
        }));

        let streams: Arc<Mutex<HashMap<String, Arc<RemoteStream>>>> = Arc::default();
        let track_events = events;
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let events = track_events.clone();
            let streams = Arc::clone(&streams);
            Box::pin(async move {
                let stream_id = track.stream_id();
                debug!("Remote track {} on stream {}", track.id(), stream_id);

                let stream = match streams.lock() {
                    Ok(mut streams) => Arc::clone(
                        streams
                            .entry(stream_id.clone())
                            .or_insert_with(|| Arc::new(RemoteStream::new(stream_id))),
                    ),
                    Err(_) => return,
                };
                stream.push(Arc::new(RemoteTrack::new(track)));
                events.remote_stream(stream);
            })
        }));

        Ok(Self {
            peer_connection,
            local_tracks: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// The outgoing RTP track created for a local media track.
    pub fn local_track(&self, track_id: &str) -> Option<Arc<TrackLocalStaticSample>> {
        self.local_tracks
            .lock()
            .ok()
            .and_then(|tracks| tracks.get(track_id).cloned())
    }

    pub fn peer_connection(&self) -> Arc<RTCPeerConnection> {
        Arc::clone(&self.peer_connection)
    }

    fn ensure_open(&self) -> Result<(), NegotiationError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(NegotiationError::ContextClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl NegotiationContext for RtcNegotiationContext {
    async fn sender_track_ids(&self) -> Vec<String> {
        match self.local_tracks.lock() {
            Ok(tracks) => tracks.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn add_track(
        &self,
        track: Arc<dyn MediaTrack>,
        stream_id: &str,
    ) -> Result<(), NegotiationError> {
        self.ensure_open()?;

        let local = Arc::new(TrackLocalStaticSample::new(
            codec_for(track.kind()),
            track.id().to_owned(),
            stream_id.to_owned(),
        ));
        let sender = self
            .peer_connection
            .add_track(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(backend)?;

        // RTCP has to be drained for the interceptors to run.
        tokio::spawn(async move {
            let mut rtcp_buf = vec![0u8; 1500];
            while sender.read(&mut rtcp_buf).await.is_ok() {}
        });

        if let Ok(mut tracks) = self.local_tracks.lock() {
            tracks.insert(track.id().to_owned(), local);
        }
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        self.ensure_open()?;
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(description_error)?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        self.ensure_open()?;
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(description_error)?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        self.peer_connection
            .set_local_description(to_rtc_description(description)?)
            .await
            .map_err(description_error)
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        self.peer_connection
            .set_remote_description(to_rtc_description(description)?)
            .await
            .map_err(description_error)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        self.peer_connection
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await
            .map_err(|e| NegotiationError::Candidate(e.to_string()))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.peer_connection.close().await {
            warn!("Failed to close peer connection: {}", e);
        }
    }
}

fn codec_for(kind: TrackKind) -> RTCRtpCodecCapability {
    match kind {
        TrackKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        TrackKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
    }
}

fn to_rtc_description(
    description: SessionDescription,
) -> Result<RTCSessionDescription, NegotiationError> {
    let result = match description.kind {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp),
        SdpType::Answer => RTCSessionDescription::answer(description.sdp),
    };
    result.map_err(description_error)
}

fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn description_error(e: webrtc::Error) -> NegotiationError {
    NegotiationError::Description(e.to_string())
}

fn backend(e: webrtc::Error) -> NegotiationError {
    NegotiationError::Backend(e.into())
}
