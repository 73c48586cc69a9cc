use crate::capability::{MediaStream, MediaTrack, TrackKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

/// A track received from the peer. Reading RTP from it is up to the
/// consumer.
pub struct RemoteTrack {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    track: Arc<TrackRemote>,
}

impl RemoteTrack {
    pub fn new(track: Arc<TrackRemote>) -> Self {
        let kind = match track.kind() {
            RTPCodecType::Video => TrackKind::Video,
            _ => TrackKind::Audio,
        };
        Self {
            id: track.id(),
            kind,
            enabled: AtomicBool::new(true),
            track,
        }
    }

    pub fn rtp_track(&self) -> Arc<TrackRemote> {
        Arc::clone(&self.track)
    }
}

impl std::fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl MediaTrack for RemoteTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    // The sender owns the source.
    fn stop(&self) {}
}

/// Remote tracks grouped by the stream id the peer announced.
#[derive(Debug)]
pub struct RemoteStream {
    id: String,
    tracks: Mutex<Vec<Arc<RemoteTrack>>>,
}

impl RemoteStream {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tracks: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, track: Arc<RemoteTrack>) {
        if let Ok(mut tracks) = self.tracks.lock() {
            tracks.push(track);
        }
    }
}

impl MediaStream for RemoteStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        match self.tracks.lock() {
            Ok(tracks) => tracks
                .iter()
                .map(|t| Arc::clone(t) as Arc<dyn MediaTrack>)
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}
