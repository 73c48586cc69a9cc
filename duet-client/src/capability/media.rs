use crate::error::NegotiationError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// What the session asks the media capability for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// A single local or remote media track.
pub trait MediaTrack: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Releases the underlying device. Only ever called on streams the
    /// session acquired itself.
    fn stop(&self);
}

pub trait MediaStream: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;
}

pub type SharedStream = Arc<dyn MediaStream>;

/// Local capture devices (camera and microphone).
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire(&self, constraints: MediaConstraints)
    -> Result<SharedStream, NegotiationError>;
}

/// Stops every track of a stream the session owns.
pub fn stop_stream(stream: &dyn MediaStream) {
    for track in stream.tracks() {
        track.stop();
    }
}

/// Applies an enabled flag to the tracks of one kind. Returns how many
/// tracks were touched.
pub fn set_kind_enabled(stream: &dyn MediaStream, kind: TrackKind, enabled: bool) -> usize {
    let mut touched = 0;
    for track in stream.tracks().into_iter().filter(|t| t.kind() == kind) {
        track.set_enabled(enabled);
        touched += 1;
    }
    touched
}
