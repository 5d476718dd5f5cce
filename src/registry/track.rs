//! Track descriptor

use super::frame::TrackKind;

/// An audio or video track known to the session
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Unique track ID
    pub id: String,
    /// Audio or video
    pub kind: TrackKind,
    /// Disabled tracks deliver silence or blank frames
    pub enabled: bool,
    /// Transceiver mid, once negotiated
    pub mid: Option<String>,
    /// Publishing source the track belongs to (multi-source streams)
    pub source_id: Option<String>,
    /// Playback volume, audio only
    pub volume: f64,
}

impl Track {
    /// Create an enabled track
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            kind,
            enabled: true,
            mid: None,
            source_id: None,
            volume: 1.0,
        }
    }

    /// Create an audio track
    pub fn audio(id: impl Into<String>) -> Self {
        Self::new(id, TrackKind::Audio)
    }

    /// Create a video track
    pub fn video(id: impl Into<String>) -> Self {
        Self::new(id, TrackKind::Video)
    }

    /// Set the mid
    pub fn with_mid(mut self, mid: impl Into<String>) -> Self {
        self.mid = Some(mid.into());
        self
    }

    /// Set the source ID
    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn is_audio(&self) -> bool {
        self.kind == TrackKind::Audio
    }

    pub fn is_video(&self) -> bool {
        self.kind == TrackKind::Video
    }
}
