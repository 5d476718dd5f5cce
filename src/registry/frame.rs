//! Track kinds and media frames
//!
//! Frames carry their payload as `Bytes`, so fanning one frame out to
//! several renderers only bumps a reference count.

use bytes::Bytes;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    /// Wire name ("audio" / "video")
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded or captured frame on its way to renderers
#[derive(Debug, Clone)]
pub struct MediaFrame {
    /// Track the frame belongs to
    pub track_id: String,
    /// Kind of frame
    pub kind: TrackKind,
    /// Presentation timestamp in microseconds
    pub timestamp_us: u64,
    /// Frame payload (PCM samples or pixel data)
    pub data: Bytes,
    /// Video only: frame dimensions
    pub dimensions: Option<(u32, u32)>,
    /// Payload was replaced because the track is disabled
    pub blank: bool,
}

impl MediaFrame {
    /// Create an audio frame
    pub fn audio(track_id: impl Into<String>, timestamp_us: u64, data: Bytes) -> Self {
        Self {
            track_id: track_id.into(),
            kind: TrackKind::Audio,
            timestamp_us,
            data,
            dimensions: None,
            blank: false,
        }
    }

    /// Create a video frame
    pub fn video(
        track_id: impl Into<String>,
        timestamp_us: u64,
        width: u32,
        height: u32,
        data: Bytes,
    ) -> Self {
        Self {
            track_id: track_id.into(),
            kind: TrackKind::Video,
            timestamp_us,
            data,
            dimensions: Some((width, height)),
            blank: false,
        }
    }

    /// Silence (audio) or a blank picture (video) with the same shape as `self`
    pub fn blanked(&self) -> Self {
        Self {
            track_id: self.track_id.clone(),
            kind: self.kind,
            timestamp_us: self.timestamp_us,
            data: Bytes::from(vec![0u8; self.data.len()]),
            dimensions: self.dimensions,
            blank: true,
        }
    }
}
