//! Media engine seam
//!
//! Peer connections, codecs and capture live in an external media engine.
//! The session drives it through [`MediaEngine`] and receives its
//! push-based notifications through an [`EngineSink`].

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::client::ClientOptions;
use crate::credentials::Role;
use crate::registry::{MediaFrame, Track, TrackKind};
use crate::stats::StatsReport;

/// Failure reported by the media engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// SDP exchange or transceiver setup failed
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    /// The engine cannot do what was asked in its current configuration
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Notification pushed by the media engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A local capture track or a remote track appeared
    TrackCreated(Track),

    /// A track went away
    TrackRemoved { track_id: String },

    /// Negotiation bound a track to a transceiver
    MidAssigned { track_id: String, mid: String },

    /// A frame is ready for the track's renderers
    Frame(MediaFrame),

    /// A stats sample collected by the engine on its own schedule
    StatsSample(StatsReport),
}

/// Engine event tagged with the media session it was pushed for
#[derive(Debug, Clone)]
pub struct ScopedEvent {
    pub session: u64,
    pub event: EngineEvent,
}

/// Push side of the engine event stream
///
/// Every media session hands the engine its own sink, so events pushed
/// after that session ended can be told apart and dropped. Cheap to clone.
/// Sending never blocks.
#[derive(Debug, Clone)]
pub struct EngineSink {
    tx: mpsc::UnboundedSender<ScopedEvent>,
    session: u64,
}

impl EngineSink {
    /// Create a sink and the receiver the session drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScopedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, session: 0 }, rx)
    }

    /// Sink on the same channel, tagged for media session `session`
    pub fn for_session(&self, session: u64) -> Self {
        Self {
            tx: self.tx.clone(),
            session,
        }
    }

    /// Media session this sink belongs to
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Push an event. Returns false once the session is gone.
    pub fn send(&self, event: EngineEvent) -> bool {
        self.tx
            .send(ScopedEvent {
                session: self.session,
                event,
            })
            .is_ok()
    }

    /// Report a new track
    pub fn track_created(&self, track: Track) -> bool {
        self.send(EngineEvent::TrackCreated(track))
    }

    /// Report a removed track
    pub fn track_removed(&self, track_id: impl Into<String>) -> bool {
        self.send(EngineEvent::TrackRemoved {
            track_id: track_id.into(),
        })
    }

    /// Report a frame
    pub fn frame(&self, frame: MediaFrame) -> bool {
        self.send(EngineEvent::Frame(frame))
    }
}

/// Media engine driven by a session
#[async_trait]
pub trait MediaEngine: Send + Sync + 'static {
    /// Negotiate and start the media session for `role`
    ///
    /// `local_tracks` are the capture tracks to send. They are empty when
    /// subscribing.
    async fn start(
        &self,
        role: Role,
        options: &ClientOptions,
        local_tracks: &[Track],
        sink: EngineSink,
    ) -> Result<(), EngineError>;

    /// Stop the media session. Must be safe to call when not started.
    async fn stop(&self);

    /// Add a receive transceiver and renegotiate. Returns its mid.
    async fn add_remote_track(&self, kind: TrackKind) -> Result<String, EngineError>;

    /// Start capturing and sending a local track in the running session.
    /// May arrive while `start` is still in flight.
    fn add_local_track(&self, track: &Track);

    /// Stop capturing and sending a local track
    fn remove_local_track(&self, track_id: &str);

    /// Switch a track between live media and silence/blank frames
    fn set_track_enabled(&self, track_id: &str, enabled: bool);

    /// Collect a stats report, if the session is running
    async fn collect_stats(&self) -> Option<StatsReport>;
}
