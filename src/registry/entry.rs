//! Per-track registry entry

use std::sync::Arc;

use super::frame::MediaFrame;
use super::renderer::{same_renderer, Renderer};
use super::track::Track;

/// Entry for a single track in the registry
pub struct TrackEntry {
    /// Track descriptor
    pub track: Track,

    /// Attached renderers
    pub(super) renderers: Vec<Arc<dyn Renderer>>,

    /// Negotiation round in which the mid was assigned
    pub(super) mid_round: Option<u64>,

    /// Frames handed to renderers
    pub frames_dispatched: u64,

    /// Frames replaced by silence/blank while disabled
    pub frames_blanked: u64,
}

impl TrackEntry {
    pub(super) fn new(track: Track, round: u64) -> Self {
        let mid_round = track.mid.as_ref().map(|_| round);
        Self {
            track,
            renderers: Vec::new(),
            mid_round,
            frames_dispatched: 0,
            frames_blanked: 0,
        }
    }

    /// Number of attached renderers
    pub fn renderer_count(&self) -> usize {
        self.renderers.len()
    }

    /// Attach a renderer. Attaching the same handle twice is a no-op.
    pub(super) fn attach(&mut self, renderer: Arc<dyn Renderer>) -> bool {
        if self.renderers.iter().any(|r| same_renderer(r, &renderer)) {
            return false;
        }
        self.renderers.push(renderer);
        true
    }

    /// Detach a renderer by identity
    pub(super) fn detach(&mut self, renderer: &Arc<dyn Renderer>) -> bool {
        let before = self.renderers.len();
        self.renderers.retain(|r| !same_renderer(r, renderer));
        self.renderers.len() != before
    }

    /// Build the frame each renderer should see and snapshot the renderer list
    pub(super) fn prepare(&mut self, frame: MediaFrame) -> Dispatch {
        let frame = if self.track.enabled {
            frame
        } else {
            self.frames_blanked += 1;
            frame.blanked()
        };
        self.frames_dispatched += 1;

        Dispatch {
            frame,
            renderers: self.renderers.clone(),
        }
    }

    /// Snapshot of entry counters
    pub fn stats(&self) -> TrackStats {
        TrackStats {
            renderer_count: self.renderers.len(),
            enabled: self.track.enabled,
            frames_dispatched: self.frames_dispatched,
            frames_blanked: self.frames_blanked,
        }
    }
}

/// A frame bound to the renderers attached when dispatch began
///
/// Built under the registry lock and delivered after it is released, so a
/// renderer removed before dispatch never sees the frame and renderers are
/// never invoked with the lock held.
pub struct Dispatch {
    pub frame: MediaFrame,
    renderers: Vec<Arc<dyn Renderer>>,
}

impl Dispatch {
    /// Hand the frame to every renderer. Returns how many were called.
    pub fn deliver(self) -> usize {
        for renderer in &self.renderers {
            renderer.render(&self.frame);
        }
        self.renderers.len()
    }
}

/// Counters for a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackStats {
    /// Attached renderers
    pub renderer_count: usize,
    /// Whether the track is enabled
    pub enabled: bool,
    /// Frames handed to renderers
    pub frames_dispatched: u64,
    /// Frames substituted while disabled
    pub frames_blanked: u64,
}
