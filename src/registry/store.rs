//! Track registry implementation
//!
//! Authoritative set of tracks for one session. The registry itself is
//! plain data; sessions keep it inside the shared [`MediaState`] lock
//! together with the stats snapshot.
//!
//! [`MediaState`]: crate::state::MediaState

use std::collections::HashMap;
use std::sync::Arc;

use super::entry::{Dispatch, TrackEntry, TrackStats};
use super::frame::{MediaFrame, TrackKind};
use super::renderer::Renderer;
use super::track::Track;
use crate::error::{Error, Result};

/// Registry of the tracks attached to a session
#[derive(Default)]
pub struct TrackRegistry {
    /// Map of track ID to entry
    tracks: HashMap<String, TrackEntry>,

    /// Current negotiation round
    round: u64,
}

impl TrackRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a track. Fails with `DuplicateTrack` if the ID is taken.
    pub fn add_track(&mut self, track: Track) -> Result<()> {
        if self.tracks.contains_key(&track.id) {
            return Err(Error::DuplicateTrack(track.id));
        }

        tracing::debug!(
            track = %track.id,
            kind = %track.kind,
            mid = ?track.mid,
            "Track added"
        );
        self.tracks
            .insert(track.id.clone(), TrackEntry::new(track, self.round));
        Ok(())
    }

    /// Remove a track and all its renderer bindings
    pub fn remove_track(&mut self, track_id: &str) -> Result<Track> {
        let entry = self
            .tracks
            .remove(track_id)
            .ok_or_else(|| Error::TrackNotFound(track_id.to_string()))?;

        tracing::debug!(
            track = %track_id,
            renderers = entry.renderer_count(),
            "Track removed"
        );
        Ok(entry.track)
    }

    /// Enable or disable a track. Returns true if the flag changed.
    ///
    /// Renderer bindings are kept either way.
    pub fn enable(&mut self, track_id: &str, enabled: bool) -> Result<bool> {
        let entry = self.entry_mut(track_id)?;
        let changed = entry.track.enabled != enabled;
        entry.track.enabled = enabled;
        Ok(changed)
    }

    /// Attach a renderer to a track
    pub fn add_renderer(&mut self, track_id: &str, renderer: Arc<dyn Renderer>) -> Result<()> {
        let entry = self.entry_mut(track_id)?;
        if entry.attach(renderer) {
            tracing::debug!(track = %track_id, renderers = entry.renderer_count(), "Renderer attached");
        }
        Ok(())
    }

    /// Detach a renderer. Returns true if it was attached.
    pub fn remove_renderer(&mut self, track_id: &str, renderer: &Arc<dyn Renderer>) -> Result<bool> {
        let entry = self.entry_mut(track_id)?;
        let removed = entry.detach(renderer);
        if removed {
            tracing::debug!(track = %track_id, renderers = entry.renderer_count(), "Renderer detached");
        }
        Ok(removed)
    }

    /// Set the playback volume of an audio track, clamped to 0.0..=1.0
    pub fn set_volume(&mut self, track_id: &str, volume: f64) -> Result<()> {
        let entry = self.entry_mut(track_id)?;
        if entry.track.kind != TrackKind::Audio {
            return Err(Error::InvalidTrackKind {
                id: track_id.to_string(),
                kind: entry.track.kind,
            });
        }
        entry.track.volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        Ok(())
    }

    /// Bind a track to a transceiver mid.
    ///
    /// A mid is assigned at most once per negotiation round. Re-assigning the
    /// same value is accepted.
    pub fn assign_mid(&mut self, track_id: &str, mid: impl Into<String>) -> Result<()> {
        let mid = mid.into();
        let round = self.round;
        let entry = self.entry_mut(track_id)?;

        if let (Some(current), Some(assigned_in)) = (&entry.track.mid, entry.mid_round) {
            if assigned_in == round && *current != mid {
                return Err(Error::MidAlreadyAssigned {
                    id: track_id.to_string(),
                    mid: current.clone(),
                });
            }
        }

        entry.track.mid = Some(mid);
        entry.mid_round = Some(round);
        Ok(())
    }

    /// Start a new negotiation round, allowing mids to change
    pub fn begin_renegotiation(&mut self) -> u64 {
        self.round += 1;
        tracing::debug!(round = self.round, "Renegotiation round started");
        self.round
    }

    /// Current negotiation round
    pub fn negotiation_round(&self) -> u64 {
        self.round
    }

    /// Mid of a track, if negotiated
    pub fn mid_of(&self, track_id: &str) -> Option<&str> {
        self.tracks.get(track_id)?.track.mid.as_deref()
    }

    /// Find the track bound to a mid
    pub fn track_by_mid(&self, mid: &str) -> Option<&Track> {
        self.tracks
            .values()
            .map(|entry| &entry.track)
            .find(|track| track.mid.as_deref() == Some(mid))
    }

    /// Get a track by ID
    pub fn get(&self, track_id: &str) -> Option<&Track> {
        self.tracks.get(track_id).map(|entry| &entry.track)
    }

    /// All tracks, in no particular order
    pub fn tracks(&self) -> Vec<Track> {
        self.tracks.values().map(|entry| entry.track.clone()).collect()
    }

    /// Counters for a track
    pub fn track_stats(&self, track_id: &str) -> Option<TrackStats> {
        self.tracks.get(track_id).map(TrackEntry::stats)
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Remove every track, returning them
    pub fn clear(&mut self) -> Vec<Track> {
        self.tracks.drain().map(|(_, entry)| entry.track).collect()
    }

    /// Snapshot the renderers for a frame.
    ///
    /// Call under the lock, then [`Dispatch::deliver`] after releasing it.
    pub fn prepare_dispatch(&mut self, frame: MediaFrame) -> Result<Dispatch> {
        let entry = self.entry_mut(&frame.track_id)?;
        Ok(entry.prepare(frame))
    }

    fn entry_mut(&mut self, track_id: &str) -> Result<&mut TrackEntry> {
        self.tracks
            .get_mut(track_id)
            .ok_or_else(|| Error::TrackNotFound(track_id.to_string()))
    }
}
