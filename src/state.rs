//! Mutable media state shared by a session's tasks

use std::sync::Arc;

use parking_lot::Mutex;

use crate::registry::TrackRegistry;
use crate::stats::StatsReport;

/// Track registry and latest stats snapshot, guarded by one lock
///
/// The pump task, the stats collector and the facade all take this lock
/// briefly; nothing awaits while holding it.
#[derive(Default)]
pub struct MediaState {
    /// Tracks of the session
    pub tracks: TrackRegistry,

    /// Most recent stats report
    pub stats: Option<Arc<StatsReport>>,
}

impl MediaState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Handle to a session's [`MediaState`]
pub type SharedState = Arc<Mutex<MediaState>>;

/// Create an empty shared state
pub fn shared() -> SharedState {
    Arc::new(Mutex::new(MediaState::new()))
}
