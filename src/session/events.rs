//! Application-facing events
//!
//! Events are fanned out to every subscriber through unbounded channels, so
//! emitting never blocks the emitting task. Delivery order is preserved per
//! subscriber; unrelated event kinds may interleave arbitrarily.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::connection::ConnectionState;
use crate::layers::LayerDescriptor;
use crate::registry::TrackKind;
use crate::stats::StatsReport;

/// Event delivered to the application
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Connection state changed
    StateChanged(ConnectionState),
    /// Signaling handshake completed (once per successful handshake)
    Connected,
    /// Signaling channel closed
    Disconnected,
    /// Reconnect attempt starting
    Reconnecting { attempt: u32 },
    /// Connecting failed for good
    ConnectionError { status: i32, reason: String },
    /// Server reported an error outside any pending call
    SignalingError(String),

    /// Media is flowing to the server
    Publishing,
    /// Publishing could not be established
    PublishingError(String),
    /// First viewer joined
    ViewersActive,
    /// Last viewer left
    ViewersInactive,
    /// Viewer count changed
    ViewerCount(u32),

    /// Subscription established
    Subscribed,
    /// Subscription could not be established
    SubscribedError(String),
    /// A source started publishing
    SourceActive {
        stream_id: String,
        source_id: Option<String>,
        track_ids: Vec<String>,
    },
    /// A source stopped publishing
    SourceInactive {
        stream_id: String,
        source_id: Option<String>,
    },
    /// A source is multiplexed into an audio transceiver
    Vad {
        mid: String,
        source_id: Option<String>,
    },
    /// Layer availability changed for a transceiver
    Layers {
        mid: String,
        active: Vec<LayerDescriptor>,
        inactive: Vec<LayerDescriptor>,
    },
    /// A pinned layer went inactive; selection is automatic again
    LayerPinCleared(LayerDescriptor),
    /// Server stopped the stream
    StreamStopped,

    /// A track was registered
    TrackAdded {
        track_id: String,
        kind: TrackKind,
        mid: Option<String>,
    },
    /// A track was removed
    TrackRemoved { track_id: String },

    /// A new stats snapshot is available
    StatsReport(Arc<StatsReport>),
}

/// Subscription registry for [`SessionEvent`]s
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver an event to every live subscriber, pruning closed ones
    pub fn emit(&self, event: SessionEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}
