//! Signaling channel seam
//!
//! The WebSocket-style channel to the media server lives outside this crate.
//! [`SignalingTransport`] is the contract the connection manager and the
//! layer controller drive it through.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::credentials::{Credentials, Role};
use crate::error::NO_STATUS;
use crate::layers::{LayerDescriptor, ProjectionRequest};

/// Failure reported by the signaling transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Network-level failure (DNS, socket, timeout). Retried.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The director or media server refused the connection. Not retried.
    #[error("rejected ({status}): {reason}")]
    Rejected { status: i32, reason: String },

    /// The server answered a command with an error
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// The channel is not open
    #[error("channel closed")]
    Closed,
}

impl TransportError {
    /// Whether the reconnect policy should retry after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Unreachable(_) | TransportError::Closed)
    }

    /// Protocol status code, or [`NO_STATUS`]
    pub fn status(&self) -> i32 {
        match self {
            TransportError::Rejected { status, .. } => *status,
            _ => NO_STATUS,
        }
    }

    /// Human-readable reason
    pub fn reason(&self) -> String {
        match self {
            TransportError::Unreachable(reason)
            | TransportError::Rejected { reason, .. }
            | TransportError::CommandRejected(reason) => reason.clone(),
            TransportError::Closed => "channel closed".into(),
        }
    }
}

/// Command sent to the server over an open channel
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingCommand {
    /// Bind a source's tracks onto local transceivers
    Project {
        source_id: String,
        mapping: Vec<ProjectionRequest>,
    },
    /// Release transceivers from their projections
    Unproject { mids: Vec<String> },
    /// Pin a simulcast/SVC layer, or `None` for automatic selection
    Select { layer: Option<LayerDescriptor> },
}

impl SignalingCommand {
    /// Command name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SignalingCommand::Project { .. } => "project",
            SignalingCommand::Unproject { .. } => "unproject",
            SignalingCommand::Select { .. } => "select",
        }
    }
}

/// Event pushed by the server over an open channel
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// The server closed the channel
    Closed { status: i32, reason: String },

    /// Simulcast/SVC layer availability for a transceiver
    Layers {
        mid: String,
        active: Vec<LayerDescriptor>,
        inactive: Vec<LayerDescriptor>,
    },

    /// A source started publishing within the stream
    SourceActive {
        stream_id: String,
        source_id: Option<String>,
        track_ids: Vec<String>,
    },

    /// A source stopped publishing within the stream
    SourceInactive {
        stream_id: String,
        source_id: Option<String>,
    },

    /// A source is being multiplexed into an audio transceiver
    Vad {
        mid: String,
        source_id: Option<String>,
    },

    /// Viewer count changed
    ViewerCount(u32),

    /// First viewer joined (publisher side)
    ViewersActive,

    /// Last viewer left (publisher side)
    ViewersInactive,

    /// The stream was stopped by the server
    Stopped,

    /// Error message in response to a command, or unsolicited
    Error(String),
}

/// Signaling channel to the media server
///
/// `open` returns the receiving side of the server event stream. The stream
/// ending without a [`ServerEvent::Closed`] counts as an unexpected drop.
#[async_trait]
pub trait SignalingTransport: Send + Sync + 'static {
    /// Resolve the endpoint and open the channel
    async fn open(
        &self,
        credentials: &Credentials,
        role: Role,
    ) -> Result<mpsc::Receiver<ServerEvent>, TransportError>;

    /// Send a command and wait for the server's verdict
    async fn request(&self, command: SignalingCommand) -> Result<(), TransportError>;

    /// Close the channel. Must be safe to call when already closed.
    async fn close(&self);
}
