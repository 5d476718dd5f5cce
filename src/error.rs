//! Error types
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are
//! grouped into a small taxonomy ([`ErrorKind`]) that tells the caller how
//! to react: fix the input, retry, re-issue, or tear the session down.

use thiserror::Error;

use crate::connection::ConnectionState;
use crate::registry::TrackKind;

/// Status code reported when no protocol-level code applies.
pub const NO_STATUS: i32 = -1;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing credentials/options. Fatal, never retried.
    Validation,
    /// Signaling failure. Retried by the reconnect policy, then surfaced.
    Connection,
    /// Media renegotiation failure. The caller must re-issue.
    Negotiation,
    /// Operation invalid for the current state.
    State,
    /// Superseded or aborted operation.
    Cancelled,
    /// Unexpected fault. The session should be considered unreliable.
    Internal,
}

/// Credential or option validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid api url: {0}")]
    InvalidUrl(String),

    #[error("invalid option {field}: {reason}")]
    InvalidOption { field: &'static str, reason: String },

    #[error("empty projection list")]
    EmptyProjection,

    #[error("duplicate mid in request: {0}")]
    DuplicateMid(String),
}

/// Main error type for session operations
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("connection error ({status}): {reason}")]
    Connection { status: i32, reason: String },

    #[error("negotiation error: {0}")]
    Negotiation(String),

    #[error("invalid state: {operation} not allowed while {state:?}")]
    State {
        operation: &'static str,
        state: ConnectionState,
    },

    #[error("{0}")]
    InvalidState(&'static str),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("duplicate track: {0}")]
    DuplicateTrack(String),

    #[error("track not found: {0}")]
    TrackNotFound(String),

    #[error("operation not supported on {kind:?} track {id}")]
    InvalidTrackKind { id: String, kind: TrackKind },

    #[error("track {id} already has mid {mid} for this negotiation round")]
    MidAlreadyAssigned { id: String, mid: String },

    #[error("layer is not active: {0}")]
    InvalidLayer(String),

    #[error("layer has not been advertised yet: {0}")]
    LayerUnavailable(String),
}

impl Error {
    /// Create a connection error without a protocol status code
    pub fn connection(reason: impl Into<String>) -> Self {
        Error::Connection {
            status: NO_STATUS,
            reason: reason.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Negotiation(_) => ErrorKind::Negotiation,
            Error::State { .. } | Error::InvalidState(_) => ErrorKind::State,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Internal(_) => ErrorKind::Internal,
            Error::DuplicateTrack(_)
            | Error::TrackNotFound(_)
            | Error::InvalidTrackKind { .. }
            | Error::MidAlreadyAssigned { .. }
            | Error::InvalidLayer(_) => ErrorKind::Validation,
            Error::LayerUnavailable(_) => ErrorKind::State,
        }
    }

    /// Whether the same call may succeed if issued again later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connection { .. } | Error::LayerUnavailable(_))
    }

    /// Whether the session should be torn down after this error
    pub fn is_fatal_to_session(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}
