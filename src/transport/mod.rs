//! Seams to the external collaborators
//!
//! The signaling channel and the media engine are provided by the
//! application. Everything in this crate talks to them through these traits.

pub mod engine;
pub mod signaling;

#[cfg(test)]
pub(crate) mod mock;

pub use engine::{EngineError, EngineEvent, EngineSink, MediaEngine, ScopedEvent};
pub use signaling::{ServerEvent, SignalingCommand, SignalingTransport, TransportError};
