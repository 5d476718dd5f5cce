//! Track registry and renderer fan-out
//!
//! The registry holds the authoritative set of tracks for a session and the
//! renderers attached to each of them.
//!
//! # Architecture
//!
//! ```text
//!        MediaEngine                 Mutex<MediaState>
//!   EngineEvent::Frame ──► ┌──────────────────────────────┐
//!                          │ tracks: HashMap<Id,          │
//!                          │   TrackEntry {               │
//!                          │     track, renderers: [Arc], │
//!                          │   }                          │
//!                          │ >                            │
//!                          └──────────────┬───────────────┘
//!                         prepare_dispatch│ (lock held)
//!                                         ▼
//!                                     Dispatch ──deliver()──► Renderer, Renderer, ...
//!                                              (lock released)
//! ```
//!
//! Payloads are `bytes::Bytes`, so every renderer shares one allocation.

pub mod entry;
pub mod frame;
pub mod renderer;
pub mod store;
pub mod track;

pub use entry::{Dispatch, TrackStats};
pub use frame::{MediaFrame, TrackKind};
pub use renderer::{ChannelRenderer, Renderer};
pub use store::TrackRegistry;
pub use track::Track;
