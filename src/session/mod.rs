//! Session plumbing shared by the publisher and subscriber
//!
//! - `events`: application events and their fan-out
//! - `queue`: single-flight command queue
//! - `pump`: task feeding server/engine events to a facade
//! - `context`: media session lifecycle and registry access

pub mod context;
pub mod events;
pub mod pump;
pub mod queue;

pub use context::SessionContext;
pub use events::{EventBus, SessionEvent};
pub use pump::{EventHandler, PumpInputs};
pub use queue::CommandQueue;
