//! Publisher and subscriber facades
//!
//! Both share the connection contract (`connect`, `disconnect`, `state`,
//! `events`, stats). The publisher adds local tracks and `publish`; the
//! subscriber adds remote tracks, projection and layer selection.

pub mod config;
pub mod publisher;
pub mod subscriber;

pub use config::{BitrateSettings, ClientOptions, DegradationPreference};
pub use publisher::Publisher;
pub use subscriber::{ActiveSource, Subscriber};
