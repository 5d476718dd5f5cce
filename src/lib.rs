//! # rts-session
//!
//! Session and track-negotiation core for real-time streaming clients.
//!
//! A [`Publisher`](client::Publisher) sends local tracks to a stream; a
//! [`Subscriber`](client::Subscriber) receives remote tracks, projects
//! sources onto transceivers and picks simulcast/SVC layers. The signaling
//! channel and the media engine are supplied by the application through
//! [`SignalingTransport`](transport::SignalingTransport) and
//! [`MediaEngine`](transport::MediaEngine).
//!
//! # Components
//!
//! - `connection`: signaling lifecycle and auto-reconnect
//! - `registry`: tracks, renderers and frame fan-out
//! - `layers`: projection, layer selection, quality ladder
//! - `stats`: periodic stats collection and summaries
//! - `session`: events, command queue, event pump
//! - `client`: publisher and subscriber facades
//! - `runtime`: process-wide setup and teardown
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rts_session::client::ClientOptions;
//! use rts_session::credentials::Credentials;
//! use rts_session::runtime::{EngineBinding, Runtime};
//!
//! # async fn example(binding: Arc<dyn EngineBinding>) -> rts_session::error::Result<()> {
//! let runtime = Runtime::init(binding);
//! let subscriber = runtime.subscriber()?;
//!
//! subscriber
//!     .connect(Credentials::subscriber("my-stream", "account", "https://director.example.com"))
//!     .await?;
//! subscriber.subscribe(ClientOptions::default()).await?;
//!
//! // ... attach renderers, project sources ...
//!
//! subscriber.unsubscribe().await?;
//! runtime.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod layers;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod state;
pub mod stats;
pub mod transport;

pub use client::{ClientOptions, Publisher, Subscriber};
pub use credentials::{Credentials, Role};
pub use error::{Error, ErrorKind, Result};
pub use runtime::Runtime;
pub use session::SessionEvent;
