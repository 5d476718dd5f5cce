//! Stream publisher
//!
//! High-level API for publishing local capture tracks to a stream.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use super::config::ClientOptions;
use crate::connection::{ConnectionOptions, ConnectionState};
use crate::credentials::{Credentials, Role};
use crate::error::Result;
use crate::registry::Track;
use crate::session::{pump, EventHandler, SessionContext, SessionEvent};
use crate::stats::{Stats, StatsKind, StatsReport, StreamStatistics};
use crate::transport::{MediaEngine, ScopedEvent, ServerEvent, SignalingTransport};

/// Stream publisher
///
/// # Example
/// ```no_run
/// use rts_session::client::{ClientOptions, Publisher};
/// use rts_session::credentials::Credentials;
/// use rts_session::registry::Track;
/// # use std::sync::Arc;
/// # use rts_session::transport::{MediaEngine, SignalingTransport};
///
/// # async fn example(
/// #     transport: Arc<dyn SignalingTransport>,
/// #     engine: Arc<dyn MediaEngine>,
/// # ) -> rts_session::error::Result<()> {
/// let publisher = Publisher::new(transport, engine);
/// let mut events = publisher.events();
///
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("Event: {:?}", event);
///     }
/// });
///
/// publisher.add_track(Track::audio("mic"))?;
/// publisher
///     .connect(Credentials::publisher("my-stream", "token", "https://director.example.com"))
///     .await?;
/// publisher.publish(ClientOptions::default().video_codec("VP8")).await?;
/// # Ok(())
/// # }
/// ```
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    session: Arc<SessionContext>,
}

impl Publisher {
    /// Create a publisher over the given transport and engine
    pub fn new(transport: Arc<dyn SignalingTransport>, engine: Arc<dyn MediaEngine>) -> Self {
        let (session, inputs) = SessionContext::new(Role::Publisher, transport, engine);
        let inner = Arc::new(PublisherInner {
            session: Arc::clone(&session),
        });
        pump::spawn(Arc::downgrade(&inner), inputs, session.pump_cancel());
        Self { inner }
    }

    fn session(&self) -> &Arc<SessionContext> {
        &self.inner.session
    }

    /// Subscribe to session events
    pub fn events(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.session().subscribe_events()
    }

    /// Connect with default connection options
    pub async fn connect(&self, credentials: Credentials) -> Result<()> {
        self.connect_with(credentials, ConnectionOptions::default())
            .await
    }

    /// Connect with explicit connection options
    pub async fn connect_with(
        &self,
        credentials: Credentials,
        options: ConnectionOptions,
    ) -> Result<()> {
        self.session().connect(credentials, options).await
    }

    /// Stop publishing if needed and close the signaling channel
    pub async fn disconnect(&self) -> Result<()> {
        self.session().disconnect().await
    }

    pub fn is_connected(&self) -> bool {
        self.session().is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.session().connection_state()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.session().watch_state()
    }

    /// Start publishing the registered tracks.
    ///
    /// Tracks added or removed while publishing are passed on to the engine.
    pub async fn publish(&self, options: ClientOptions) -> Result<()> {
        let session = Arc::clone(self.session());
        self.session().queue.run(session.start_media(options)).await
    }

    /// Stop publishing. Also disconnects.
    pub async fn unpublish(&self) -> Result<()> {
        self.disconnect().await
    }

    pub fn is_publishing(&self) -> bool {
        self.session().is_active()
    }

    /// Options of the current publication
    pub fn options(&self) -> Option<ClientOptions> {
        self.session().options()
    }

    /// Register a local capture track
    pub fn add_track(&self, track: Track) -> Result<()> {
        self.session().add_local_track(track)
    }

    /// Unregister a local track
    pub fn remove_track(&self, track_id: &str) -> Result<Track> {
        self.session().remove_local_track(track_id)
    }

    /// Mute (send silence/black) or unmute a track
    pub fn enable_track(&self, track_id: &str, enabled: bool) -> Result<()> {
        self.session().enable_track(track_id, enabled)
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.session().tracks()
    }

    /// Turn periodic stats collection on or off
    pub fn enable_stats(&self, enabled: bool) {
        self.session().enable_stats(enabled);
    }

    /// Latest stats report
    pub fn stats(&self) -> Option<Arc<StatsReport>> {
        self.session().stats()
    }

    pub fn stats_of_type(&self, kind: StatsKind) -> Vec<Stats> {
        self.session().stats_of_type(kind)
    }

    /// Summary of the latest stats report
    pub fn statistics(&self) -> Option<StreamStatistics> {
        self.session().statistics()
    }
}

#[async_trait]
impl EventHandler for PublisherInner {
    async fn on_server_event(&self, event: ServerEvent) {
        if let ServerEvent::ViewerCount(count) = &event {
            tracing::debug!(viewers = count, "Viewer count");
        }
        self.session.handle_server_event(event);
    }

    async fn on_engine_event(&self, event: ScopedEvent) {
        self.session.handle_engine_event(event);
    }

    async fn on_state(&self, state: ConnectionState) {
        if self.session.handle_state(state).await {
            tracing::info!(%state, "Publishing stopped by connection loss");
        }
    }
}

impl Drop for PublisherInner {
    fn drop(&mut self) {
        self.session.abort();
    }
}
