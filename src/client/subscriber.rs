//! Stream subscriber
//!
//! High-level API for viewing a stream: receiving remote tracks, projecting
//! sources onto transceivers and choosing simulcast/SVC layers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use super::config::ClientOptions;
use crate::connection::{ConnectionOptions, ConnectionState};
use crate::credentials::{Credentials, Role};
use crate::error::{Error, Result};
use crate::layers::{LayerController, LayerDescriptor, ProjectionRequest, VideoQuality};
use crate::registry::{MediaFrame, Renderer, Track, TrackKind};
use crate::session::{pump, EventHandler, SessionContext, SessionEvent};
use crate::stats::{Stats, StatsKind, StatsReport, StreamStatistics};
use crate::transport::{MediaEngine, ScopedEvent, ServerEvent, SignalingTransport};

/// A source currently publishing into the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSource {
    pub stream_id: String,
    /// `None` for the main (unnamed) source
    pub source_id: Option<String>,
    pub track_ids: Vec<String>,
}

/// Stream subscriber
pub struct Subscriber {
    inner: Arc<SubscriberInner>,
}

struct SubscriberInner {
    session: Arc<SessionContext>,
    layers: Arc<LayerController>,
    sources: Mutex<HashMap<Option<String>, ActiveSource>>,
}

impl SubscriberInner {
    /// Drop everything tied to the subscription
    fn release(&self) {
        self.layers.reset();
        self.sources.lock().clear();
        self.session.clear_tracks();
    }

    fn ensure_subscribed(&self) -> Result<()> {
        if self.session.is_active() {
            Ok(())
        } else {
            Err(Error::InvalidState("not subscribed"))
        }
    }
}

impl Subscriber {
    /// Create a subscriber over the given transport and engine
    pub fn new(transport: Arc<dyn SignalingTransport>, engine: Arc<dyn MediaEngine>) -> Self {
        let (session, inputs) = SessionContext::new(Role::Subscriber, transport, engine);
        let layers = Arc::new(LayerController::new(
            session.connection.clone(),
            session.events.clone(),
        ));
        let inner = Arc::new(SubscriberInner {
            session: Arc::clone(&session),
            layers,
            sources: Mutex::new(HashMap::new()),
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

    /// Stop the subscription if needed and close the signaling channel
    pub async fn disconnect(&self) -> Result<()> {
        let result = self.session().disconnect().await;
        self.inner.release();
        result
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

    /// Start receiving the stream
    pub async fn subscribe(&self, options: ClientOptions) -> Result<()> {
        let session = Arc::clone(self.session());
        self.session().queue.run(session.start_media(options)).await
    }

    /// Stop receiving. Also disconnects.
    pub async fn unsubscribe(&self) -> Result<()> {
        self.disconnect().await
    }

    pub fn is_subscribed(&self) -> bool {
        self.session().is_active()
    }

    /// Options of the current subscription
    pub fn options(&self) -> Option<ClientOptions> {
        self.session().options()
    }

    /// Project a source's tracks onto local transceivers.
    ///
    /// Queued behind any pending projection or selection.
    pub async fn project(&self, source_id: &str, mapping: Vec<ProjectionRequest>) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        let source_id = source_id.to_string();
        self.session()
            .queue
            .run(async move {
                inner.ensure_subscribed()?;
                inner.layers.project(&source_id, mapping).await
            })
            .await
    }

    /// Release transceivers from their projections
    pub async fn unproject(&self, mids: Vec<String>) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.session()
            .queue
            .run(async move {
                inner.ensure_subscribed()?;
                inner.layers.unproject(mids).await
            })
            .await
    }

    /// Pin a layer, or `None` for automatic selection
    pub async fn select(&self, layer: Option<LayerDescriptor>) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.session()
            .queue
            .run(async move {
                inner.ensure_subscribed()?;
                inner.layers.select(layer).await
            })
            .await
    }

    /// Add a receive transceiver. Returns its mid.
    ///
    /// Starts a new negotiation round, so existing tracks may be re-bound.
    pub async fn add_remote_track(&self, kind: TrackKind) -> Result<String> {
        let inner = Arc::clone(&self.inner);
        self.session()
            .queue
            .run(async move {
                inner.ensure_subscribed()?;
                inner.session.state.lock().tracks.begin_renegotiation();
                let mid = inner
                    .session
                    .engine
                    .add_remote_track(kind)
                    .await
                    .map_err(|err| Error::Negotiation(err.to_string()))?;
                tracing::debug!(%kind, mid = %mid, "Remote track added");
                Ok(mid)
            })
            .await
    }

    /// Mid a track is bound to
    pub fn get_mid(&self, track_id: &str) -> Option<String> {
        self.session()
            .state
            .lock()
            .tracks
            .mid_of(track_id)
            .map(str::to_string)
    }

    /// Sources currently publishing into the stream
    pub fn active_sources(&self) -> Vec<ActiveSource> {
        let mut sources: Vec<_> = self.inner.sources.lock().values().cloned().collect();
        sources.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        sources
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.session().tracks()
    }

    /// Attach a renderer to a remote track
    pub fn add_renderer(&self, track_id: &str, renderer: Arc<dyn Renderer>) -> Result<()> {
        self.session().add_renderer(track_id, renderer)
    }

    /// Detach a renderer. Returns true if it was attached.
    pub fn remove_renderer(&self, track_id: &str, renderer: &Arc<dyn Renderer>) -> Result<bool> {
        self.session().remove_renderer(track_id, renderer)
    }

    /// Deliver a frame to the renderers of its track
    pub fn dispatch_frame(&self, frame: MediaFrame) -> Result<usize> {
        self.session().dispatch_frame(frame)
    }

    /// Render silence/blank instead of the track's media, or go back to live
    pub fn enable_track(&self, track_id: &str, enabled: bool) -> Result<()> {
        self.session().enable_track(track_id, enabled)
    }

    /// Playback volume of an audio track
    pub fn set_volume(&self, track_id: &str, volume: f64) -> Result<()> {
        self.session().set_volume(track_id, volume)
    }

    pub fn active_layers(&self, mid: &str) -> Vec<LayerDescriptor> {
        self.inner.layers.active_layers(mid)
    }

    /// Quality choices for a transceiver
    pub fn qualities(&self, mid: &str) -> Vec<VideoQuality> {
        self.inner.layers.qualities(mid)
    }

    pub fn pinned_layer(&self) -> Option<LayerDescriptor> {
        self.inner.layers.pinned_layer()
    }

    pub fn projections(&self) -> HashMap<String, ProjectionRequest> {
        self.inner.layers.projections()
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
impl EventHandler for SubscriberInner {
    async fn on_server_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::Layers {
                mid,
                active,
                inactive,
            } => self.layers.on_layers(mid, active, inactive),
            ServerEvent::SourceActive {
                ref stream_id,
                ref source_id,
                ref track_ids,
            } => {
                tracing::debug!(stream = %stream_id, source = ?source_id, "Source active");
                self.sources.lock().insert(
                    source_id.clone(),
                    ActiveSource {
                        stream_id: stream_id.clone(),
                        source_id: source_id.clone(),
                        track_ids: track_ids.clone(),
                    },
                );
                self.session.handle_server_event(event);
            }
            ServerEvent::SourceInactive { ref source_id, .. } => {
                tracing::debug!(source = ?source_id, "Source inactive");
                self.sources.lock().remove(source_id);
                self.session.handle_server_event(event);
            }
            other => self.session.handle_server_event(other),
        }
    }

    async fn on_engine_event(&self, event: ScopedEvent) {
        self.session.handle_engine_event(event);
    }

    async fn on_state(&self, state: ConnectionState) {
        if self.session.handle_state(state).await {
            tracing::info!(%state, "Subscription stopped by connection loss");
            self.release();
        }
    }
}

impl Drop for SubscriberInner {
    fn drop(&mut self) {
        self.session.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::mock::{MockEngine, MockTransport};

    fn creds() -> Credentials {
        Credentials::subscriber("feed", "acct", "https://director.example.com")
    }

    async fn subscribed() -> (Subscriber, Arc<MockTransport>, Arc<MockEngine>) {
        let transport = MockTransport::new();
        let engine = MockEngine::new();
        let subscriber = Subscriber::new(transport.clone(), engine.clone());
        subscriber.connect(creds()).await.unwrap();
        subscriber.subscribe(ClientOptions::default()).await.unwrap();
        (subscriber, transport, engine)
    }

    #[tokio::test]
    async fn test_project_requires_subscription() {
        let subscriber = Subscriber::new(MockTransport::new(), MockEngine::new());
        subscriber.connect(creds()).await.unwrap();

        let err = subscriber
            .project("cam", vec![ProjectionRequest::new("cam", "v", TrackKind::Video, "0")])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[tokio::test]
    async fn test_add_remote_track_returns_mid() {
        let (subscriber, _transport, _engine) = subscribed().await;

        assert_eq!(subscriber.add_remote_track(TrackKind::Video).await.unwrap(), "0");
        assert_eq!(subscriber.add_remote_track(TrackKind::Audio).await.unwrap(), "1");
    }

    #[tokio::test]
    async fn test_engine_tracks_reach_registry_and_renderers() {
        let (subscriber, _transport, engine) = subscribed().await;
        let mut events = subscriber.events();
        let sink = engine.sink();

        sink.track_created(Track::video("remote-v").with_mid("0"));
        loop {
            if let Some(SessionEvent::TrackAdded { track_id, .. }) = events.recv().await {
                assert_eq!(track_id, "remote-v");
                break;
            }
        }
        assert_eq!(subscriber.get_mid("remote-v").as_deref(), Some("0"));

        let (renderer, mut frames) = crate::registry::ChannelRenderer::new();
        subscriber.add_renderer("remote-v", renderer).unwrap();
        sink.frame(MediaFrame::video("remote-v", 1, 2, 2, bytes::Bytes::from_static(&[7; 16])));

        let frame = frames.recv().await.unwrap();
        assert_eq!(frame.dimensions, Some((2, 2)));
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_everything() {
        let (subscriber, transport, engine) = subscribed().await;
        subscriber.inner.session.add_track(Track::audio("a")).unwrap();

        subscriber.unsubscribe().await.unwrap();

        assert!(!subscriber.is_subscribed());
        assert!(!subscriber.is_connected());
        assert!(subscriber.tracks().is_empty());
        assert_eq!(engine.stops.load(Ordering::SeqCst), 1);
        assert_eq!(transport.closes.load(Ordering::SeqCst), 1);
    }
}
