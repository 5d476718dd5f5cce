//! Session context shared by the publisher and subscriber facades

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::events::{EventBus, SessionEvent};
use super::pump::PumpInputs;
use super::queue::CommandQueue;
use crate::client::ClientOptions;
use crate::connection::{ConnectionManager, ConnectionOptions, ConnectionState};
use crate::credentials::{Credentials, Role};
use crate::error::{Error, Result};
use crate::registry::{MediaFrame, Renderer, Track};
use crate::state::{self, SharedState};
use crate::stats::{StatsAggregator, StatsKind, Stats, StatsReport, StreamStatistics};
use crate::transport::{
    EngineEvent, EngineSink, MediaEngine, ScopedEvent, ServerEvent, SignalingTransport,
};

/// Media session bookkeeping
#[derive(Default)]
struct MediaSession {
    /// Engine start in progress
    starting: bool,
    /// Publishing / subscribed
    active: bool,
    /// Id of the latest media session, tags its engine sink
    session: u64,
    options: Option<ClientOptions>,
    collector: Option<(CancellationToken, JoinHandle<()>)>,
}

/// Everything a facade needs to run a session
pub struct SessionContext {
    pub role: Role,
    pub connection: ConnectionManager,
    pub engine: Arc<dyn MediaEngine>,
    pub events: EventBus,
    pub state: SharedState,
    pub stats: StatsAggregator,
    pub queue: CommandQueue,
    sink: EngineSink,
    media: Mutex<MediaSession>,
    pump_cancel: CancellationToken,
}

impl SessionContext {
    /// Build a context and the inputs its pump must drain
    pub fn new(
        role: Role,
        transport: Arc<dyn SignalingTransport>,
        engine: Arc<dyn MediaEngine>,
    ) -> (Arc<Self>, PumpInputs) {
        let events = EventBus::new();
        let (connection, server) = ConnectionManager::new(role, transport, events.clone());
        let (sink, engine_rx) = EngineSink::channel();
        let state = state::shared();
        let stats = StatsAggregator::with_state(Arc::clone(&state), events.clone());

        let inputs = PumpInputs {
            server,
            engine: engine_rx,
            state: connection.watch_state(),
        };

        let context = Arc::new(Self {
            role,
            queue: CommandQueue::spawn(match role {
                Role::Publisher => "publisher",
                Role::Subscriber => "subscriber",
            }),
            connection,
            engine,
            events,
            state,
            stats,
            sink,
            media: Mutex::new(MediaSession::default()),
            pump_cancel: CancellationToken::new(),
        });

        (context, inputs)
    }

    /// Token that stops the pump
    pub fn pump_cancel(&self) -> CancellationToken {
        self.pump_cancel.clone()
    }

    pub async fn connect(&self, credentials: Credentials, options: ConnectionOptions) -> Result<()> {
        self.connection.connect(credentials, options).await
    }

    /// Abort pending operations, stop media, then close signaling
    pub async fn disconnect(&self) -> Result<()> {
        self.queue.abort_all();
        self.queue.drain().await;
        self.stop_media().await;
        self.connection.disconnect().await
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.watch_state()
    }

    pub fn subscribe_events(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Publishing / subscribed
    pub fn is_active(&self) -> bool {
        self.media.lock().active
    }

    /// Options of the running media session
    pub fn options(&self) -> Option<ClientOptions> {
        self.media.lock().options.clone()
    }

    /// Start the media session. Runs inside the command queue.
    pub async fn start_media(self: Arc<Self>, options: ClientOptions) -> Result<()> {
        let operation = match self.role {
            Role::Publisher => "publish",
            Role::Subscriber => "subscribe",
        };

        let state = self.connection.state();
        if !state.is_connected() {
            return Err(Error::State { operation, state });
        }
        options.validate()?;

        let (sink, local_tracks) = {
            let mut media = self.media.lock();
            if media.active || media.starting {
                return Err(Error::InvalidState(match self.role {
                    Role::Publisher => "already publishing",
                    Role::Subscriber => "already subscribed",
                }));
            }
            media.starting = true;
            media.session += 1;

            // Snapshot under the media lock so add_local_track sees either
            // the snapshot or the starting flag
            let local_tracks = match self.role {
                Role::Publisher => self.state.lock().tracks.tracks(),
                Role::Subscriber => Vec::new(),
            };
            (self.sink.for_session(media.session), local_tracks)
        };

        let started = self
            .engine
            .start(self.role, &options, &local_tracks, sink)
            .await;
        if let Err(err) = started {
            self.media.lock().starting = false;
            let reason = err.to_string();
            tracing::warn!(role = %self.role, error = %reason, "Media session failed to start");
            self.events.emit(match self.role {
                Role::Publisher => SessionEvent::PublishingError(reason.clone()),
                Role::Subscriber => SessionEvent::SubscribedError(reason.clone()),
            });
            return Err(Error::Negotiation(reason));
        }

        let cancel = CancellationToken::new();
        let collector =
            self.stats
                .spawn_collector(Arc::clone(&self.engine), options.stats_interval, cancel.clone());
        {
            let mut media = self.media.lock();
            media.starting = false;
            media.active = true;
            media.options = Some(options);
            media.collector = Some((cancel, collector));
        }
        self.stats.set_active(true);

        tracing::info!(role = %self.role, "Media session started");
        self.events.emit(match self.role {
            Role::Publisher => SessionEvent::Publishing,
            Role::Subscriber => SessionEvent::Subscribed,
        });
        Ok(())
    }

    /// Stop the media session. Returns false if none was running.
    pub async fn stop_media(&self) -> bool {
        let (was_running, collector) = {
            let mut media = self.media.lock();
            let was_running = media.active || media.starting;
            media.active = false;
            media.starting = false;
            media.options = None;
            (was_running, media.collector.take())
        };
        if !was_running {
            return false;
        }

        self.stats.set_active(false);
        if let Some((cancel, task)) = collector {
            cancel.cancel();
            let _ = task.await;
        }
        self.engine.stop().await;

        tracing::info!(role = %self.role, "Media session stopped");
        true
    }

    /// Remove every track, announcing each removal
    pub fn clear_tracks(&self) {
        let removed = self.state.lock().tracks.clear();
        for track in removed {
            self.events.emit(SessionEvent::TrackRemoved { track_id: track.id });
        }
    }

    /// Register a track and announce it
    pub fn add_track(&self, track: Track) -> Result<()> {
        let event = SessionEvent::TrackAdded {
            track_id: track.id.clone(),
            kind: track.kind,
            mid: track.mid.clone(),
        };
        self.state.lock().tracks.add_track(track)?;
        self.events.emit(event);
        Ok(())
    }

    /// Register a local capture track, and hand it to the engine if media
    /// is running
    pub fn add_local_track(&self, track: Track) -> Result<()> {
        let running = {
            let media = self.media.lock();
            self.add_track(track.clone())?;
            media.active || media.starting
        };
        if running {
            self.engine.add_local_track(&track);
            tracing::debug!(track = %track.id, "Local track added to running session");
        }
        Ok(())
    }

    /// Unregister a local capture track, stopping it in the engine if media
    /// is running
    pub fn remove_local_track(&self, track_id: &str) -> Result<Track> {
        let (track, running) = {
            let media = self.media.lock();
            let track = self.remove_track(track_id)?;
            (track, media.active || media.starting)
        };
        if running {
            self.engine.remove_local_track(track_id);
            tracing::debug!(track = %track_id, "Local track removed from running session");
        }
        Ok(track)
    }

    pub fn remove_track(&self, track_id: &str) -> Result<Track> {
        let track = self.state.lock().tracks.remove_track(track_id)?;
        self.events.emit(SessionEvent::TrackRemoved {
            track_id: track.id.clone(),
        });
        Ok(track)
    }

    /// Enable or disable a track in the registry and the engine
    pub fn enable_track(&self, track_id: &str, enabled: bool) -> Result<()> {
        let changed = self.state.lock().tracks.enable(track_id, enabled)?;
        if changed {
            self.engine.set_track_enabled(track_id, enabled);
            tracing::debug!(track = %track_id, enabled, "Track toggled");
        }
        Ok(())
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.state.lock().tracks.tracks()
    }

    pub fn add_renderer(&self, track_id: &str, renderer: Arc<dyn Renderer>) -> Result<()> {
        self.state.lock().tracks.add_renderer(track_id, renderer)
    }

    pub fn remove_renderer(&self, track_id: &str, renderer: &Arc<dyn Renderer>) -> Result<bool> {
        self.state.lock().tracks.remove_renderer(track_id, renderer)
    }

    pub fn set_volume(&self, track_id: &str, volume: f64) -> Result<()> {
        self.state.lock().tracks.set_volume(track_id, volume)
    }

    /// Deliver a frame to its track's renderers. Returns the renderer count.
    pub fn dispatch_frame(&self, frame: MediaFrame) -> Result<usize> {
        let dispatch = self.state.lock().tracks.prepare_dispatch(frame)?;
        Ok(dispatch.deliver())
    }

    pub fn enable_stats(&self, enabled: bool) {
        self.stats.enable(enabled);
    }

    pub fn stats(&self) -> Option<Arc<StatsReport>> {
        self.stats.latest()
    }

    pub fn stats_of_type(&self, kind: StatsKind) -> Vec<Stats> {
        self.stats.stats_of_type(kind)
    }

    pub fn statistics(&self) -> Option<StreamStatistics> {
        self.stats
            .latest()
            .map(|report| StreamStatistics::from_report(&report))
    }

    /// Whether `session` is the media session currently starting or running
    fn is_current_session(&self, session: u64) -> bool {
        let media = self.media.lock();
        (media.active || media.starting) && media.session == session
    }

    /// Registry and stats handling common to both roles.
    ///
    /// Events pushed for a media session that has since stopped are dropped.
    pub fn handle_engine_event(&self, scoped: ScopedEvent) {
        if !self.is_current_session(scoped.session) {
            tracing::trace!(
                session = scoped.session,
                "Dropping engine event of a finished media session"
            );
            return;
        }

        match scoped.event {
            EngineEvent::TrackCreated(track) => {
                let id = track.id.clone();
                if let Err(err) = self.add_track(track) {
                    tracing::warn!(track = %id, error = %err, "Ignoring track from engine");
                }
            }
            EngineEvent::TrackRemoved { track_id } => {
                if let Err(err) = self.remove_track(&track_id) {
                    tracing::debug!(track = %track_id, error = %err, "Unknown track removed");
                }
            }
            EngineEvent::MidAssigned { track_id, mid } => {
                if let Err(err) = self.state.lock().tracks.assign_mid(&track_id, mid) {
                    tracing::warn!(track = %track_id, error = %err, "Mid assignment rejected");
                }
            }
            EngineEvent::Frame(frame) => {
                let track_id = frame.track_id.clone();
                if let Err(err) = self.dispatch_frame(frame) {
                    tracing::trace!(track = %track_id, error = %err, "Frame dropped");
                }
            }
            EngineEvent::StatsSample(report) => {
                self.stats.on_sample(report);
            }
        }
    }

    /// Server events that map directly onto application events
    pub fn handle_server_event(&self, event: ServerEvent) {
        let event = match event {
            // Channel closure is handled by the connection manager
            ServerEvent::Closed { .. } => return,
            ServerEvent::Layers {
                mid,
                active,
                inactive,
            } => SessionEvent::Layers {
                mid,
                active,
                inactive,
            },
            ServerEvent::SourceActive {
                stream_id,
                source_id,
                track_ids,
            } => SessionEvent::SourceActive {
                stream_id,
                source_id,
                track_ids,
            },
            ServerEvent::SourceInactive {
                stream_id,
                source_id,
            } => SessionEvent::SourceInactive {
                stream_id,
                source_id,
            },
            ServerEvent::Vad { mid, source_id } => SessionEvent::Vad { mid, source_id },
            ServerEvent::ViewerCount(count) => SessionEvent::ViewerCount(count),
            ServerEvent::ViewersActive => SessionEvent::ViewersActive,
            ServerEvent::ViewersInactive => SessionEvent::ViewersInactive,
            ServerEvent::Stopped => {
                tracing::info!(role = %self.role, "Stream stopped by server");
                SessionEvent::StreamStopped
            }
            ServerEvent::Error(message) => {
                tracing::warn!(role = %self.role, error = %message, "Signaling error");
                SessionEvent::SignalingError(message)
            }
        };
        self.events.emit(event);
    }

    /// React to a connection state change. Returns true if media was torn down.
    ///
    /// The media session survives reconnects; it is released once the
    /// connection is given up.
    pub async fn handle_state(&self, state: ConnectionState) -> bool {
        match state {
            ConnectionState::Failed | ConnectionState::Disconnected => self.stop_media().await,
            _ => false,
        }
    }

    /// Synchronous teardown for when the facade is dropped
    pub fn abort(&self) {
        self.pump_cancel.cancel();
        self.queue.abort_all();
        self.connection.abort();

        let (running, collector) = {
            let mut media = self.media.lock();
            let running = media.active || media.starting;
            media.active = false;
            media.starting = false;
            (running, media.collector.take())
        };
        if let Some((cancel, task)) = collector {
            cancel.cancel();
            task.abort();
        }

        if running {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let engine = Arc::clone(&self.engine);
                handle.spawn(async move { engine.stop().await });
            }
        }
    }
}
